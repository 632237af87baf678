//! Placeholder discovery and matching.
//!
//! A placeholder is written `{{ name }}`: two opening braces, optional
//! whitespace, the name, optional whitespace, two closing braces. Names are
//! used verbatim (no case folding). This module is the single place where the
//! delimiter grammar is defined:
//!
//! - [`extract_placeholders`] scans text and returns each distinct name once
//! - [`PlaceholderPattern`] compiles a matcher for one name, with the name
//!   escaped, and replaces every occurrence with a literal value

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use std::borrow::Cow;

/// Any placeholder on a single line. Lazy so `{{a}} {{b}}` yields two matches.
static ANY_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*.*?\s*\}\}").expect("valid regex"));

/// Extract distinct placeholder names, in order of first appearance.
///
/// `{{ X }}`, `{{X}}` and `{{  X  }}` all yield `"X"` once. Empty names
/// (`{{}}`, `{{  }}`) are ignored.
pub fn extract_placeholders(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for m in ANY_PLACEHOLDER.find_iter(text) {
        let name = strip_delimiters(m.as_str());
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Remove every `{{`/`}}` from a matched placeholder and trim the result.
fn strip_delimiters(raw: &str) -> String {
    raw.replace("{{", "").replace("}}", "").trim().to_string()
}

/// Compiled matcher for one placeholder name.
#[derive(Debug, Clone)]
pub struct PlaceholderPattern {
    name: String,
    regex: Regex,
}

impl PlaceholderPattern {
    /// Build the matcher for `name`. Regex metacharacters in the name are
    /// matched literally.
    pub fn new(name: &str) -> Result<Self, regex::Error> {
        let pattern = format!(r"\{{\{{\s*{}\s*\}}\}}", regex::escape(name));
        Ok(Self {
            name: name.to_string(),
            regex: Regex::new(&pattern)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Replace every occurrence with `value`, taken literally (`$1` stays `$1`).
    pub fn replace_all<'t>(&self, text: &'t str, value: &str) -> Cow<'t, str> {
        self.regex.replace_all(text, NoExpand(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_deduplicates_whitespace_variants() {
        let names = extract_placeholders("{{ X }} and {{X}} and {{  X  }}");
        assert_eq!(names, vec!["X"]);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let text = "Dear {{Name}}, from {{ City }}.\n{{Name}} again {{Zip}}";
        let first = extract_placeholders(text);
        assert_eq!(first, vec!["Name", "City", "Zip"]);
        assert_eq!(extract_placeholders(text), first);
    }

    #[test]
    fn test_extract_is_case_sensitive() {
        assert_eq!(extract_placeholders("{{name}} {{Name}}"), vec!["name", "Name"]);
    }

    #[test]
    fn test_extract_ignores_empty_and_multiline() {
        assert!(extract_placeholders("{{}} {{   }}").is_empty());
        assert!(extract_placeholders("{{Na\nme}}").is_empty());
    }

    #[test]
    fn test_extract_nested_braces() {
        assert_eq!(extract_placeholders("{{ {{x}} }}"), vec!["x"]);
    }

    #[test]
    fn test_extract_keeps_inner_spaces() {
        assert_eq!(extract_placeholders("{{ First Name }}"), vec!["First Name"]);
    }

    #[test]
    fn test_pattern_tolerates_whitespace() {
        let pattern = PlaceholderPattern::new("Name").unwrap();
        assert_eq!(pattern.replace_all("{{Name}}|{{ Name }}|{{\tName  }}", "A"), "A|A|A");
        assert!(!pattern.is_match("{{Names}}"));
        assert!(!pattern.is_match("{Name}"));
    }

    #[test]
    fn test_pattern_escapes_metacharacters() {
        let pattern = PlaceholderPattern::new("Price ($)").unwrap();
        assert_eq!(pattern.replace_all("Total: {{Price ($)}}", "10"), "Total: 10");
        let dotted = PlaceholderPattern::new("a.b").unwrap();
        assert!(!dotted.is_match("{{axb}}"));
    }

    #[test]
    fn test_replacement_is_literal() {
        let pattern = PlaceholderPattern::new("X").unwrap();
        assert_eq!(pattern.replace_all("{{X}}", "$1 ${0}"), "$1 ${0}");
    }
}
