//! Resource reference resolution.
//!
//! Users paste either a raw id or a platform URL. This module turns those
//! strings into a stable resource id plus an optional sheet selector (`gid`).
//! Nothing here fails loudly: an unusable reference resolves to `None`.
//!
//! # Example
//!
//! ```rust,ignore
//! use mailmerge::resolver::{resolve_id, extract_selector};
//!
//! let url = "https://docs.google.com/spreadsheets/d/1AbC_d-9/edit#gid=42";
//! assert_eq!(resolve_id(url).as_deref(), Some("1AbC_d-9"));
//! assert_eq!(extract_selector(url), Some(42));
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Hosts whose URLs we know how to dissect.
const KNOWN_HOSTS: [&str; 2] = ["drive.google.com", "docs.google.com"];

static LITERAL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

/// Tried in order: folder path, document path, `id=` query parameter.
static URL_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"folders/([A-Za-z0-9_-]+)").expect("valid regex"),
        Regex::new(r"/d/([A-Za-z0-9_-]+)").expect("valid regex"),
        Regex::new(r"id=([A-Za-z0-9_-]+)").expect("valid regex"),
    ]
});

static SELECTOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[#&]gid=([0-9]+)").expect("valid regex"));

/// A resolved reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedReference {
    pub resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<i64>,
}

/// Extract a resource id from a raw id or a known platform URL.
pub fn resolve_id(reference: &str) -> Option<String> {
    if reference.is_empty() {
        return None;
    }
    if LITERAL_ID.is_match(reference) {
        return Some(reference.to_string());
    }
    if !KNOWN_HOSTS.iter().any(|host| reference.contains(host)) {
        return None;
    }

    URL_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(reference))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the numeric sheet selector (`#gid=` or `&gid=`) from a URL.
pub fn extract_selector(reference: &str) -> Option<i64> {
    SELECTOR
        .captures(reference)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Resolve both the id and the selector of a reference.
pub fn resolve_reference(reference: &str) -> Option<ResolvedReference> {
    resolve_id(reference).map(|resource_id| ResolvedReference {
        resource_id,
        selector: extract_selector(reference),
    })
}
