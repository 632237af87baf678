//! Variable substitution.
//!
//! Replaces `{{ header }}` with the row's value for that header, for every
//! header in header order. Later headers run on text already rewritten by
//! earlier ones, so header order is the tie-break when patterns overlap.
//! Placeholders with no matching header are left untouched.

use crate::error::GenerationError;
use crate::models::Body;
use crate::placeholder::PlaceholderPattern;

/// Compiled `(pattern, value)` pairs for one row.
fn compile_row<'r>(
    row: &'r [String],
    headers: &[String],
) -> Result<Vec<(PlaceholderPattern, &'r str)>, GenerationError> {
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let pattern = PlaceholderPattern::new(header).map_err(|e| GenerationError::Pattern {
                header: header.clone(),
                message: e.to_string(),
            })?;
            let value = row.get(i).map(String::as_str).unwrap_or("");
            Ok((pattern, value))
        })
        .collect()
}

/// Substitute a row into every text node of `body`.
pub fn substitute_body(
    body: &mut Body,
    row: &[String],
    headers: &[String],
) -> Result<(), GenerationError> {
    let compiled = compile_row(row, headers)?;
    body.for_each_text_mut(|text| {
        for (pattern, value) in &compiled {
            if pattern.is_match(text) {
                *text = pattern.replace_all(text, value).into_owned();
            }
        }
    });
    Ok(())
}

/// Substitute a row into a plain string, such as a file-name template.
pub fn substitute_into_name(
    template: &str,
    row: &[String],
    headers: &[String],
) -> Result<String, GenerationError> {
    let compiled = compile_row(row, headers)?;
    Ok(compiled
        .iter()
        .fold(template.to_string(), |name, (pattern, value)| {
            pattern.replace_all(&name, value).into_owned()
        }))
}
