//! One output document per data row.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;

use super::output::{finalize_output, settle, timestamp, CreatedFiles};
use super::working_tab;
use crate::api::logs::{log_info, log_info_indent};
use crate::error::GenerationOutcome;
use crate::layout::apply_page_size;
use crate::models::{GenerationResult, OutputConfig};
use crate::store::{AuthContext, Collaborators};
use crate::substitute::{substitute_body, substitute_into_name};

/// Name seed used when the row's file-name column is empty.
pub const DEFAULT_FILE_NAME: &str = "NoName";

/// Output name for a row: the substituted file-name seed plus a timestamp.
pub fn output_name(row: &[String], headers: &[String], stamp: &str) -> GenerationOutcome<String> {
    let seed = row
        .get(1)
        .filter(|s| !s.is_empty())
        .map(String::as_str)
        .unwrap_or(DEFAULT_FILE_NAME);
    Ok(format!("{}_{}", substitute_into_name(seed, row, headers)?, stamp))
}

/// Generate the output for one row.
///
/// Never fails: faults come back as `success = false` with the detail in
/// `error`, and any copy created by the failed attempt is trashed.
pub async fn generate_single_document(
    c: &Collaborators,
    auth: &AuthContext,
    template_id: &str,
    folder_id: &str,
    row: &[String],
    headers: &[String],
    config: &OutputConfig,
) -> GenerationResult {
    let mut created = CreatedFiles::default();
    let run = produce(c, auth, template_id, folder_id, row, headers, config, &mut created);
    let outcome = AssertUnwindSafe(run).catch_unwind().await;
    settle(c, auth, outcome, created).await
}

#[allow(clippy::too_many_arguments)]
async fn produce(
    c: &Collaborators,
    auth: &AuthContext,
    template_id: &str,
    folder_id: &str,
    row: &[String],
    headers: &[String],
    config: &OutputConfig,
    created: &mut CreatedFiles,
) -> GenerationOutcome<GenerationResult> {
    let name = output_name(row, headers, &timestamp())?;
    log_info(format!("📄 Generating {}", name));

    let copy = c.files.copy_file(auth, template_id, &name, Some(folder_id)).await?;
    created.output = Some(copy.id.clone());

    let mut document = c.documents.open_document(auth, &copy.id).await?;
    let body = working_tab(&mut document)?;
    apply_page_size(body, config);
    substitute_body(body, row, headers)?;
    c.documents.save_document(auth, &document).await?;
    log_info_indent("Substituted and saved", 1);

    finalize_output(c, auth, folder_id, &copy, config, created).await
}
