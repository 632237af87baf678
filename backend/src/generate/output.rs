//! Output finalization and cleanup shared by both generators.

use std::any::Any;

use crate::api::logs::{log_error, log_info_indent, log_success, log_warning_indent};
use crate::error::{panic_detail, GenerationError, GenerationOutcome};
use crate::models::{FileInfo, GenerationResult, OutputConfig, OutputType};
use crate::store::{AuthContext, Collaborators};

pub const PDF_MIME: &str = "application/pdf";

/// Seconds-granularity suffix keeping output names unique in a folder.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Files created by one generation call.
///
/// Scratch copies are always trashed. The output copy is trashed only when
/// the call fails.
#[derive(Debug, Default)]
pub(crate) struct CreatedFiles {
    pub output: Option<String>,
    pub scratch: Vec<String>,
}

impl CreatedFiles {
    pub fn track_scratch(&mut self, id: &str) {
        self.scratch.push(id.to_string());
    }

    /// Trash one scratch copy and stop tracking it.
    pub async fn release_scratch(&mut self, c: &Collaborators, auth: &AuthContext, id: &str) {
        discard(c, auth, id, "scratch copy").await;
        self.scratch.retain(|s| s != id);
    }

    async fn discard_scratch(&mut self, c: &Collaborators, auth: &AuthContext) {
        for id in std::mem::take(&mut self.scratch) {
            discard(c, auth, &id, "scratch copy").await;
        }
    }

    async fn discard_output(&mut self, c: &Collaborators, auth: &AuthContext) {
        if let Some(id) = self.output.take() {
            discard(c, auth, &id, "partial output").await;
        }
    }
}

/// Best-effort trash. Failures are logged and swallowed.
pub(crate) async fn discard(c: &Collaborators, auth: &AuthContext, id: &str, what: &str) {
    match c.files.trash(auth, id).await {
        Ok(()) => log_info_indent(format!("Trashed {} {}", what, id), 1),
        Err(e) => log_warning_indent(format!("Could not trash {} {}: {}", what, id, e), 1),
    }
}

/// Turn the saved editable copy into the requested output.
///
/// For PDF output the first tab of the copy is exported, the PDF is stored
/// next to it as `<name>.pdf`, and the copy is trashed. Otherwise the copy is
/// the output.
pub(crate) async fn finalize_output(
    c: &Collaborators,
    auth: &AuthContext,
    folder_id: &str,
    copy: &FileInfo,
    config: &OutputConfig,
    created: &mut CreatedFiles,
) -> GenerationOutcome<GenerationResult> {
    match config.output_type {
        OutputType::Native => Ok(GenerationResult::succeeded(&copy.name, &copy.url)),
        OutputType::Pdf => {
            let tab_id = c
                .documents
                .tab_ids(auth, &copy.id)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| GenerationError::EmptyTemplate(copy.id.clone()))?;
            let bytes = c.exporter.export_pdf(auth, &copy.id, &tab_id).await?;
            let pdf_name = format!("{}.pdf", copy.name);
            let pdf = c
                .files
                .create_file(auth, folder_id, &pdf_name, PDF_MIME, bytes)
                .await?;
            created.output = None;
            discard(c, auth, &copy.id, "intermediate copy").await;
            Ok(GenerationResult::succeeded(pdf.name, pdf.url))
        }
    }
}

/// Convert a finished (or panicked) generation run into its result,
/// releasing whatever the run left behind.
pub(crate) async fn settle(
    c: &Collaborators,
    auth: &AuthContext,
    outcome: Result<GenerationOutcome<GenerationResult>, Box<dyn Any + Send>>,
    mut created: CreatedFiles,
) -> GenerationResult {
    created.discard_scratch(c, auth).await;

    let error = match outcome {
        Ok(Ok(result)) => {
            log_success(format!("Created {}", result.file_name));
            return result;
        }
        Ok(Err(e)) => e,
        Err(payload) => GenerationError::Panic(panic_detail(payload)),
    };

    log_error(format!("Generation failed: {}", error));
    created.discard_output(c, auth).await;
    GenerationResult::failed(error.to_string())
}
