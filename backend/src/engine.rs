//! The three caller-facing operations behind one handle.
//!
//! ```rust,ignore
//! use mailmerge::{MailMerge, AuthContext, OutputMode, OutputConfig};
//!
//! let engine = MailMerge::local(workspace);
//! let auth = AuthContext::bearer("token");
//! let report = engine.validate_and_fetch_data(&auth, tpl_url, sheet_url, folder_url, OutputMode::Individual).await;
//! if report.success {
//!     let ids = report.ids.unwrap();
//!     for row in &report.rows {
//!         engine.generate_single_document(&auth, &ids.template, &ids.folder, row, &report.headers, &OutputConfig::default()).await;
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::api::logs::{log_info, log_warning};
use crate::config::Settings;
use crate::export::{HttpPdfExporter, LocalPdfExporter};
use crate::generate;
use crate::models::{GenerationResult, OutputConfig, OutputMode, ValidationReport};
use crate::store::{AuthContext, Collaborators, MemoryWorkspace, PdfExporter};
use crate::validation;

/// References for one complete merge run.
#[derive(Debug, Clone, Copy)]
pub struct MergeSources<'a> {
    pub template: &'a str,
    pub data: &'a str,
    pub destination: &'a str,
}

/// Outcome of [`MailMerge::run`]: the validation report, plus one result
/// per row (individual mode) or a single result (merged mode) when
/// validation passed.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRun {
    pub report: ValidationReport,
    pub results: Vec<GenerationResult>,
}

impl MergeRun {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Mail-merge engine bound to one set of collaborators.
#[derive(Clone)]
pub struct MailMerge {
    collaborators: Collaborators,
}

impl MailMerge {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Engine over an in-memory workspace with local PDF rendering.
    pub fn local(workspace: Arc<MemoryWorkspace>) -> Self {
        let exporter = Arc::new(LocalPdfExporter::new(workspace.clone()));
        Self::new(Collaborators::from_workspace(workspace, exporter))
    }

    /// Engine over a workspace, exporting as the settings ask.
    pub fn from_settings(workspace: Arc<MemoryWorkspace>, settings: &Settings) -> Self {
        if !settings.remote_export {
            return Self::local(workspace);
        }
        let exporter: Arc<dyn PdfExporter> = Arc::new(HttpPdfExporter::new(&settings.export_base_url));
        Self::new(Collaborators::from_workspace(workspace, exporter))
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub async fn validate_and_fetch_data(
        &self,
        auth: &AuthContext,
        template_ref: &str,
        data_ref: &str,
        destination_ref: &str,
        mode: OutputMode,
    ) -> ValidationReport {
        validation::validate_and_fetch_data(
            &self.collaborators,
            auth,
            template_ref,
            data_ref,
            destination_ref,
            mode,
        )
        .await
    }

    pub async fn generate_single_document(
        &self,
        auth: &AuthContext,
        template_id: &str,
        folder_id: &str,
        row: &[String],
        headers: &[String],
        config: &OutputConfig,
    ) -> GenerationResult {
        generate::generate_single_document(
            &self.collaborators,
            auth,
            template_id,
            folder_id,
            row,
            headers,
            config,
        )
        .await
    }

    pub async fn generate_merged_document(
        &self,
        auth: &AuthContext,
        template_id: &str,
        folder_id: &str,
        rows: &[Vec<String>],
        headers: &[String],
        config: &OutputConfig,
    ) -> GenerationResult {
        generate::generate_merged_document(
            &self.collaborators,
            auth,
            template_id,
            folder_id,
            rows,
            headers,
            config,
        )
        .await
    }

    /// Validate, then generate: one call per row in individual mode (a
    /// failed row does not stop the others), or one merged call.
    pub async fn run(
        &self,
        auth: &AuthContext,
        sources: MergeSources<'_>,
        mode: OutputMode,
        config: &OutputConfig,
    ) -> MergeRun {
        let report = self
            .validate_and_fetch_data(auth, sources.template, sources.data, sources.destination, mode)
            .await;
        let ids = match (&report.ids, report.success) {
            (Some(ids), true) => ids.clone(),
            _ => {
                return MergeRun {
                    report,
                    results: Vec::new(),
                }
            }
        };

        let mut results = Vec::new();
        if mode.is_merged() {
            results.push(
                self.generate_merged_document(auth, &ids.template, &ids.folder, &report.rows, &report.headers, config)
                    .await,
            );
        } else {
            for (i, row) in report.rows.iter().enumerate() {
                log_info(format!("Row {}/{}", i + 1, report.rows.len()));
                let result = self
                    .generate_single_document(auth, &ids.template, &ids.folder, row, &report.headers, config)
                    .await;
                if !result.success {
                    log_warning(format!("Row {} failed, continuing", i + 1));
                }
                results.push(result);
            }
        }

        MergeRun { report, results }
    }
}
