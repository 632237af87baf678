//! Shared fixtures for unit tests.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{ExportError, ExportResult, StoreError, StoreResult};
use crate::export::LocalPdfExporter;
use crate::models::{Body, Document, Element, FileInfo, OutputMode, SheetInfo, ValidationReport};
use crate::store::memory::Sheet;
use crate::store::{AuthContext, Collaborators, DocumentStore, MemoryWorkspace, PdfExporter, SheetStore};
use crate::validation::validate_and_fetch_data;

pub fn grid(values: &[&[&str]]) -> Vec<Vec<String>> {
    values
        .iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// A workspace with a template, a data sheet and an output folder.
pub struct Fixture {
    pub workspace: Arc<MemoryWorkspace>,
    pub collaborators: Collaborators,
    pub auth: AuthContext,
    pub template: FileInfo,
    pub sheet: FileInfo,
    pub folder: FileInfo,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_rows(grid(&[
            &["No", "FileName", "Name"],
            &["1", "letter_{{Name}}", "Alice"],
            &["2", "letter_{{Name}}", "Bob"],
        ]))
    }

    pub fn with_rows(values: Vec<Vec<String>>) -> Self {
        let workspace = Arc::new(MemoryWorkspace::new());
        let template = workspace
            .create_document(
                "Template",
                None,
                Body::with_children(vec![
                    Element::paragraph("Dear {{Name}},"),
                    Element::list_item("Reference {{ No }}"),
                    Element::Unsupported {
                        kind: "equation".into(),
                    },
                ]),
            )
            .unwrap();
        let sheet = workspace
            .create_spreadsheet(
                "Data",
                None,
                vec![Sheet {
                    sheet_id: 0,
                    title: "Sheet1".into(),
                    values,
                }],
            )
            .unwrap();
        let folder = workspace.create_folder("Output", None).unwrap();
        let exporter = Arc::new(LocalPdfExporter::new(workspace.clone()));
        let collaborators = Collaborators::from_workspace(workspace.clone(), exporter);
        Self {
            workspace,
            collaborators,
            auth: AuthContext::bearer("token"),
            template,
            sheet,
            folder,
        }
    }

    pub fn headers(&self) -> Vec<String> {
        strings(&["No", "FileName", "Name"])
    }

    pub async fn validate(&self, mode: OutputMode) -> ValidationReport {
        validate_and_fetch_data(
            &self.collaborators,
            &self.auth,
            &self.template.id,
            &self.sheet.url,
            &self.folder.url,
            mode,
        )
        .await
    }

    /// Non-trashed files in the output folder.
    pub fn outputs(&self) -> Vec<FileInfo> {
        self.workspace.children(&self.folder.id).unwrap()
    }

    /// Every non-trashed file outside the output folder and fixtures.
    pub fn strays(&self) -> Vec<FileInfo> {
        let fixed = [&self.template.id, &self.sheet.id, &self.folder.id];
        self.workspace
            .list()
            .unwrap()
            .into_iter()
            .filter(|f| !fixed.contains(&&f.id))
            .filter(|f| !self.outputs().iter().any(|o| o.id == f.id))
            .collect()
    }
}

/// Exporter that always answers with an HTTP error.
pub struct FailingExporter;

#[async_trait]
impl PdfExporter for FailingExporter {
    async fn export_pdf(&self, _auth: &AuthContext, _document_id: &str, _tab_id: &str) -> ExportResult<Vec<u8>> {
        Err(ExportError::Status {
            status: 500,
            body: "export backend down".into(),
        })
    }
}

/// Exporter that panics.
pub struct PanickingExporter;

#[async_trait]
impl PdfExporter for PanickingExporter {
    async fn export_pdf(&self, _auth: &AuthContext, _document_id: &str, _tab_id: &str) -> ExportResult<Vec<u8>> {
        panic!("exporter exploded")
    }
}

/// Sheet store that panics on every call.
pub struct PanickingSheets;

#[async_trait]
impl SheetStore for PanickingSheets {
    async fn list_sheets(&self, _auth: &AuthContext, _spreadsheet_id: &str) -> StoreResult<Vec<SheetInfo>> {
        panic!("sheet backend exploded")
    }

    async fn display_values(
        &self,
        _auth: &AuthContext,
        _spreadsheet_id: &str,
        _sheet_id: i64,
    ) -> StoreResult<Vec<Vec<String>>> {
        panic!("sheet backend exploded")
    }
}

/// Document store that breaks when saving the document named `fail_on`.
pub struct FlakyDocs {
    pub inner: Arc<MemoryWorkspace>,
    pub fail_on: String,
    pub panics: bool,
}

impl FlakyDocs {
    pub fn failing(inner: Arc<MemoryWorkspace>, fail_on: &str) -> Self {
        Self {
            inner,
            fail_on: fail_on.to_string(),
            panics: false,
        }
    }

    pub fn panicking(inner: Arc<MemoryWorkspace>, fail_on: &str) -> Self {
        Self {
            panics: true,
            ..Self::failing(inner, fail_on)
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyDocs {
    async fn open_document(&self, auth: &AuthContext, id: &str) -> StoreResult<Document> {
        self.inner.open_document(auth, id).await
    }

    async fn save_document(&self, auth: &AuthContext, document: &Document) -> StoreResult<()> {
        if document.name == self.fail_on {
            if self.panics {
                panic!("document backend exploded");
            }
            return Err(StoreError::Backend("scratch save failed".into()));
        }
        self.inner.save_document(auth, document).await
    }

    async fn tab_ids(&self, auth: &AuthContext, id: &str) -> StoreResult<Vec<String>> {
        self.inner.tab_ids(auth, id).await
    }
}
