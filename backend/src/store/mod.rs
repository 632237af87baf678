//! Collaborator contracts.
//!
//! The engine never talks to a platform directly. It goes through four
//! traits, each taking an explicit [`AuthContext`] on every call:
//!
//! | Trait | Responsibility |
//! |-------|----------------|
//! | [`FileStore`] | File/folder metadata, copy, trash, create from bytes |
//! | [`DocumentStore`] | Open, save and inspect editable documents |
//! | [`SheetStore`] | List sheets and read display values |
//! | [`PdfExporter`] | Fixed-layout export of one document tab |
//!
//! [`memory::MemoryWorkspace`] implements the three store traits in process.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ExportResult, StoreResult};
use crate::models::{Document, FileInfo, SheetInfo};

pub use memory::MemoryWorkspace;

/// Credential passed to every collaborator call.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthContext {
    access_token: String,
}

impl AuthContext {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Value for an `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// File and folder operations.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Metadata of a non-trashed file of any kind.
    async fn get_file(&self, auth: &AuthContext, id: &str) -> StoreResult<FileInfo>;

    /// Metadata of a folder; other kinds are `WrongKind`.
    async fn get_folder(&self, auth: &AuthContext, id: &str) -> StoreResult<FileInfo>;

    /// Copy a file under `name`, into `parent` or the store root.
    async fn copy_file(
        &self,
        auth: &AuthContext,
        id: &str,
        name: &str,
        parent: Option<&str>,
    ) -> StoreResult<FileInfo>;

    /// Move a file to the trash.
    async fn trash(&self, auth: &AuthContext, id: &str) -> StoreResult<()>;

    /// Create a file from raw bytes inside `folder_id`.
    async fn create_file(
        &self,
        auth: &AuthContext,
        folder_id: &str,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> StoreResult<FileInfo>;
}

/// Editable document operations.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn open_document(&self, auth: &AuthContext, id: &str) -> StoreResult<Document>;

    /// Persist the document (save-and-close).
    async fn save_document(&self, auth: &AuthContext, document: &Document) -> StoreResult<()>;

    /// Ids of the document's tabs, in order.
    async fn tab_ids(&self, auth: &AuthContext, id: &str) -> StoreResult<Vec<String>>;
}

/// Tabular data operations.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Sheets of a spreadsheet, in display order.
    async fn list_sheets(&self, auth: &AuthContext, spreadsheet_id: &str) -> StoreResult<Vec<SheetInfo>>;

    /// Every cell of a sheet as display-formatted text. Row 0 is the header row.
    async fn display_values(
        &self,
        auth: &AuthContext,
        spreadsheet_id: &str,
        sheet_id: i64,
    ) -> StoreResult<Vec<Vec<String>>>;
}

/// Fixed-layout export.
#[async_trait]
pub trait PdfExporter: Send + Sync {
    /// PDF bytes of one tab of a document.
    async fn export_pdf(&self, auth: &AuthContext, document_id: &str, tab_id: &str) -> ExportResult<Vec<u8>>;
}

/// The set of collaborators one engine instance talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub files: Arc<dyn FileStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub sheets: Arc<dyn SheetStore>,
    pub exporter: Arc<dyn PdfExporter>,
}

impl Collaborators {
    /// Every store backed by one workspace, with the given exporter.
    pub fn from_workspace(workspace: Arc<MemoryWorkspace>, exporter: Arc<dyn PdfExporter>) -> Self {
        Self {
            files: workspace.clone(),
            documents: workspace.clone(),
            sheets: workspace,
            exporter,
        }
    }
}
