//! In-process workspace implementing every store trait.
//!
//! Folders, documents, spreadsheets and plain files live in one map keyed by
//! id. Trashing is a soft delete. A file may carry an `owner_token`; any
//! other credential gets `PermissionDenied`, which is how access failures are
//! exercised without a real platform.
//!
//! The whole workspace serializes to a JSON snapshot so the CLI can keep
//! state between invocations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{AuthContext, DocumentStore, FileStore, SheetStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{Body, Document, FileInfo, FileKind, SheetInfo, Tab};

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const DOCUMENT_MIME: &str = "application/vnd.google-apps.document";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// One sheet with its display values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub sheet_id: i64,
    pub title: String,
    pub values: Vec<Vec<String>>,
}

/// What a stored file holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FileContent {
    Folder,
    Document { tabs: Vec<Tab> },
    Spreadsheet { sheets: Vec<Sheet> },
    #[serde(rename_all = "camelCase")]
    Blob { mime_type: String, bytes: Vec<u8> },
}

impl FileContent {
    fn kind(&self) -> FileKind {
        match self {
            FileContent::Folder => FileKind::Folder,
            FileContent::Document { .. } => FileKind::Document,
            FileContent::Spreadsheet { .. } => FileKind::Spreadsheet,
            FileContent::Blob { .. } => FileKind::Blob,
        }
    }

    fn mime_type(&self) -> &str {
        match self {
            FileContent::Folder => FOLDER_MIME,
            FileContent::Document { .. } => DOCUMENT_MIME,
            FileContent::Spreadsheet { .. } => SPREADSHEET_MIME,
            FileContent::Blob { mime_type, .. } => mime_type,
        }
    }
}

/// A file record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub trashed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_token: Option<String>,
    pub created_at: String,
    pub content: FileContent,
}

impl StoredFile {
    fn info(&self) -> FileInfo {
        let kind = self.content.kind();
        FileInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            kind,
            mime_type: self.content.mime_type().to_string(),
            url: file_url(kind, &self.id),
        }
    }
}

/// Platform-style URL, so it resolves back to the id.
fn file_url(kind: FileKind, id: &str) -> String {
    match kind {
        FileKind::Folder => format!("https://drive.google.com/drive/folders/{}", id),
        FileKind::Document => format!("https://docs.google.com/document/d/{}/edit", id),
        FileKind::Spreadsheet => format!("https://docs.google.com/spreadsheets/d/{}/edit", id),
        FileKind::Blob => format!("https://drive.google.com/file/d/{}/view", id),
    }
}

/// Serializable state of a workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceSnapshot {
    pub files: BTreeMap<String, StoredFile>,
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryWorkspace {
    state: Mutex<WorkspaceSnapshot>,
}

impl MemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: WorkspaceSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    /// Load a snapshot file; a missing file yields an empty workspace.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let snapshot: WorkspaceSnapshot = serde_json::from_str(&content)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the snapshot as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let snapshot = self.snapshot().map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(&snapshot)?)
    }

    pub fn snapshot(&self) -> StoreResult<WorkspaceSnapshot> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, WorkspaceSnapshot>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("workspace lock poisoned".to_string()))
    }

    fn insert(
        &self,
        name: &str,
        parent: Option<&str>,
        owner_token: Option<String>,
        content: FileContent,
    ) -> StoreResult<FileInfo> {
        let mut state = self.lock()?;
        if let Some(parent_id) = parent {
            match state.files.get(parent_id) {
                Some(f) if !f.trashed && f.content == FileContent::Folder => {}
                Some(f) if !f.trashed => {
                    return Err(StoreError::WrongKind {
                        id: parent_id.to_string(),
                        expected: FileKind::Folder.label().to_string(),
                        actual: f.content.kind().label().to_string(),
                    })
                }
                _ => return Err(StoreError::NotFound(parent_id.to_string())),
            }
        }
        let record = StoredFile {
            id: Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            parent: parent.map(str::to_string),
            trashed: false,
            owner_token,
            created_at: chrono::Utc::now().to_rfc3339(),
            content,
        };
        let info = record.info();
        state.files.insert(record.id.clone(), record);
        Ok(info)
    }

    pub fn create_folder(&self, name: &str, parent: Option<&str>) -> StoreResult<FileInfo> {
        self.insert(name, parent, None, FileContent::Folder)
    }

    /// Create a single-tab document.
    pub fn create_document(&self, name: &str, parent: Option<&str>, body: Body) -> StoreResult<FileInfo> {
        let tabs = Document::new("", name, body).tabs;
        self.insert(name, parent, None, FileContent::Document { tabs })
    }

    pub fn create_spreadsheet(
        &self,
        name: &str,
        parent: Option<&str>,
        sheets: Vec<Sheet>,
    ) -> StoreResult<FileInfo> {
        self.insert(name, parent, None, FileContent::Spreadsheet { sheets })
    }

    /// Create a spreadsheet on behalf of `auth`, which becomes its owner.
    ///
    /// The parent folder must be reachable with the same credential.
    pub fn create_spreadsheet_as(
        &self,
        auth: &AuthContext,
        name: &str,
        parent: Option<&str>,
        sheets: Vec<Sheet>,
    ) -> StoreResult<FileInfo> {
        if let Some(parent_id) = parent {
            self.accessible(auth, parent_id)?;
        }
        let owner = Some(auth.access_token().to_string());
        self.insert(name, parent, owner, FileContent::Spreadsheet { sheets })
    }

    /// Restrict a file to one credential.
    pub fn restrict(&self, id: &str, owner_token: &str) -> StoreResult<()> {
        let mut state = self.lock()?;
        let file = state
            .files
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        file.owner_token = Some(owner_token.to_string());
        Ok(())
    }

    /// Every non-trashed file.
    pub fn list(&self) -> StoreResult<Vec<FileInfo>> {
        Ok(self
            .lock()?
            .files
            .values()
            .filter(|f| !f.trashed)
            .map(StoredFile::info)
            .collect())
    }

    /// Non-trashed files directly inside a folder.
    pub fn children(&self, folder_id: &str) -> StoreResult<Vec<FileInfo>> {
        Ok(self
            .lock()?
            .files
            .values()
            .filter(|f| !f.trashed && f.parent.as_deref() == Some(folder_id))
            .map(StoredFile::info)
            .collect())
    }

    pub fn is_trashed(&self, id: &str) -> StoreResult<bool> {
        self.lock()?
            .files
            .get(id)
            .map(|f| f.trashed)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Raw bytes of a plain file, ignoring credentials.
    pub fn blob(&self, id: &str) -> StoreResult<Vec<u8>> {
        match self.lock()?.files.get(id) {
            Some(StoredFile {
                content: FileContent::Blob { bytes, .. },
                ..
            }) => Ok(bytes.clone()),
            Some(f) => Err(wrong_kind(f, FileKind::Blob)),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    /// Clone of a live record after checking the credential.
    fn accessible(&self, auth: &AuthContext, id: &str) -> StoreResult<StoredFile> {
        let state = self.lock()?;
        let file = state
            .files
            .get(id)
            .filter(|f| !f.trashed)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        match &file.owner_token {
            Some(owner) if owner != auth.access_token() => Err(StoreError::PermissionDenied(id.to_string())),
            _ => Ok(file.clone()),
        }
    }
}

fn wrong_kind(file: &StoredFile, expected: FileKind) -> StoreError {
    StoreError::WrongKind {
        id: file.id.clone(),
        expected: expected.label().to_string(),
        actual: file.content.kind().label().to_string(),
    }
}

#[async_trait]
impl FileStore for MemoryWorkspace {
    async fn get_file(&self, auth: &AuthContext, id: &str) -> StoreResult<FileInfo> {
        Ok(self.accessible(auth, id)?.info())
    }

    async fn get_folder(&self, auth: &AuthContext, id: &str) -> StoreResult<FileInfo> {
        let file = self.accessible(auth, id)?;
        match file.content {
            FileContent::Folder => Ok(file.info()),
            _ => Err(wrong_kind(&file, FileKind::Folder)),
        }
    }

    async fn copy_file(
        &self,
        auth: &AuthContext,
        id: &str,
        name: &str,
        parent: Option<&str>,
    ) -> StoreResult<FileInfo> {
        let source = self.accessible(auth, id)?;
        if let Some(parent_id) = parent {
            self.get_folder(auth, parent_id).await?;
        }
        self.insert(name, parent, Some(auth.access_token().to_string()), source.content)
    }

    async fn trash(&self, auth: &AuthContext, id: &str) -> StoreResult<()> {
        self.accessible(auth, id)?;
        let mut state = self.lock()?;
        if let Some(file) = state.files.get_mut(id) {
            file.trashed = true;
        }
        Ok(())
    }

    async fn create_file(
        &self,
        auth: &AuthContext,
        folder_id: &str,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> StoreResult<FileInfo> {
        self.get_folder(auth, folder_id).await?;
        self.insert(
            name,
            Some(folder_id),
            Some(auth.access_token().to_string()),
            FileContent::Blob {
                mime_type: mime_type.to_string(),
                bytes,
            },
        )
    }
}

#[async_trait]
impl DocumentStore for MemoryWorkspace {
    async fn open_document(&self, auth: &AuthContext, id: &str) -> StoreResult<Document> {
        let file = self.accessible(auth, id)?;
        match file.content {
            FileContent::Document { tabs } => Ok(Document {
                id: file.id,
                name: file.name,
                tabs,
            }),
            _ => Err(wrong_kind(&file, FileKind::Document)),
        }
    }

    async fn save_document(&self, auth: &AuthContext, document: &Document) -> StoreResult<()> {
        let file = self.accessible(auth, &document.id)?;
        if !matches!(file.content, FileContent::Document { .. }) {
            return Err(wrong_kind(&file, FileKind::Document));
        }
        let mut state = self.lock()?;
        if let Some(record) = state.files.get_mut(&document.id) {
            record.content = FileContent::Document {
                tabs: document.tabs.clone(),
            };
        }
        Ok(())
    }

    async fn tab_ids(&self, auth: &AuthContext, id: &str) -> StoreResult<Vec<String>> {
        let document = self.open_document(auth, id).await?;
        Ok(document.tabs.into_iter().map(|t| t.id).collect())
    }
}

#[async_trait]
impl SheetStore for MemoryWorkspace {
    async fn list_sheets(&self, auth: &AuthContext, spreadsheet_id: &str) -> StoreResult<Vec<SheetInfo>> {
        let file = self.accessible(auth, spreadsheet_id)?;
        match file.content {
            FileContent::Spreadsheet { sheets } => Ok(sheets
                .into_iter()
                .map(|s| SheetInfo {
                    sheet_id: s.sheet_id,
                    title: s.title,
                })
                .collect()),
            _ => Err(wrong_kind(&file, FileKind::Spreadsheet)),
        }
    }

    async fn display_values(
        &self,
        auth: &AuthContext,
        spreadsheet_id: &str,
        sheet_id: i64,
    ) -> StoreResult<Vec<Vec<String>>> {
        let file = self.accessible(auth, spreadsheet_id)?;
        match file.content {
            FileContent::Spreadsheet { sheets } => sheets
                .into_iter()
                .find(|s| s.sheet_id == sheet_id)
                .map(|s| s.values)
                .ok_or_else(|| StoreError::NotFound(format!("{}#gid={}", spreadsheet_id, sheet_id))),
            _ => Err(wrong_kind(&file, FileKind::Spreadsheet)),
        }
    }
}
