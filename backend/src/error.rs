//! Error types for the mail-merge engine.
//!
//! This module defines the error hierarchy used below the public surface:
//!
//! - [`StoreError`] - Document, sheet and file store failures
//! - [`ExportError`] - Fixed-layout (PDF) export failures
//! - [`GenerationError`] - Faults while producing an output document
//! - [`CsvError`] - CSV import errors
//! - [`ServerError`] - HTTP shell errors
//!
//! Validation problems are deliberately absent: they are accumulated as
//! messages in [`crate::models::ValidationReport`] and never raised.

use thiserror::Error;

// =============================================================================
// Store Errors
// =============================================================================

/// Errors returned by the document, sheet and file collaborators.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// No resource with this id.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The resource exists but the credential cannot reach it.
    #[error("Permission denied for resource: {0}")]
    PermissionDenied(String),

    /// The resource exists but is not of the requested kind.
    #[error("Resource {id} is a {actual}, expected a {expected}")]
    WrongKind {
        id: String,
        expected: String,
        actual: String,
    },

    /// Any other backend failure.
    #[error("Store backend failure: {0}")]
    Backend(String),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors from a fixed-layout exporter.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The export endpoint answered with something other than 200.
    #[error("PDF export failed with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never completed.
    #[error("PDF export request failed: {0}")]
    Request(String),

    /// Local rendering failed.
    #[error("PDF rendering failed: {0}")]
    Render(String),

    /// The document could not be read for export.
    #[error("PDF export source error: {0}")]
    Store(#[from] StoreError),
}

// =============================================================================
// Generation Errors
// =============================================================================

/// Faults raised while copying, substituting or exporting an output.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// A collaborator call failed.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The PDF export failed.
    #[error("{0}")]
    Export(#[from] ExportError),

    /// A copied document has no tab to work on.
    #[error("Document {0} has no tabs")]
    EmptyTemplate(String),

    /// A header produced an unusable placeholder pattern.
    #[error("Invalid placeholder pattern for header '{header}': {message}")]
    Pattern { header: String, message: String },

    /// A collaborator panicked.
    #[error("Internal fault: {0}")]
    Panic(String),
}

// =============================================================================
// CSV Import Errors
// =============================================================================

/// Errors while importing a CSV file as a spreadsheet.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid CSV format.
    #[error("Invalid CSV format at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing or malformed credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// CSV import failed.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// A store call made directly by the shell failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Readable detail from a caught panic payload.
pub fn panic_detail(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for collaborator calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for exporter calls.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for generation steps.
pub type GenerationOutcome<T> = Result<T, GenerationError>;

/// Result type for CSV import.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
