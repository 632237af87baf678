//! # Mailmerge - template/data reconciliation and document assembly
//!
//! Mailmerge fills a document template with rows from a spreadsheet, producing
//! one document per row or a single merged document, optionally exported as PDF.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ References  │────▶│  Resolver   │────▶│ Validation  │────▶│  Generate   │
//! │ (URL / id)  │     │ (id + gid)  │     │   (gate)    │     │ (one / all) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                              layout + substitute
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mailmerge::{MailMerge, MemoryWorkspace, AuthContext, MergeSources, OutputMode, OutputConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let workspace = Arc::new(MemoryWorkspace::load(".mailmerge/workspace.json".as_ref()).unwrap());
//!     let engine = MailMerge::local(workspace);
//!     let run = engine
//!         .run(&AuthContext::bearer("local"), sources, OutputMode::Merged, &OutputConfig::default())
//!         .await;
//!     println!("{} outputs", run.succeeded());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Output options, reports, document tree
//! - [`resolver`] - Reference to resource id
//! - [`placeholder`] - `{{ name }}` discovery and matching
//! - [`validation`] - The validation gate
//! - [`layout`] - Paper size and orientation
//! - [`substitute`] - Row values into text
//! - [`generate`] - Single and merged generation
//! - [`store`] - Collaborator contracts and the in-memory workspace
//! - [`export`] - PDF exporters
//! - [`parser`] - CSV and plain-text import
//! - [`engine`] - Facade over the three operations
//! - [`config`] - Environment settings
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Reconciliation
pub mod resolver;
pub mod placeholder;
pub mod validation;

// Assembly
pub mod layout;
pub mod substitute;
pub mod generate;

// Collaborators
pub mod store;
pub mod export;

// Import
pub mod parser;

pub mod engine;
pub mod config;

// HTTP API
pub mod api;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{CsvError, ExportError, GenerationError, ServerError, StoreError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Body,
    Document,
    Element,
    FileInfo,
    FileKind,
    GenerationResult,
    Orientation,
    OutputConfig,
    OutputMode,
    OutputType,
    PaperSize,
    ValidationReport,
};

// =============================================================================
// Re-exports - Core operations
// =============================================================================

pub use resolver::{extract_selector, resolve_id, resolve_reference, ResolvedReference};
pub use placeholder::{extract_placeholders, PlaceholderPattern};
pub use validation::validate_and_fetch_data;
pub use layout::{apply_page_size, page_dimensions};
pub use substitute::{substitute_body, substitute_into_name};
pub use generate::{generate_merged_document, generate_single_document};

// =============================================================================
// Re-exports - Collaborators
// =============================================================================

pub use store::{
    memory::Sheet,
    AuthContext,
    Collaborators,
    DocumentStore,
    FileStore,
    MemoryWorkspace,
    PdfExporter,
    SheetStore,
};
pub use export::{HttpPdfExporter, LocalPdfExporter};

// =============================================================================
// Re-exports - Import, engine, settings
// =============================================================================

pub use parser::{parse_bytes_auto, parse_csv_file_auto, text_to_body, ParseResult};
pub use engine::{MailMerge, MergeRun, MergeSources};
pub use config::Settings;

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::{router, start_server, AppState};
