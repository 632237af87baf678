//! Output document generation.
//!
//! - [`single`] - One output per row, named from the row
//! - [`merged`] - One output for all rows, separated by page breaks
//! - [`output`] - PDF/native branching and cleanup of created files
//!
//! Both generators work on fresh copies of the template and never touch the
//! template itself. Faults are caught per call and returned as a failed
//! [`crate::models::GenerationResult`].

pub mod merged;
pub mod output;
pub mod single;

pub use merged::{generate_merged_document, MERGED_NAME_PREFIX};
pub use output::timestamp;
pub use single::{generate_single_document, DEFAULT_FILE_NAME};

use crate::error::{GenerationError, GenerationOutcome};
use crate::models::{Body, Document};

/// Body of the tab generation works on (the first one).
pub(crate) fn working_tab(document: &mut Document) -> GenerationOutcome<&mut Body> {
    let id = document.id.clone();
    document
        .tabs
        .first_mut()
        .map(|tab| &mut tab.body)
        .ok_or(GenerationError::EmptyTemplate(id))
}
