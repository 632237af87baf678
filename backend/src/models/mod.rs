//! Domain models for the mail-merge engine.
//!
//! This module contains the data structures shared by validation and generation:
//!
//! - [`OutputMode`] - Individual documents or one merged document
//! - [`OutputConfig`] - Paper size, orientation and output type
//! - [`ValidationReport`] - Result of the validation gate
//! - [`GenerationResult`] - Result of one generation call
//! - [`FileInfo`] / [`SheetInfo`] - Collaborator metadata
//! - [`document`] - The template document tree (tabs, body, elements)

pub mod document;

use serde::{Deserialize, Serialize};

pub use document::{Body, Document, Element, Tab};

// =============================================================================
// Output Mode
// =============================================================================

/// How the caller intends to generate output once validation passes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum OutputMode {
    /// One document per row; the second column seeds the file name.
    #[default]
    Individual,
    /// One document holding every row, separated by page breaks.
    Merged,
}

impl OutputMode {
    /// Anything other than `merged` means individual output.
    pub fn parse(value: &str) -> Self {
        if value == "merged" {
            OutputMode::Merged
        } else {
            OutputMode::Individual
        }
    }

    pub fn is_merged(self) -> bool {
        self == OutputMode::Merged
    }
}

impl From<String> for OutputMode {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

// =============================================================================
// Output Configuration
// =============================================================================

/// Supported paper sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "String")]
pub enum PaperSize {
    #[default]
    A4,
    A3,
    A5,
    B4,
    B5,
}

impl PaperSize {
    /// Unknown names fall back to A4.
    pub fn parse(value: &str) -> Self {
        match value {
            "A3" => PaperSize::A3,
            "A5" => PaperSize::A5,
            "B4" => PaperSize::B4,
            "B5" => PaperSize::B5,
            _ => PaperSize::A4,
        }
    }
}

impl From<String> for PaperSize {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn parse(value: &str) -> Self {
        if value == "landscape" {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

impl From<String> for Orientation {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// Output format of a generated document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum OutputType {
    /// The editable document copy is the output.
    #[default]
    Native,
    /// The copy is exported to PDF and then trashed.
    Pdf,
}

impl OutputType {
    pub fn parse(value: &str) -> Self {
        if value == "pdf" {
            OutputType::Pdf
        } else {
            OutputType::Native
        }
    }
}

impl From<String> for OutputType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// Per-call output configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputConfig {
    pub paper_size: PaperSize,
    pub orientation: Orientation,
    pub output_type: OutputType,
}

// =============================================================================
// Validation Report
// =============================================================================

/// Ids the client keeps between validation and generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedIds {
    pub template: String,
    pub folder: String,
}

/// Outcome of [`crate::validation::validate_and_fetch_data`].
///
/// `success` is true only when `validation_errors` is empty and no
/// unexpected fault occurred; the caller must not generate otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub success: bool,

    /// Set when an unexpected fault aborted validation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Human-readable validation failures
    pub validation_errors: Vec<String>,

    /// Column names from the header row
    pub headers: Vec<String>,

    /// Accepted data rows (display values)
    #[serde(rename = "data")]
    pub rows: Vec<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<ResolvedIds>,
}

impl ValidationReport {
    /// Record a failure message.
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.validation_errors.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.validation_errors.is_empty()
    }
}

// =============================================================================
// Generation Result
// =============================================================================

/// Outcome of one generation call (one row, or one merge).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub success: bool,
    pub file_name: String,
    pub url: String,
    #[serde(default)]
    pub error: String,
}

impl GenerationResult {
    pub fn succeeded(file_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            success: true,
            file_name: file_name.into(),
            url: url.into(),
            error: String::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Collaborator Metadata
// =============================================================================

/// What a stored file is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Folder,
    Document,
    Spreadsheet,
    Blob,
}

impl FileKind {
    pub fn label(self) -> &'static str {
        match self {
            FileKind::Folder => "folder",
            FileKind::Document => "document",
            FileKind::Spreadsheet => "spreadsheet",
            FileKind::Blob => "file",
        }
    }
}

/// File metadata returned by a [`crate::store::FileStore`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub id: String,
    pub name: String,
    pub kind: FileKind,
    pub mime_type: String,
    pub url: String,
}

/// One sheet of a spreadsheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    /// Stable per-sheet id (the `gid` in sheet URLs)
    pub sheet_id: i64,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_enum_parsing() {
        assert_eq!(PaperSize::parse("Letter"), PaperSize::A4);
        assert_eq!(PaperSize::parse("B5"), PaperSize::B5);
        assert_eq!(Orientation::parse("LANDSCAPE"), Orientation::Portrait);
        assert_eq!(OutputType::parse("docx"), OutputType::Native);
        assert_eq!(OutputMode::parse("individual"), OutputMode::Individual);
        assert_eq!(OutputMode::parse("anything"), OutputMode::Individual);
        assert!(OutputMode::parse("merged").is_merged());
    }

    #[test]
    fn test_output_config_from_json() {
        let config: OutputConfig = serde_json::from_value(serde_json::json!({
            "paperSize": "Tabloid",
            "orientation": "landscape",
            "outputType": "pdf"
        }))
        .unwrap();
        assert_eq!(config.paper_size, PaperSize::A4);
        assert_eq!(config.orientation, Orientation::Landscape);
        assert_eq!(config.output_type, OutputType::Pdf);

        let defaults: OutputConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, OutputConfig::default());
    }

    #[test]
    fn test_validation_report_wire_format() {
        let report = ValidationReport {
            success: true,
            headers: vec!["No".into(), "Name".into()],
            rows: vec![vec!["1".into(), "Alice".into()]],
            ids: Some(ResolvedIds {
                template: "t".into(),
                folder: "f".into(),
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["data"][0][1], "Alice");
        assert_eq!(json["ids"]["folder"], "f");
        assert!(json["validationErrors"].as_array().unwrap().is_empty());
        assert!(json.get("message").is_none());
    }
}
