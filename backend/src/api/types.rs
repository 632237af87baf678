//! Request and response bodies of the HTTP API.
//!
//! Field names are camelCase on the wire. Generation requests carry the ids
//! returned by validation (`ids.template`, `ids.folder`), not raw URLs.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::{FileInfo, OutputConfig, OutputMode};

/// `POST /api/validate`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub template_url: String,
    pub data_url: String,
    pub destination_url: String,
    #[serde(default)]
    pub output_mode: OutputMode,
}

/// `POST /api/generate/single`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSingleRequest {
    pub template_id: String,
    pub folder_id: String,
    pub row: Vec<String>,
    pub headers: Vec<String>,
    #[serde(default)]
    pub config: OutputConfig,
}

/// `POST /api/generate/merged`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMergedRequest {
    pub template_id: String,
    pub folder_id: String,
    pub rows: Vec<Vec<String>>,
    pub headers: Vec<String>,
    #[serde(default)]
    pub config: OutputConfig,
}

/// Response to a CSV upload on `POST /api/sheets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetUploadResponse {
    pub spreadsheet: FileInfo,
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

/// Create an error response
pub fn error_response(message: &str) -> Value {
    json!({
        "status": "error",
        "error": message
    })
}
