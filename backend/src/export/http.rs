//! Remote PDF export through the platform's document export endpoint.

use async_trait::async_trait;

use crate::error::{ExportError, ExportResult};
use crate::api::logs::log_info_indent;
use crate::store::{AuthContext, PdfExporter};

/// Default platform host serving `/document/d/<id>/export`.
pub const DEFAULT_EXPORT_BASE_URL: &str = "https://docs.google.com";

/// Exporter that fetches `{base}/document/d/{id}/export?format=pdf&tab={tab}`
/// with the caller's bearer token.
#[derive(Clone)]
pub struct HttpPdfExporter {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPdfExporter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Export URL for one tab of a document.
    pub fn export_url(&self, document_id: &str, tab_id: &str) -> String {
        format!(
            "{}/document/d/{}/export?format=pdf&tab={}",
            self.base_url, document_id, tab_id
        )
    }
}

impl Default for HttpPdfExporter {
    fn default() -> Self {
        Self::new(DEFAULT_EXPORT_BASE_URL)
    }
}

#[async_trait]
impl PdfExporter for HttpPdfExporter {
    async fn export_pdf(&self, auth: &AuthContext, document_id: &str, tab_id: &str) -> ExportResult<Vec<u8>> {
        let url = self.export_url(document_id, tab_id);
        log_info_indent(format!("Exporting {} (tab {}) as PDF", document_id, tab_id), 1);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, auth.authorization_header())
            .send()
            .await
            .map_err(|e| ExportError::Request(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response
                .text()
                .await
                .map_err(|e| ExportError::Request(e.to_string()))?;
            return Err(ExportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExportError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
