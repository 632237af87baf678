//! Fixed-layout (PDF) exporters.
//!
//! - [`http::HttpPdfExporter`] - Authenticated fetch against the platform export endpoint
//! - [`local::LocalPdfExporter`] - In-process rendering with lopdf

pub mod http;
pub mod local;

pub use http::{HttpPdfExporter, DEFAULT_EXPORT_BASE_URL};
pub use local::{render_body, LocalPdfExporter};
