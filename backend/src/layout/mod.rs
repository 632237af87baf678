//! Page geometry.
//!
//! Maps a paper size and orientation to page dimensions in points
//! (1 inch = 72 points) and applies them to a document body.

use crate::models::{Body, OutputConfig, Orientation, PaperSize};

impl PaperSize {
    /// Portrait `(width, height)` in points.
    pub fn dimensions(self) -> (f64, f64) {
        match self {
            PaperSize::A4 => (595.276, 841.89),
            PaperSize::A3 => (841.89, 1190.55),
            PaperSize::A5 => (419.528, 595.276),
            PaperSize::B4 => (728.5, 1031.8),
            PaperSize::B5 => (515.9, 728.5),
        }
    }
}

/// Final `(width, height)` for a configuration.
pub fn page_dimensions(config: &OutputConfig) -> (f64, f64) {
    let (width, height) = config.paper_size.dimensions();
    match config.orientation {
        Orientation::Portrait => (width, height),
        Orientation::Landscape => (height, width),
    }
}

/// Set the body's page size from `config`. Idempotent.
pub fn apply_page_size(body: &mut Body, config: &OutputConfig) {
    let (width, height) = page_dimensions(config);
    body.page_width = width;
    body.page_height = height;
}
