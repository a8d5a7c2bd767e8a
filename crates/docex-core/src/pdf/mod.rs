//! PDF processing module.

mod extractor;
mod raster;

pub use extractor::ScannedPdf;
pub use raster::{
    create_rasterizer, EmbeddedImageRasterizer, PageRasterizer, PdftoppmRasterizer,
};

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;
