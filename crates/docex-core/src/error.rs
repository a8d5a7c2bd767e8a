//! Error types for the docex-core library.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for the docex library.
#[derive(Error, Debug)]
pub enum DocexError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Text extraction error (format dispatch, rasterization, OCR).
    #[error("text extraction error: {0}")]
    Text(#[from] TextError),

    /// Completion service error.
    #[error("completion error: {0}")]
    Completion(#[from] CompletionError),

    /// Model response could not be turned into a record.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Output persistence error.
    #[error("write error: {0}")]
    Write(#[from] WriteError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract the embedded text layer.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract images from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// The external rasterizer binary is not installed.
    #[error("{0} not found on PATH (install poppler-utils)")]
    RasterizerNotFound(String),

    /// The external rasterizer exited unsuccessfully.
    #[error("{tool} exited with code {code}: {stderr}")]
    RasterizerFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    /// A rendered page image could not be read back.
    #[error("failed to load rendered page: {0}")]
    RenderedPage(String),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors from the text extraction adapter.
#[derive(Error, Debug)]
pub enum TextError {
    /// The file extension is not one we know how to read.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// PDF loading or page rasterization failed.
    #[error(transparent)]
    Pdf(#[from] PdfError),

    /// The OCR engine failed on a page or image.
    #[error(transparent)]
    Ocr(#[from] OcrError),

    /// The image file could not be decoded.
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error reading the document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// OCR ran but recognized no text.
    #[error("no text recognized")]
    NoText,
}

/// Errors from the completion service boundary.
#[derive(Error, Debug)]
pub enum CompletionError {
    /// The service could not be reached.
    #[error("completion service unavailable: {0}")]
    ServiceUnavailable(String),

    /// No response within the configured bound.
    #[error("completion service timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered with a non-success status.
    #[error("completion service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The service reply body was not in the expected shape.
    #[error("invalid completion reply: {0}")]
    InvalidReply(String),
}

impl CompletionError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::ServiceUnavailable(_) | CompletionError::Timeout(_) => true,
            CompletionError::Status { status, .. } => *status == 429 || *status >= 500,
            CompletionError::InvalidReply(_) => false,
        }
    }
}

/// Errors locating or decoding the JSON payload in a model response.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The response contains no `{` ... `}` pair.
    #[error("no JSON object found in response")]
    NoJsonObject,

    /// The located text is not valid JSON.
    #[error("invalid JSON in response: {0}")]
    InvalidJson(String),

    /// The JSON decoded but is not an object.
    #[error("JSON payload is not an object")]
    NotAnObject,
}

/// Errors persisting output files.
#[derive(Error, Debug)]
pub enum WriteError {
    /// File system failure for a specific target.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Workbook construction failed.
    #[error("failed to build workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Summary CSV failure.
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for the docex library.
pub type Result<T> = std::result::Result<T, DocexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CompletionError::ServiceUnavailable("refused".into()).is_transient());
        assert!(CompletionError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(CompletionError::Status { status: 503, body: String::new() }.is_transient());
        assert!(CompletionError::Status { status: 429, body: String::new() }.is_transient());
        assert!(!CompletionError::Status { status: 404, body: String::new() }.is_transient());
        assert!(!CompletionError::InvalidReply("x".into()).is_transient());
    }
}
