//! Text extraction adapter: document path in, raw OCR text out.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::TextError;
use crate::models::config::PdfConfig;
use crate::models::document::DocumentFormat;
use crate::ocr::OcrBackend;
use crate::pdf::{create_rasterizer, PageRasterizer, ScannedPdf};

/// Produces raw text for a document.
pub trait TextSource {
    /// Extract text, or say why the document has to be skipped.
    fn extract_text(&self, path: &Path) -> Result<String, TextError>;
}

/// Dispatches on file format: images go straight to OCR, PDFs are
/// rasterized page by page first.
pub struct DocumentTextExtractor<O: OcrBackend> {
    ocr: O,
    rasterizer: Box<dyn PageRasterizer>,
    config: PdfConfig,
}

impl<O: OcrBackend> DocumentTextExtractor<O> {
    /// Create an extractor using the rasterizer named in `config`.
    pub fn new(ocr: O, config: PdfConfig) -> Self {
        let rasterizer = create_rasterizer(&config);
        Self {
            ocr,
            rasterizer,
            config,
        }
    }

    /// Replace the rasterizer.
    pub fn with_rasterizer(mut self, rasterizer: Box<dyn PageRasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    fn extract_image(&self, path: &Path) -> Result<String, TextError> {
        let image = image::open(path)?;
        let text = self.ocr.recognize(&image)?;
        non_empty(text)
    }

    fn extract_pdf(&self, path: &Path) -> Result<String, TextError> {
        if self.config.prefer_embedded_text {
            match self.embedded_text(path) {
                Ok(Some(text)) => return Ok(text),
                Ok(None) => debug!("{}: text layer too short, running OCR", path.display()),
                Err(e) => warn!("{}: text layer unreadable ({}), running OCR", path.display(), e),
            }
        }

        let pages = self.rasterizer.rasterize(path, self.config.last_page())?;
        debug!(
            "{}: {} page(s) rasterized with {}",
            path.display(),
            pages.len(),
            self.rasterizer.name()
        );

        let mut texts = Vec::with_capacity(pages.len());
        let mut first_error = None;

        for (i, page) in pages.iter().enumerate() {
            match self.ocr.recognize(page) {
                Ok(text) if !text.trim().is_empty() => texts.push(text.trim().to_string()),
                Ok(_) => debug!("No text detected on page {}", i + 1),
                Err(e) => {
                    warn!("OCR failed for page {}: {}", i + 1, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if texts.is_empty() {
            return Err(match first_error {
                Some(e) => TextError::Ocr(e),
                None => TextError::NoText,
            });
        }

        Ok(texts.join(&self.config.page_separator))
    }

    fn embedded_text(&self, path: &Path) -> Result<Option<String>, TextError> {
        let data = std::fs::read(path)?;
        let text = ScannedPdf::from_bytes(&data)?.text_layer()?;
        let text = text.trim();

        if text.chars().count() >= self.config.min_text_length {
            debug!("{}: using embedded text layer ({} chars)", path.display(), text.len());
            Ok(Some(text.to_string()))
        } else {
            Ok(None)
        }
    }
}

impl<O: OcrBackend> TextSource for DocumentTextExtractor<O> {
    fn extract_text(&self, path: &Path) -> Result<String, TextError> {
        let format = DocumentFormat::from_path(path).ok_or_else(|| {
            TextError::UnsupportedFormat(
                path.extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        })?;

        if format.is_image() {
            self.extract_image(path)
        } else {
            self.extract_pdf(path)
        }
    }
}

fn non_empty(text: String) -> Result<String, TextError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(TextError::NoText)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Build the default extractor: pure-onnx-ocr plus the configured rasterizer.
#[cfg(feature = "onnx-ocr")]
pub fn create_text_extractor(
    config: &crate::models::config::DocexConfig,
) -> Result<DocumentTextExtractor<crate::ocr::PureOcrEngine>, crate::error::OcrError> {
    let engine = crate::ocr::PureOcrEngine::from_config(&config.ocr)?;
    Ok(DocumentTextExtractor::new(engine, config.pdf.clone()))
}
