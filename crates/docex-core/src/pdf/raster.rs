//! Page rasterization backends.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::DynamicImage;
use tracing::debug;

use super::extractor::ScannedPdf;
use super::Result;
use crate::error::PdfError;
use crate::models::config::{PdfConfig, RasterizerKind};

/// Turns PDF pages into images for OCR.
pub trait PageRasterizer: Send + Sync {
    /// Render pages `1..=last_page` (all pages when `None`) in page order.
    fn rasterize(&self, pdf_path: &Path, last_page: Option<u32>) -> Result<Vec<DynamicImage>>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Build the rasterizer selected in the configuration.
pub fn create_rasterizer(config: &PdfConfig) -> Box<dyn PageRasterizer> {
    match config.rasterizer {
        RasterizerKind::Pdftoppm => Box::new(PdftoppmRasterizer::new(config.render_dpi)),
        RasterizerKind::Embedded => Box::new(EmbeddedImageRasterizer),
    }
}

/// Renders pages with poppler's `pdftoppm`.
///
/// Page PNGs live in a private temporary directory that is removed when
/// `rasterize` returns, whether it succeeded or not.
pub struct PdftoppmRasterizer {
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }

    /// Check if pdftoppm is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftoppm")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf_path: &Path, last_page: Option<u32>) -> Result<Vec<DynamicImage>> {
        let temp_dir = tempfile::Builder::new()
            .prefix("docex-pages-")
            .tempdir()
            .map_err(|e| PdfError::ImageExtraction(format!("failed to create temp dir: {}", e)))?;
        let prefix = temp_dir.path().join("page");

        let mut cmd = Command::new("pdftoppm");
        cmd.arg("-r").arg(self.dpi.to_string()).arg("-png").arg("-f").arg("1");
        if let Some(last) = last_page {
            cmd.arg("-l").arg(last.to_string());
        }
        cmd.arg(pdf_path).arg(&prefix);

        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PdfError::RasterizerNotFound("pdftoppm".to_string())
            } else {
                PdfError::ImageExtraction(format!("pdftoppm failed to start: {}", e))
            }
        })?;

        if !output.status.success() {
            return Err(PdfError::RasterizerFailed {
                tool: "pdftoppm".to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let pages = rendered_pages(temp_dir.path())?;
        if pages.is_empty() {
            return Err(PdfError::NoPages);
        }
        debug!("pdftoppm rendered {} page(s) at {} dpi", pages.len(), self.dpi);

        pages
            .iter()
            .map(|p| {
                image::open(p)
                    .map_err(|e| PdfError::RenderedPage(format!("{}: {}", p.display(), e)))
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "pdftoppm"
    }
}

/// PNG files written by pdftoppm, in page order.
///
/// pdftoppm zero-pads page numbers to a common width, so name order is page order.
fn rendered_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| PdfError::ImageExtraction(format!("failed to list rendered pages: {}", e)))?;

    let mut pages: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect();
    pages.sort();
    Ok(pages)
}

/// Uses the scan image embedded in each page; no external tools, nothing on disk.
pub struct EmbeddedImageRasterizer;

impl PageRasterizer for EmbeddedImageRasterizer {
    fn rasterize(&self, pdf_path: &Path, last_page: Option<u32>) -> Result<Vec<DynamicImage>> {
        let data = std::fs::read(pdf_path)
            .map_err(|e| PdfError::Parse(format!("{}: {}", pdf_path.display(), e)))?;

        let pdf = ScannedPdf::from_bytes(&data)?;
        let page_count = pdf.page_count();
        let last = last_page.map_or(page_count, |l| l.min(page_count));

        (1..=last).map(|page| pdf.page_scan(page)).collect()
    }

    fn name(&self) -> &'static str {
        "embedded"
    }
}
