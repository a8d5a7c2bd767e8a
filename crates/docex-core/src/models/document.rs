//! Input documents and their formats.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Extensions accepted as batch candidates (lowercase, without the dot).
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tiff", "pdf"];

/// File format of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Png,
    Jpeg,
    Tiff,
}

impl DocumentFormat {
    /// Detect the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "png" => Some(DocumentFormat::Png),
            "jpg" | "jpeg" => Some(DocumentFormat::Jpeg),
            "tiff" => Some(DocumentFormat::Tiff),
            _ => None,
        }
    }

    /// Whether OCR runs on the file directly.
    pub fn is_image(&self) -> bool {
        !matches!(self, DocumentFormat::Pdf)
    }
}

/// A candidate input file.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path to the file.
    pub path: PathBuf,
    /// Detected format.
    pub format: DocumentFormat,
}

impl Document {
    /// Build a document if the path has a supported extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let format = DocumentFormat::from_path(&path)?;
        Some(Self { path, format })
    }

    /// File name for log lines and reports.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// File stem used to name output files.
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }
}

/// Whether a path names a hidden file (leading `.`).
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.PDF")), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_path(Path::new("a.jpeg")), Some(DocumentFormat::Jpeg));
        assert_eq!(DocumentFormat::from_path(Path::new("a.JPG")), Some(DocumentFormat::Jpeg));
        assert_eq!(DocumentFormat::from_path(Path::new("a.tiff")), Some(DocumentFormat::Tiff));
        assert_eq!(DocumentFormat::from_path(Path::new("a.docx")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_names() {
        let doc = Document::from_path("/in/scan_01.png").unwrap();
        assert_eq!(doc.file_name(), "scan_01.png");
        assert_eq!(doc.base_name(), "scan_01");
        assert!(doc.format.is_image());
    }

    #[test]
    fn test_hidden() {
        assert!(is_hidden(Path::new("/in/.DS_Store")));
        assert!(is_hidden(Path::new(".scan.png")));
        assert!(!is_hidden(Path::new("/in/scan.png")));
    }
}
