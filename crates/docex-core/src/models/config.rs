//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::DocexError;

/// Main configuration for the docex pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocexConfig {
    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Completion service configuration.
    pub completion: CompletionConfig,

    /// Prompt and classification configuration.
    pub extraction: ExtractionConfig,

    /// Batch run configuration.
    pub batch: BatchConfig,
}

/// How PDF pages are turned into images for OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterizerKind {
    /// Render pages with poppler's `pdftoppm`.
    Pdftoppm,
    /// Decode the scan image embedded in each page.
    Embedded,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Page rasterization backend.
    pub rasterizer: RasterizerKind,

    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// Only OCR the first page.
    pub first_page_only: bool,

    /// Maximum pages to process when `first_page_only` is off (0 = unlimited).
    pub max_pages: u32,

    /// Use the embedded text layer when present instead of OCR.
    pub prefer_embedded_text: bool,

    /// Minimum text length to consider the text layer usable.
    pub min_text_length: usize,

    /// Separator placed between the text of consecutive pages.
    pub page_separator: String,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            rasterizer: RasterizerKind::Pdftoppm,
            render_dpi: 200,
            first_page_only: true,
            max_pages: 10,
            prefer_embedded_text: false,
            min_text_length: 50,
            page_separator: "\n\n".to_string(),
        }
    }
}

impl PdfConfig {
    /// Last page (1-indexed, inclusive) to rasterize, `None` for all pages.
    pub fn last_page(&self) -> Option<u32> {
        if self.first_page_only {
            Some(1)
        } else if self.max_pages > 0 {
            Some(self.max_pages)
        } else {
            None
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` tokens in recognized text instead of replacing them with spaces.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(model_name)
    }
}

/// Completion service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL of the Ollama-compatible server.
    pub base_url: String,

    /// Model name passed to the server.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Context window size requested from the server.
    pub num_ctx: u32,

    /// Overall request timeout in seconds.
    pub timeout_secs: u64,

    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Extra attempts after a transient failure.
    pub max_retries: u32,

    /// First retry delay in milliseconds.
    pub initial_backoff_ms: u64,

    /// Upper bound for a single retry delay in milliseconds.
    pub max_backoff_ms: u64,

    /// Ask the server to constrain output to JSON.
    pub json_mode: bool,

    /// Replaces the built-in system instruction when set.
    pub system_prompt: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:1b".to_string(),
            temperature: 0.0,
            num_ctx: 2048,
            timeout_secs: 120,
            connect_timeout_secs: 10,
            max_retries: 2,
            initial_backoff_ms: 750,
            max_backoff_ms: 5000,
            json_mode: false,
            system_prompt: None,
        }
    }
}

/// Where the document type comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    /// The model classifies while extracting, using the combined schema.
    Model,
    /// Local keyword heuristics pick a type-specific schema first.
    Keywords,
}

/// What to do when the model answers `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Persist the single best-effort attempt.
    Single,
    /// Retry under each type-specific schema and keep the best-scoring record.
    BestOfSchemas,
}

/// Prompt and classification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Characters of OCR text kept in the prompt.
    pub max_prompt_chars: usize,

    /// Classification source.
    pub classification: ClassificationMode,

    /// Handling of `Unknown` classifications.
    pub unknown_policy: UnknownPolicy,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: 2500,
            classification: ClassificationMode::Model,
            unknown_policy: UnknownPolicy::Single,
        }
    }
}

/// Batch run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Descend into subdirectories of the input directory.
    pub recursive: bool,

    /// Skip documents whose outputs already exist.
    pub resume: bool,

    /// Name of the append-only outcome ledger inside the output directory.
    pub report_file: String,

    /// Also write `summary.csv` at the end of the run.
    pub summary_csv: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            resume: false,
            report_file: "report.jsonl".to_string(),
            summary_csv: true,
        }
    }
}

impl DocexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check required fields and value ranges.
    pub fn validate(&self) -> Result<(), DocexError> {
        if self.completion.model.trim().is_empty() {
            return Err(DocexError::Config("completion.model must not be empty".into()));
        }
        let url = reqwest::Url::parse(&self.completion.base_url).map_err(|e| {
            DocexError::Config(format!(
                "completion.base_url '{}' is not a valid URL: {}",
                self.completion.base_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DocexError::Config(format!(
                "completion.base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.completion.timeout_secs == 0 {
            return Err(DocexError::Config("completion.timeout_secs must be positive".into()));
        }
        if self.completion.max_retries > 10 {
            return Err(DocexError::Config("completion.max_retries must be at most 10".into()));
        }
        if self.extraction.max_prompt_chars == 0 {
            return Err(DocexError::Config(
                "extraction.max_prompt_chars must be positive".into(),
            ));
        }
        if self.batch.report_file.trim().is_empty() {
            return Err(DocexError::Config("batch.report_file must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(DocexConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = DocexConfig::default();
        config.completion.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(DocexError::Config(_))));

        config.completion.base_url = "ftp://localhost".to_string();
        assert!(matches!(config.validate(), Err(DocexError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let mut config = DocexConfig::default();
        config.completion.model = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DocexConfig =
            serde_json::from_str(r#"{"completion": {"model": "qwen2.5:3b"}}"#).unwrap();
        assert_eq!(config.completion.model, "qwen2.5:3b");
        assert_eq!(config.completion.base_url, "http://localhost:11434");
        assert_eq!(config.extraction.max_prompt_chars, 2500);
        assert_eq!(config.pdf.rasterizer, RasterizerKind::Pdftoppm);
    }

    #[test]
    fn test_last_page() {
        let mut pdf = PdfConfig::default();
        assert_eq!(pdf.last_page(), Some(1));
        pdf.first_page_only = false;
        assert_eq!(pdf.last_page(), Some(10));
        pdf.max_pages = 0;
        assert_eq!(pdf.last_page(), None);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = DocexConfig::default();
        config.extraction.unknown_policy = UnknownPolicy::BestOfSchemas;
        config.save(&path).unwrap();

        let loaded = DocexConfig::from_file(&path).unwrap();
        assert_eq!(loaded.extraction.unknown_policy, UnknownPolicy::BestOfSchemas);
    }
}
