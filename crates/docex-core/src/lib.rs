//! Core library for extracting structured data from scanned business documents.
//!
//! This crate provides:
//! - Text extraction from images and PDFs (page rasterization + OCR)
//! - Prompt construction and an Ollama-compatible completion client
//! - Tolerant parsing of model responses into extraction records
//! - JSON and XLSX output with a per-run outcome ledger
//! - A sequential batch pipeline that never aborts on a single document

pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod output;
pub mod pdf;
pub mod pipeline;
pub mod text;

pub use error::{DocexError, Result};
pub use extraction::{CompletionService, Extractor, OllamaClient, Prompt, PromptBuilder};
pub use models::config::DocexConfig;
pub use models::outcome::{DocumentOutcome, ProcessingOutcome, Stage};
pub use models::record::{DocumentType, ExtractionRecord, LineItem, Scalar};
pub use ocr::{OcrBackend, OcrResult, TextBox};
#[cfg(feature = "onnx-ocr")]
pub use ocr::PureOcrEngine;
pub use output::{BatchReport, ResultWriter};
pub use pipeline::{discover, Pipeline};
#[cfg(feature = "onnx-ocr")]
pub use pipeline::{connect_default, DefaultPipeline};
pub use text::{DocumentTextExtractor, TextSource};
