//! Batch orchestration: discover, extract, write, report.
//!
//! Documents are processed one at a time in path order. Every per-document
//! error becomes a [`ProcessingOutcome`]; only failing to reach the
//! completion service at construction, or failing to create the output
//! directory, aborts a run.

mod discover;

pub use discover::discover;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{error, info, warn};

use crate::error::{DocexError, TextError};
use crate::extraction::{CompletionService, Extractor};
use crate::models::config::DocexConfig;
use crate::models::document::Document;
use crate::models::outcome::{DocumentOutcome, ProcessingOutcome, SkipReason, Stage};
use crate::output::{write_summary_csv, BatchReport, OutcomeEntry, OutcomeLedger, ResultWriter};
use crate::text::TextSource;

/// File name of the optional per-run CSV summary.
pub const SUMMARY_CSV: &str = "summary.csv";

/// Drives documents through text extraction, model extraction and output.
pub struct Pipeline<T: TextSource, C: CompletionService> {
    text: T,
    extractor: Extractor<C>,
    config: DocexConfig,
}

impl<T: TextSource, C: CompletionService> Pipeline<T, C> {
    /// Build a pipeline without probing the completion service.
    pub fn new(text: T, client: C, config: DocexConfig) -> Self {
        let extractor = Extractor::new(client, &config);
        Self {
            text,
            extractor,
            config,
        }
    }

    /// Validate `config`, probe the completion service and build a pipeline.
    pub async fn connect(text: T, client: C, config: DocexConfig) -> Result<Self, DocexError> {
        config.validate()?;
        probe(&client, &config).await?;
        Ok(Self::new(text, client, config))
    }

    /// Run every candidate in `input_dir` and write outputs to `output_dir`.
    pub async fn run(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<BatchReport, DocexError> {
        let documents = discover(input_dir, self.config.batch.recursive)?;
        self.run_documents(&documents, output_dir, |_| {}).await
    }

    /// Run an already discovered candidate list, calling `observer` after
    /// each document.
    pub async fn run_documents<F>(
        &self,
        documents: &[Document],
        output_dir: &Path,
        mut observer: F,
    ) -> Result<BatchReport, DocexError>
    where
        F: FnMut(&DocumentOutcome),
    {
        std::fs::create_dir_all(output_dir)?;

        let writer = ResultWriter::new(output_dir);
        let ledger = OutcomeLedger::new(output_dir.join(&self.config.batch.report_file));
        let mut report = BatchReport::new(documents.len());
        let mut base_names = HashSet::new();

        info!(
            "Found {} document(s), writing to {}",
            documents.len(),
            output_dir.display()
        );

        for doc in documents {
            let base_name = doc.base_name();
            if !base_names.insert(base_name.clone()) {
                warn!(
                    "{}: shares output name '{}' with an earlier document",
                    doc.file_name(),
                    base_name
                );
            }

            let outcome = self.process_with(doc, &writer).await;

            if let Err(e) = ledger.append(&OutcomeEntry::from_outcome(&outcome)) {
                warn!("Could not append to {}: {}", ledger.path().display(), e);
            }
            observer(&outcome);
            report.record(outcome);
        }

        if self.config.batch.summary_csv && !report.outcomes.is_empty() {
            let path = output_dir.join(SUMMARY_CSV);
            if let Err(e) = write_summary_csv(&path, &report) {
                warn!("Could not write {}: {}", path.display(), e);
            }
        }

        info!(
            "Job complete. Processed {} files ({} succeeded, {} failed, {} skipped).",
            report.processed(),
            report.succeeded,
            report.failed(),
            report.skipped
        );
        Ok(report)
    }

    /// Process one file outside of a batch.
    pub async fn process_file(
        &self,
        path: &Path,
        output_dir: &Path,
    ) -> Result<DocumentOutcome, DocexError> {
        std::fs::create_dir_all(output_dir)?;
        let writer = ResultWriter::new(output_dir);

        match Document::from_path(path) {
            Some(doc) => Ok(self.process_with(&doc, &writer).await),
            None => {
                warn!("{}: unsupported format, skipping", path.display());
                Ok(DocumentOutcome {
                    path: PathBuf::from(path),
                    outcome: ProcessingOutcome::Skipped {
                        reason: SkipReason::UnsupportedFormat,
                    },
                    elapsed_ms: 0,
                })
            }
        }
    }

    async fn process_with(&self, doc: &Document, writer: &ResultWriter) -> DocumentOutcome {
        let start = Instant::now();
        let outcome = self.process_document(doc, writer).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let name = doc.file_name();
        match &outcome {
            ProcessingOutcome::Extracted { record, .. } => info!(
                "{}: {} ({} fields, {} line items) in {}ms",
                name,
                record.document_type,
                record.metadata.len(),
                record.line_items.len(),
                elapsed_ms
            ),
            ProcessingOutcome::Skipped { reason } => info!("{}: skipped ({:?})", name, reason),
            ProcessingOutcome::Failed { stage, message } => {
                warn!("{}: {}: {}", name, stage, message)
            }
        }

        DocumentOutcome {
            path: doc.path.clone(),
            outcome,
            elapsed_ms,
        }
    }

    /// Drive one document through every stage.
    async fn process_document(&self, doc: &Document, writer: &ResultWriter) -> ProcessingOutcome {
        let base_name = doc.base_name();

        if self.config.batch.resume && writer.outputs_exist(&base_name) {
            return ProcessingOutcome::Skipped {
                reason: SkipReason::AlreadyProcessed,
            };
        }

        let text = match self.text.extract_text(&doc.path) {
            Ok(text) => text,
            Err(TextError::UnsupportedFormat(_)) => {
                return ProcessingOutcome::Skipped {
                    reason: SkipReason::UnsupportedFormat,
                };
            }
            Err(e) => return ProcessingOutcome::failed(Stage::OcrFailed, e),
        };

        let record = match self.extractor.extract(&text).await {
            Ok(record) => record,
            Err(e @ DocexError::Parse(_)) => {
                return ProcessingOutcome::failed(Stage::ParseFailed, e);
            }
            Err(e) => return ProcessingOutcome::failed(Stage::LlmFailed, e),
        };

        match writer.write(&record, &base_name) {
            Ok(outputs) => ProcessingOutcome::Extracted { record, outputs },
            Err(e) => ProcessingOutcome::failed(Stage::WriteFailed, e),
        }
    }
}

async fn probe<C: CompletionService>(client: &C, config: &DocexConfig) -> Result<(), DocexError> {
    client.health_check().await.map_err(|e| {
        error!(
            "Completion service at {} is not available: {}",
            config.completion.base_url, e
        );
        DocexError::from(e)
    })
}

/// Default pipeline: pure-onnx-ocr text extraction and an Ollama client.
#[cfg(feature = "onnx-ocr")]
pub type DefaultPipeline = Pipeline<
    crate::text::DocumentTextExtractor<crate::ocr::PureOcrEngine>,
    crate::extraction::OllamaClient,
>;

/// Validate `config`, probe the completion service, then load the OCR models.
#[cfg(feature = "onnx-ocr")]
pub async fn connect_default(config: DocexConfig) -> Result<DefaultPipeline, DocexError> {
    config.validate()?;
    let client = crate::extraction::OllamaClient::new(config.completion.clone())?;
    probe(&client, &config).await?;

    let text = crate::text::create_text_extractor(&config)?;
    Ok(Pipeline::new(text, client, config))
}
