//! Batch report, outcome ledger and summary CSV.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WriteError;
use crate::models::outcome::{DocumentOutcome, ProcessingOutcome, SkipReason, Stage};
use crate::models::record::DocumentType;

/// Aggregate result of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Supported, non-hidden files found in the input directory.
    pub candidates: usize,
    /// Documents extracted and written.
    pub succeeded: usize,
    /// Documents not attempted.
    pub skipped: usize,
    /// Failure count per stage.
    pub failures_by_stage: BTreeMap<Stage, usize>,
    /// Per-document outcomes in processing order.
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchReport {
    pub fn new(candidates: usize) -> Self {
        Self {
            candidates,
            ..Default::default()
        }
    }

    /// Fold one outcome into the counters.
    pub fn record(&mut self, outcome: DocumentOutcome) {
        match &outcome.outcome {
            ProcessingOutcome::Extracted { .. } => self.succeeded += 1,
            ProcessingOutcome::Skipped { .. } => self.skipped += 1,
            ProcessingOutcome::Failed { stage, .. } => {
                *self.failures_by_stage.entry(*stage).or_insert(0) += 1;
            }
        }
        self.outcomes.push(outcome);
    }

    /// Total failed documents across stages.
    pub fn failed(&self) -> usize {
        self.failures_by_stage.values().sum()
    }

    /// Failures at one stage.
    pub fn failures(&self, stage: Stage) -> usize {
        self.failures_by_stage.get(&stage).copied().unwrap_or(0)
    }

    /// Documents that went through the pipeline (succeeded or failed).
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed()
    }

    /// Failed outcomes, for listing.
    pub fn failures_iter(&self) -> impl Iterator<Item = (&Path, Stage, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            ProcessingOutcome::Failed { stage, message } => {
                Some((o.path.as_path(), *stage, message.as_str()))
            }
            _ => None,
        })
    }
}

/// Status column of the ledger and summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Success,
    Skipped,
    Failed,
}

/// One line of the checkpoint ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub file: String,
    pub status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub line_items: usize,
    pub elapsed_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl OutcomeEntry {
    pub fn from_outcome(outcome: &DocumentOutcome) -> Self {
        let file = outcome
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| outcome.path.display().to_string());

        let mut entry = Self {
            file,
            status: EntryStatus::Success,
            document_type: None,
            stage: None,
            skip_reason: None,
            message: None,
            line_items: 0,
            elapsed_ms: outcome.elapsed_ms,
            timestamp: Utc::now(),
        };

        match &outcome.outcome {
            ProcessingOutcome::Extracted { record, .. } => {
                entry.document_type = Some(record.document_type);
                entry.line_items = record.line_items.len();
            }
            ProcessingOutcome::Skipped { reason } => {
                entry.status = EntryStatus::Skipped;
                entry.skip_reason = Some(reason.clone());
            }
            ProcessingOutcome::Failed { stage, message } => {
                entry.status = EntryStatus::Failed;
                entry.stage = Some(*stage);
                entry.message = Some(message.clone());
            }
        }
        entry
    }
}

/// Append-only JSON Lines ledger of document outcomes.
#[derive(Debug, Clone)]
pub struct OutcomeLedger {
    path: PathBuf,
}

impl OutcomeLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single line.
    pub fn append(&self, entry: &OutcomeEntry) -> Result<(), WriteError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let io_err = |source: std::io::Error| WriteError::Io {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        file.write_all(&line).map_err(io_err)?;
        file.flush().map_err(io_err)?;
        Ok(())
    }

    /// Read every well-formed entry; malformed lines are ignored.
    pub fn read_entries(&self) -> Result<Vec<OutcomeEntry>, WriteError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(WriteError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect())
    }
}

/// Write `summary.csv` with one row per document outcome.
pub fn write_summary_csv(path: &Path, report: &BatchReport) -> Result<(), WriteError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    wtr.write_record([
        "filename",
        "status",
        "document_type",
        "metadata_fields",
        "line_items",
        "stage",
        "processing_time_ms",
        "error",
    ])?;

    for outcome in &report.outcomes {
        let entry = OutcomeEntry::from_outcome(outcome);
        let fields = match &outcome.outcome {
            ProcessingOutcome::Extracted { record, .. } => record.metadata.len().to_string(),
            _ => String::new(),
        };
        let status = match entry.status {
            EntryStatus::Success => "success",
            EntryStatus::Skipped => "skipped",
            EntryStatus::Failed => "error",
        };

        wtr.write_record([
            entry.file.as_str(),
            status,
            entry.document_type.map(|t| t.as_str()).unwrap_or(""),
            &fields,
            &entry.line_items.to_string(),
            entry.stage.map(|s| s.as_str()).unwrap_or(""),
            &entry.elapsed_ms.to_string(),
            entry.message.as_deref().unwrap_or(""),
        ])?;
    }

    let data = wtr.into_inner().map_err(|e| WriteError::Io {
        path: path.to_path_buf(),
        source: e.into_error(),
    })?;
    super::writer::write_atomic(path, &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::outcome::OutputPaths;
    use crate::models::record::ExtractionRecord;
    use pretty_assertions::assert_eq;

    fn extracted(name: &str) -> DocumentOutcome {
        DocumentOutcome {
            path: PathBuf::from(format!("samples/{}", name)),
            outcome: ProcessingOutcome::Extracted {
                record: ExtractionRecord {
                    document_type: DocumentType::Invoice,
                    ..Default::default()
                },
                outputs: OutputPaths {
                    json: PathBuf::from("out/a.json"),
                    xlsx: PathBuf::from("out/a.xlsx"),
                },
            },
            elapsed_ms: 12,
        }
    }

    fn failed(name: &str, stage: Stage) -> DocumentOutcome {
        DocumentOutcome {
            path: PathBuf::from(name),
            outcome: ProcessingOutcome::failed(stage, "boom"),
            elapsed_ms: 3,
        }
    }

    #[test]
    fn test_report_counters() {
        let mut report = BatchReport::new(4);
        report.record(extracted("a.png"));
        report.record(failed("b.pdf", Stage::OcrFailed));
        report.record(failed("c.pdf", Stage::ParseFailed));
        report.record(DocumentOutcome {
            path: PathBuf::from("d.png"),
            outcome: ProcessingOutcome::Skipped {
                reason: SkipReason::AlreadyProcessed,
            },
            elapsed_ms: 0,
        });

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.processed(), 3);
        assert_eq!(report.failures(Stage::OcrFailed), 1);
        assert_eq!(report.failures(Stage::LlmFailed), 0);
        assert_eq!(report.failures_iter().count(), 2);
    }

    #[test]
    fn test_entry_from_outcomes() {
        let ok = OutcomeEntry::from_outcome(&extracted("a.png"));
        assert_eq!(ok.file, "a.png");
        assert_eq!(ok.status, EntryStatus::Success);
        assert_eq!(ok.document_type, Some(DocumentType::Invoice));

        let bad = OutcomeEntry::from_outcome(&failed("b.pdf", Stage::LlmFailed));
        assert_eq!(bad.status, EntryStatus::Failed);
        assert_eq!(bad.stage, Some(Stage::LlmFailed));
        assert_eq!(bad.message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_ledger_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = OutcomeLedger::new(dir.path().join("report.jsonl"));
        assert!(ledger.read_entries().unwrap().is_empty());

        ledger.append(&OutcomeEntry::from_outcome(&extracted("a.png"))).unwrap();
        ledger
            .append(&OutcomeEntry::from_outcome(&failed("b.pdf", Stage::WriteFailed)))
            .unwrap();

        let content = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().nth(1).unwrap().contains("\"stage\":\"write_failed\""));

        let entries = ledger.read_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].stage, Some(Stage::WriteFailed));
    }

    #[test]
    fn test_summary_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let mut report = BatchReport::new(2);
        report.record(extracted("a.png"));
        report.record(failed("b.pdf", Stage::OcrFailed));

        write_summary_csv(&path, &report).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("filename,status,document_type"));
        assert!(lines[1].starts_with("a.png,success,Invoice,0,0,,12,"));
        assert!(lines[2].starts_with("b.pdf,error,,,0,ocr_failed,3,boom"));
    }
}
