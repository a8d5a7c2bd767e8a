//! Per-document processing outcomes.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::record::ExtractionRecord;

/// Pipeline stage at which a document failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    OcrFailed,
    LlmFailed,
    ParseFailed,
    WriteFailed,
}

impl Stage {
    /// All stages, in pipeline order.
    pub const ALL: [Stage; 4] = [
        Stage::OcrFailed,
        Stage::LlmFailed,
        Stage::ParseFailed,
        Stage::WriteFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::OcrFailed => "ocr_failed",
            Stage::LlmFailed => "llm_failed",
            Stage::ParseFailed => "parse_failed",
            Stage::WriteFailed => "write_failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a document was not processed at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Extension outside the supported set.
    UnsupportedFormat,
    /// Outputs from an earlier run already exist.
    AlreadyProcessed,
}

/// Files written for a successful document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPaths {
    pub json: PathBuf,
    pub xlsx: PathBuf,
}

/// Result of driving one document through the pipeline.
#[derive(Debug, Clone)]
pub enum ProcessingOutcome {
    /// Record extracted and persisted.
    Extracted {
        record: ExtractionRecord,
        outputs: OutputPaths,
    },
    /// Document not attempted.
    Skipped { reason: SkipReason },
    /// A stage failed; no outputs were left behind.
    Failed { stage: Stage, message: String },
}

impl ProcessingOutcome {
    pub fn failed(stage: Stage, err: impl fmt::Display) -> Self {
        ProcessingOutcome::Failed {
            stage,
            message: err.to_string(),
        }
    }
}

/// Outcome plus the document it belongs to.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    /// Input file.
    pub path: PathBuf,
    /// What happened.
    pub outcome: ProcessingOutcome,
    /// Wall-clock time spent on the document.
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::OcrFailed.to_string(), "ocr_failed");
        assert_eq!(serde_json::to_string(&Stage::ParseFailed).unwrap(), "\"parse_failed\"");
        let names: Vec<&str> = Stage::ALL.iter().map(Stage::as_str).collect();
        assert_eq!(names, ["ocr_failed", "llm_failed", "parse_failed", "write_failed"]);
    }
}
