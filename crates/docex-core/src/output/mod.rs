//! Output persistence: per-document JSON/XLSX files and batch reporting.

mod report;
mod writer;

pub use report::{write_summary_csv, BatchReport, EntryStatus, OutcomeEntry, OutcomeLedger};
pub use writer::{ResultWriter, DOCUMENT_TYPE_COLUMN, LINE_ITEMS_SHEET, SUMMARY_SHEET};
