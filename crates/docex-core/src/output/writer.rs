//! JSON and XLSX persistence for extraction records.

use std::io::Write;
use std::path::{Path, PathBuf};

use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::WriteError;
use crate::extraction::truncate_chars;
use crate::models::outcome::OutputPaths;
use crate::models::record::{ExtractionRecord, LineItem, Scalar};

/// Name of the header sheet.
pub const SUMMARY_SHEET: &str = "Summary";
/// Name of the line item sheet.
pub const LINE_ITEMS_SHEET: &str = "Line Items";
/// First column of the summary sheet.
pub const DOCUMENT_TYPE_COLUMN: &str = "Document Type";
/// Longest text Excel accepts in one cell.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Writes `name.json` and `name.xlsx` into an output directory.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Target paths for a document base name.
    pub fn paths_for(&self, base_name: &str) -> OutputPaths {
        OutputPaths {
            json: self.output_dir.join(format!("{}.json", base_name)),
            xlsx: self.output_dir.join(format!("{}.xlsx", base_name)),
        }
    }

    /// Whether both outputs for `base_name` already exist.
    pub fn outputs_exist(&self, base_name: &str) -> bool {
        let paths = self.paths_for(base_name);
        paths.json.is_file() && paths.xlsx.is_file()
    }

    /// Persist `record` as JSON and XLSX.
    ///
    /// Both files are serialized in memory first and each lands via a
    /// rename, so a failure never leaves a truncated target. If the second
    /// rename fails the first file is removed again.
    pub fn write(
        &self,
        record: &ExtractionRecord,
        base_name: &str,
    ) -> Result<OutputPaths, WriteError> {
        let paths = self.paths_for(base_name);

        let json = record.to_pretty_json()?;
        let xlsx = build_workbook(record)?;

        write_atomic(&paths.json, &json)?;
        if let Err(e) = write_atomic(&paths.xlsx, &xlsx) {
            if let Err(rm) = std::fs::remove_file(&paths.json) {
                warn!("Could not remove {}: {}", paths.json.display(), rm);
            }
            return Err(e);
        }

        debug!(
            "Wrote {} and {}",
            paths.json.display(),
            paths.xlsx.display()
        );
        Ok(paths)
    }
}

/// Write `bytes` to a temp file beside `path` and rename it into place.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let io_err = |source: std::io::Error| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Build the two-sheet workbook in memory.
fn build_workbook(record: &ExtractionRecord) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let summary = workbook.add_worksheet();
    summary.set_name(SUMMARY_SHEET)?;
    summary.write_string_with_format(0, 0, DOCUMENT_TYPE_COLUMN, &header)?;
    summary.write_string(1, 0, record.document_type.as_str())?;
    for (i, (key, value)) in record.metadata.iter().enumerate() {
        let col = column(i + 1)?;
        summary.write_string_with_format(0, col, key, &header)?;
        write_metadata_value(summary, 1, col, value)?;
    }

    let items = workbook.add_worksheet();
    items.set_name(LINE_ITEMS_SHEET)?;
    for (col, name) in LineItem::COLUMNS.iter().enumerate() {
        items.write_string_with_format(0, column(col)?, *name, &header)?;
    }
    for (i, item) in record.line_items.iter().enumerate() {
        let row = i as u32 + 1;
        write_text(items, row, 0, &item.description)?;
        for (offset, value) in item.values().into_iter().enumerate() {
            if let Some(value) = value {
                write_scalar(items, row, column(offset + 1)?, value)?;
            }
        }
    }

    workbook.save_to_buffer()
}

fn column(index: usize) -> Result<u16, XlsxError> {
    u16::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)
}

fn write_metadata_value(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
) -> Result<(), XlsxError> {
    match value {
        Value::Null => {}
        Value::String(s) => {
            write_text(sheet, row, col, s)?;
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) => {
                sheet.write_number(row, col, f)?;
            }
            None => {
                sheet.write_string(row, col, n.to_string())?;
            }
        },
        Value::Bool(b) => {
            sheet.write_string(row, col, b.to_string())?;
        }
        nested => {
            write_text(sheet, row, col, &nested.to_string())?;
        }
    }
    Ok(())
}

/// Text cells are cut at Excel's limit; the JSON output keeps the full value.
fn write_text(sheet: &mut Worksheet, row: u32, col: u16, text: &str) -> Result<(), XlsxError> {
    let cell = truncate_chars(text, MAX_CELL_CHARS);
    if cell.len() < text.len() {
        warn!(
            "Cell ({}, {}) cut to {} characters in {}",
            row, col, MAX_CELL_CHARS, sheet.name()
        );
    }
    sheet.write_string(row, col, cell)?;
    Ok(())
}

fn write_scalar(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Scalar,
) -> Result<(), XlsxError> {
    match value.as_decimal().and_then(|d| d.to_f64()) {
        Some(number) => {
            sheet.write_number(row, col, number)?;
        }
        None => {
            write_text(sheet, row, col, &value.to_string())?;
        }
    }
    Ok(())
}
