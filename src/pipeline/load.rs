//! Data loading: read a CSV/TSV or spreadsheet into ordered claim records.
//!
//! Every blank-equivalent cell (empty or whitespace-only text, an empty
//! spreadsheet cell, a spreadsheet error such as `#N/A`, a missing trailing
//! CSV cell) becomes [`Value::Null`], so downstream stages only ever test
//! for one null marker. No other coercion happens: CSV values stay text,
//! spreadsheet cells keep the type the workbook stored.

use crate::claim::ClaimRecord;
use crate::error::ReportError;
use calamine::{open_workbook_auto, Data, Reader};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Supported table layouts, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Delimited text with the given delimiter byte.
    Delimited(u8),
    /// Any workbook calamine can open (xlsx, xlsm, xlsb, xls, ods).
    Spreadsheet,
}

impl TableFormat {
    /// Pick the format for `path`. Unknown extensions are treated as
    /// spreadsheets and fail there if they are not.
    pub fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => TableFormat::Delimited(b','),
            Some("tsv") | Some("tab") => TableFormat::Delimited(b'\t'),
            _ => TableFormat::Spreadsheet,
        }
    }
}

/// Load every claim in `path`, in row order.
///
/// # Errors
/// - [`ReportError::NotFound`] if `path` does not exist
/// - [`ReportError::DataFormat`] if the table cannot be parsed or has no
///   data rows
pub fn load_claims(path: &Path) -> Result<Vec<ClaimRecord>, ReportError> {
    if !path.exists() {
        return Err(ReportError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let format = TableFormat::for_path(path);
    debug!("Loading {} as {:?}", path.display(), format);

    let records = match format {
        TableFormat::Delimited(delimiter) => load_delimited(path, delimiter),
        TableFormat::Spreadsheet => load_spreadsheet(path),
    }
    .map_err(|detail| ReportError::DataFormat {
        path: path.to_path_buf(),
        detail,
    })?;

    if records.is_empty() {
        return Err(ReportError::DataFormat {
            path: path.to_path_buf(),
            detail: "Input file contains no data".into(),
        });
    }

    info!("Loaded {} claims from {}", records.len(), path.display());
    Ok(records)
}

/// Parse delimited text. Rows may be shorter than the header (missing
/// cells are null) but never longer.
fn load_delimited(path: &Path, delimiter: u8) -> Result<Vec<ClaimRecord>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| e.to_string())?;

    let raw_headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let headers = normalise_headers(raw_headers);

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|e| e.to_string())?;
        if record.len() > headers.len() {
            return Err(format!(
                "row {} has {} fields, header has {}",
                row + 1,
                record.len(),
                headers.len()
            ));
        }
        let claim = headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let value = record
                    .get(i)
                    .map(|cell| text_cell(cell.to_string()))
                    .unwrap_or(Value::Null);
                (name.clone(), value)
            })
            .collect();
        records.push(claim);
    }
    Ok(records)
}

/// Parse the first worksheet of a workbook. The first non-empty row is the
/// header.
fn load_spreadsheet(path: &Path) -> Result<Vec<ClaimRecord>, String> {
    let mut workbook = open_workbook_auto(path).map_err(|e| e.to_string())?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook has no worksheets".to_string())?
        .map_err(|e| e.to_string())?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers = normalise_headers(
        header_row
            .iter()
            .map(|cell| match spreadsheet_cell(cell) {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect(),
    );

    let records = rows
        .filter(|row| !row.iter().all(|c| matches!(c, Data::Empty)))
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = row.get(i).map(spreadsheet_cell).unwrap_or(Value::Null);
                    (name.clone(), value)
                })
                .collect()
        })
        .collect();
    Ok(records)
}

/// Text cell → string value, or null when blank.
fn text_cell(text: String) -> Value {
    if text.trim().is_empty() {
        Value::Null
    } else {
        Value::String(text)
    }
}

/// Spreadsheet cell → JSON value, keeping the stored type.
pub(crate) fn spreadsheet_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => text_cell(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if ts.time() == chrono::NaiveTime::MIN => {
                Value::String(ts.format("%Y-%m-%d").to_string())
            }
            Some(ts) => Value::String(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Number::from_f64(dt.as_f64())
                .map(Value::Number)
                .unwrap_or(Value::Null),
        },
        other => text_cell(other.to_string()),
    }
}

/// Fill blank header names and disambiguate duplicates the way most
/// spreadsheet tooling does (`Unnamed: 3`, `NOTES.1`).
fn normalise_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, name)| {
            let base = if name.trim().is_empty() {
                format!("Unnamed: {i}")
            } else {
                name
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let unique = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            unique
        })
        .collect()
}
