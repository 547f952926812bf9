//! Raw spreadsheet decoding.
//!
//! Turns an uploaded byte buffer into positional rows of [`Cell`]s. Excel
//! workbooks (`.xlsx`/`.xls`) go through `calamine`; plain CSV goes through
//! the `csv` crate. Selection is by file extension, with a magic-byte sniff
//! for files named carelessly. The first row is always treated as a header
//! and skipped; column binding downstream is strictly positional.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("unreadable workbook: {0}")]
    Unreadable(String),

    #[error("workbook contains no worksheet")]
    NoSheet,

    #[error("CSV decode error at line {line}: {reason}")]
    Csv { line: usize, reason: String },
}

/// A single decoded cell. Whitespace is preserved within text tokens;
/// trimming happens at comparison time in the normalizer.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

/// One positional row. Missing trailing columns read as [`Cell::Empty`].
pub type RawRow = Vec<Cell>;

impl Cell {
    /// Trimmed text content, `None` when empty or whitespace-only.
    /// Numbers render without a fractional part when they are whole, so an
    /// article code typed as `1011` in Excel reads back as `"1011"`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t.to_string())
                }
            }
            Cell::Number(n) => {
                if (n - n.round()).abs() < f64::EPSILON {
                    Some(format!("{}", n.round() as i64))
                } else {
                    Some(format!("{n}"))
                }
            }
        }
    }

    /// Coerce to an integer, rounding fractional values.
    ///
    /// Accepts numeric cells and numeric strings. `None` for anything else;
    /// the normalizer counts such rows as discarded.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(n.round() as i64),
            Cell::Text(s) => {
                let t = s.trim();
                t.parse::<i64>()
                    .ok()
                    .or_else(|| t.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
            }
            _ => None,
        }
    }

    /// Coerce to an integer, rejecting fractional values.
    ///
    /// Pallet sizes must be whole: a K of `15.5` is operator error, not
    /// rounding noise.
    pub fn as_whole_int(&self) -> Option<i64> {
        const EPS: f64 = 1e-9;
        match self {
            Cell::Number(n) if n.is_finite() && (n - n.round()).abs() < EPS => {
                Some(n.round() as i64)
            }
            Cell::Text(s) => {
                let t = s.trim();
                t.parse::<i64>().ok().or_else(|| {
                    t.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && (f - f.round()).abs() < EPS)
                        .map(|f| f.round() as i64)
                })
            }
            _ => None,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

/// Decode an uploaded buffer into positional rows, header row skipped.
///
/// Fully-empty rows are dropped silently: Excel ranges routinely trail
/// blank rows that carry no operator intent.
pub fn decode(bytes: &[u8], file_name: &str) -> Result<Vec<RawRow>, SheetError> {
    let rows = if looks_like_excel(bytes, file_name) {
        decode_excel(bytes)?
    } else {
        decode_csv(bytes)?
    };

    Ok(rows
        .into_iter()
        .skip(1) // header
        .filter(|row| !row.iter().all(Cell::is_empty))
        .collect())
}

fn looks_like_excel(bytes: &[u8], file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    if lower.ends_with(".xlsx") || lower.ends_with(".xlsm") || lower.ends_with(".xls") {
        return true;
    }
    if lower.ends_with(".csv") {
        return false;
    }
    // Zip magic (xlsx) or OLE magic (legacy xls).
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0])
}

fn decode_excel(bytes: &[u8]) -> Result<Vec<RawRow>, SheetError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook =
        open_workbook_auto_from_rs(cursor).map_err(|e| SheetError::Unreadable(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoSheet)?
        .map_err(|e| SheetError::Unreadable(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_from_excel).collect())
        .collect())
}

fn cell_from_excel(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("{e:?}")),
    }
}

fn decode_csv(bytes: &[u8]) -> Result<Vec<RawRow>, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false) // header skipping is uniform in decode()
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| SheetError::Csv {
            line: idx + 1,
            reason: e.to_string(),
        })?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(rows)
}
