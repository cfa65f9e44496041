//! File decoder: uploaded bytes → [`RawGrid`].
//!
//! CSV/TXT files are read as comma-separated UTF-8 text. Excel workbooks
//! (.xlsx/.xls) are flattened sheet by sheet into a single grid with one
//! empty separator row between sheets.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use thiserror::Error;

use crate::models::{Cell, RawGrid};

/// Decoder errors.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unsupported file format{}. Please upload CSV, TXT, or Excel files.", extension_hint(.0))]
    UnsupportedFormat(String),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read Excel workbook: {0}")]
    Workbook(#[from] calamine::Error),
}

fn extension_hint(extension: &str) -> String {
    if extension.is_empty() {
        String::new()
    } else {
        format!(" (.{})", extension)
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Format chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// .csv and .txt
    Delimited,
    /// .xlsx and .xls
    Workbook,
}

impl FileFormat {
    /// Pick a format from the filename's extension (case-insensitive).
    pub fn from_filename(filename: &str) -> DecodeResult<Self> {
        let extension = file_extension(filename);
        match extension.as_str() {
            "csv" | "txt" => Ok(FileFormat::Delimited),
            "xlsx" | "xls" => Ok(FileFormat::Workbook),
            _ => Err(DecodeError::UnsupportedFormat(extension)),
        }
    }
}

/// Lowercased text after the last '.', or empty if there is none.
pub fn file_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

/// Decode a whole file. Either every row decodes or the call fails.
pub fn decode(bytes: &[u8], filename: &str) -> DecodeResult<RawGrid> {
    match FileFormat::from_filename(filename)? {
        FileFormat::Delimited => decode_delimited(bytes),
        FileFormat::Workbook => decode_workbook(bytes),
    }
}

/// Decode comma-separated text. Blank lines are skipped; rows may be ragged.
pub fn decode_delimited(bytes: &[u8]) -> DecodeResult<RawGrid> {
    let decoded = String::from_utf8_lossy(bytes);
    let text = decoded
        .strip_prefix('\u{feff}')
        .unwrap_or(decoded.as_ref());

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut grid = RawGrid::new();
    for result in reader.records() {
        let record = result?;
        grid.push_row(record.iter().map(Cell::text).collect());
    }
    Ok(grid)
}

/// Decode every sheet of an Excel workbook into one grid.
pub fn decode_workbook(bytes: &[u8]) -> DecodeResult<RawGrid> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let sheet_names = workbook.sheet_names().to_vec();

    let mut grid = RawGrid::new();
    for name in &sheet_names {
        let range = workbook.worksheet_range(name)?;
        let rows = range_to_rows(&range);
        tracing::debug!(sheet = %name, rows = rows.len(), "decoded worksheet");

        if !grid.is_empty() {
            grid.push_row(Vec::new());
        }
        for row in rows {
            grid.push_row(row);
        }
    }
    Ok(grid)
}

/// Convert a sheet range to rows anchored at A1.
///
/// calamine trims leading empty rows and columns from a range; they are padded
/// back so column indices match what the user sees.
fn range_to_rows(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };

    let mut rows: Vec<Vec<Cell>> = (0..start_row).map(|_| Vec::new()).collect();
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(data_to_cell));
        rows.push(cells);
    }
    rows
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.as_str()),
    }
}
