//! Raw grid models produced by the file decoder.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// A single untyped spreadsheet/CSV cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum Cell {
    /// Missing or blank cell
    #[default]
    Empty,
    /// Text as it appeared in the source
    Text(String),
    /// Numeric cell (spreadsheets only; CSV fields are always text)
    Number(f64),
}

impl Cell {
    /// Build a text cell, mapping the empty string to [`Cell::Empty`].
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    /// Render the cell as the string a user would see in the sheet.
    ///
    /// Whole numbers render without a fractional part (`100`, not `100.0`).
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
            Cell::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    Cow::Owned(format!("{}", *n as i64))
                } else {
                    Cow::Owned(n.to_string())
                }
            }
        }
    }

    /// Trimmed text form of the cell.
    pub fn trimmed(&self) -> String {
        self.as_text().trim().to_string()
    }

    /// True for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// Two-dimensional grid of raw cells, one per decoded upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap already-decoded rows.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Append a row.
    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_constructor_maps_empty() {
        assert_eq!(Cell::text(""), Cell::Empty);
        assert_eq!(Cell::text("abc"), Cell::Text("abc".into()));
    }

    #[test]
    fn test_number_rendering() {
        assert_eq!(Cell::Number(100.0).as_text(), "100");
        assert_eq!(Cell::Number(12.5).as_text(), "12.5");
        assert_eq!(Cell::Number(-3.0).as_text(), "-3");
    }

    #[test]
    fn test_blank_detection() {
        assert!(Cell::Empty.is_blank());
        assert!(Cell::Text("   ".into()).is_blank());
        assert!(!Cell::Text(" x ".into()).is_blank());
        assert!(!Cell::Number(0.0).is_blank());
    }

    #[test]
    fn test_grid_rows() {
        let mut grid = RawGrid::new();
        assert!(grid.is_empty());
        grid.push_row(vec![Cell::from("a"), Cell::from(1.0)]);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.rows()[0][1], Cell::Number(1.0));
    }
}
