//! Row classification and field extraction for monthly stock reports.
//!
//! Expected data-row layout (0-based columns):
//!
//! ```text
//! 0: item no. | 1: medicine name | 2: unit | 3: beginning | 4: delivery | 5: dispensed | 6: ending
//! ```
//!
//! Anything else in the grid (titles, health-center banner, month label,
//! column headers, totals) is skipped.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::dates::{is_month_label, parse_month_label_with_pivot};
use super::normalizer::LabelNormalizer;
use crate::config::{ImportConfig, Vocabulary};
use crate::models::{Cell, ExtractionContext, MedicineRecord, RawGrid, UNKNOWN_HEALTH_CENTER};

/// Minimum cells for a row to hold a medicine line.
const MIN_DATA_ROW_CELLS: usize = 6;

/// Minimum characters in the medicine-name column.
const MIN_NAME_CHARS: usize = 3;

const NAME_COL: usize = 1;
const UNIT_COL: usize = 2;
const QUANTITY_COLS: std::ops::Range<usize> = 3..7;

static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+").expect("static pattern"));

static LEADING_FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").expect("static pattern")
});

/// Records extracted from one grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub context: ExtractionContext,
    /// Deduplicated records in document order
    pub records: Vec<MedicineRecord>,
    /// Data rows dropped as empty or duplicate
    pub skipped_rows: usize,
}

/// Classifier for raw report rows.
#[derive(Debug, Clone)]
pub struct RowClassifier {
    vocabulary: Vocabulary,
    scan_rows: usize,
    year_pivot: u32,
}

impl Default for RowClassifier {
    fn default() -> Self {
        Self::new(&ImportConfig::default())
    }
}

impl RowClassifier {
    /// Create a classifier from import settings.
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            vocabulary: config.vocabulary.clone(),
            scan_rows: config.health_center_scan_rows,
            year_pivot: config.year_pivot,
        }
    }

    /// Find the health-center label in the top rows. Last match wins.
    pub fn detect_health_center(&self, grid: &RawGrid) -> String {
        let mut health_center = UNKNOWN_HEALTH_CENTER.to_string();

        for cell in self.header_cells(grid) {
            let upper = cell.to_uppercase();
            if self
                .vocabulary
                .health_center_markers
                .iter()
                .any(|marker| upper.contains(marker.as_str()))
            {
                health_center = cell;
            }
        }

        health_center
    }

    /// Find a month label in the top rows, normalized to "YYYY-MM".
    pub fn detect_period(&self, grid: &RawGrid) -> Option<String> {
        self.header_cells(grid)
            .filter(|cell| is_month_label(cell))
            .last()
            .map(|label| parse_month_label_with_pivot(&label, self.year_pivot))
    }

    fn header_cells<'g>(&self, grid: &'g RawGrid) -> impl Iterator<Item = String> + 'g {
        grid.rows()
            .iter()
            .take(self.scan_rows)
            .flatten()
            .filter(|cell| !cell.is_blank())
            .map(Cell::trimmed)
    }

    /// True if the row looks like a medicine line item.
    pub fn is_data_row(&self, row: &[Cell]) -> bool {
        if row.len() < MIN_DATA_ROW_CELLS {
            return false;
        }

        let name = cell_text(row, NAME_COL);
        if name.chars().count() < MIN_NAME_CHARS {
            return false;
        }

        let lowered = name.to_lowercase();
        if self
            .vocabulary
            .header_keywords
            .iter()
            .any(|keyword| lowered.contains(keyword.as_str()))
        {
            return false;
        }

        if is_month_label(&name) {
            return false;
        }

        let unit = cell_text(row, UNIT_COL).to_lowercase();
        let has_valid_unit = self.vocabulary.row_units.iter().any(|u| *u == unit);

        let has_numbers = row
            .iter()
            .skip(QUANTITY_COLS.start)
            .take(QUANTITY_COLS.len())
            .any(|cell| {
                let value = cell.trimmed().replace(',', "");
                LEADING_DIGITS.is_match(&value)
            });

        has_valid_unit || has_numbers
    }

    /// Classify every row and build deduplicated records for `month_year`.
    pub fn extract(
        &self,
        grid: &RawGrid,
        month_year: &str,
        normalizer: &LabelNormalizer,
    ) -> Extraction {
        let health_center = self.detect_health_center(grid);
        let detected_period = self.detect_period(grid);

        if let Some(period) = detected_period.as_deref() {
            if period != month_year {
                tracing::warn!(
                    detected = period,
                    selected = month_year,
                    "month label in file differs from selected period; using selected period"
                );
            }
        }

        let mut records = Vec::new();
        let mut seen = HashSet::new();
        let mut skipped_rows = 0;

        for (index, row) in grid.rows().iter().enumerate() {
            if !self.is_data_row(row) {
                continue;
            }

            let name = cell_text(row, NAME_COL);
            let unit = cell_text(row, UNIT_COL).to_lowercase();
            let quantities: Vec<u64> = QUANTITY_COLS.map(|col| parse_number(row.get(col))).collect();

            let label = normalizer.normalize(&name);
            let mut record = MedicineRecord::new(
                name,
                label.base_name,
                label.dosage,
                if unit.is_empty() { "unit".to_string() } else { unit },
                month_year.to_string(),
                health_center.clone(),
            );
            record.beginning_balance = quantities[0];
            record.delivery = quantities[1];
            record.dispensed = quantities[2];
            record.ending_balance = quantities[3];

            if record.has_no_movement() {
                tracing::debug!(row = index, name = %record.medicine_name, "skipping row without stock movement");
                skipped_rows += 1;
                continue;
            }

            if !seen.insert(record.dedup_key()) {
                tracing::debug!(row = index, name = %record.medicine_name, "skipping duplicate medicine");
                skipped_rows += 1;
                continue;
            }

            records.push(record);
        }

        Extraction {
            context: ExtractionContext {
                health_center,
                month_year: month_year.to_string(),
                detected_period,
            },
            records,
            skipped_rows,
        }
    }
}

fn cell_text(row: &[Cell], index: usize) -> String {
    row.get(index).map(Cell::trimmed).unwrap_or_default()
}

/// Parse a quantity cell, or `None` when it holds no number.
///
/// Thousands separators and quote characters are ignored, the leading
/// numeric prefix is floored, and negatives clamp to zero.
pub fn parse_quantity(cell: Option<&Cell>) -> Option<u64> {
    let value = match cell? {
        Cell::Empty => return None,
        Cell::Number(n) => *n,
        Cell::Text(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',' && *c != '"').collect();
            let prefix = LEADING_FLOAT.find(&cleaned)?;
            prefix.as_str().parse::<f64>().ok()?
        }
    };

    if value.is_nan() {
        return None;
    }
    Some(value.floor().max(0.0) as u64)
}

/// Parse a quantity cell, treating anything unparseable as zero.
pub fn parse_number(cell: Option<&Cell>) -> u64 {
    parse_quantity(cell).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|c| Cell::text(*c)).collect()
    }

    fn text(s: &str) -> Cell {
        Cell::text(s)
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(None), 0);
        assert_eq!(parse_number(Some(&Cell::Empty)), 0);
        assert_eq!(parse_number(Some(&text(""))), 0);
        assert_eq!(parse_number(Some(&text("1,234"))), 1234);
        assert_eq!(parse_number(Some(&text("-5"))), 0);
        assert_eq!(parse_number(Some(&text("12.9"))), 12);
        assert_eq!(parse_number(Some(&text("\"2,500\""))), 2500);
        assert_eq!(parse_number(Some(&text("  40 boxes"))), 40);
        assert_eq!(parse_number(Some(&text("n/a"))), 0);
        assert_eq!(parse_number(Some(&Cell::Number(7.8))), 7);
        assert_eq!(parse_number(Some(&Cell::Number(-1.0))), 0);
        assert_eq!(parse_number(Some(&Cell::Number(f64::NAN))), 0);
    }

    #[test]
    fn test_parse_quantity_distinguishes_missing_from_zero() {
        assert_eq!(parse_quantity(Some(&text("0"))), Some(0));
        assert_eq!(parse_quantity(Some(&text("none"))), None);
        assert_eq!(parse_quantity(Some(&Cell::Empty)), None);
        assert_eq!(parse_quantity(None), None);
    }

    #[test]
    fn test_data_row_accepts_medicine_line() {
        let classifier = RowClassifier::default();
        let r = row(&["1", "Paracetamol 500mg Tablet", "tablet", "100", "50", "30", "120"]);
        assert!(classifier.is_data_row(&r));
    }

    #[test]
    fn test_data_row_accepts_unit_without_numbers() {
        let classifier = RowClassifier::default();
        let r = row(&["", "Cetirizine 10mg", "Tablet", "", "", ""]);
        assert!(classifier.is_data_row(&r));
    }

    #[test]
    fn test_data_row_rejects_short_rows() {
        let classifier = RowClassifier::default();
        let r = row(&["1", "Paracetamol", "tablet", "100", "50"]);
        assert!(!classifier.is_data_row(&r));
    }

    #[test]
    fn test_data_row_rejects_header_keywords() {
        let classifier = RowClassifier::default();
        let header = row(&["Health Center", "Medicine", "Unit", "Beg", "Del", "Disp", "End"]);
        assert!(!classifier.is_data_row(&header));

        let header = row(&["No.", "Name of Drug", "Unit", "1", "2", "3", "4"]);
        assert!(!classifier.is_data_row(&header));
    }

    #[test]
    fn test_data_row_rejects_month_label() {
        let classifier = RowClassifier::default();
        let r = row(&["", "August-25", "", "1", "", "", ""]);
        assert!(!classifier.is_data_row(&r));
    }

    #[test]
    fn test_data_row_rejects_short_name() {
        let classifier = RowClassifier::default();
        let r = row(&["1", "OR", "tablet", "1", "1", "1", "1"]);
        assert!(!classifier.is_data_row(&r));
    }

    #[test]
    fn test_data_row_requires_unit_or_numbers() {
        let classifier = RowClassifier::default();
        let r = row(&["", "Prepared by", "Nurse", "", "", "signature", ""]);
        assert!(!classifier.is_data_row(&r));
    }

    #[test]
    fn test_detect_health_center() {
        let classifier = RowClassifier::default();
        let grid = RawGrid::from_rows(vec![
            row(&["Republic of the Philippines"]),
            row(&["", "San Isidro Health Center"]),
            row(&["Barangay Poblacion"]),
        ]);
        assert_eq!(classifier.detect_health_center(&grid), "Barangay Poblacion");

        let grid = RawGrid::from_rows(vec![row(&["Monthly Report"])]);
        assert_eq!(classifier.detect_health_center(&grid), UNKNOWN_HEALTH_CENTER);
    }

    #[test]
    fn test_health_center_scan_is_limited() {
        let classifier = RowClassifier::default();
        let mut rows: Vec<Vec<Cell>> = (0..10).map(|_| row(&["filler"])).collect();
        rows.push(row(&["Late RHU"]));

        let grid = RawGrid::from_rows(rows);
        assert_eq!(classifier.detect_health_center(&grid), UNKNOWN_HEALTH_CENTER);
    }

    #[test]
    fn test_detect_period() {
        let classifier = RowClassifier::default();
        let grid = RawGrid::from_rows(vec![row(&["RHU 1"]), row(&["August-25"])]);
        assert_eq!(classifier.detect_period(&grid), Some("2025-08".to_string()));

        let grid = RawGrid::from_rows(vec![row(&["RHU 1"])]);
        assert_eq!(classifier.detect_period(&grid), None);
    }

    #[test]
    fn test_extract_drops_zero_rows_and_duplicates() {
        let classifier = RowClassifier::default();
        let normalizer = LabelNormalizer::new();
        let grid = RawGrid::from_rows(vec![
            row(&["1", "Paracetamol 500mg Tablet", "tablet", "100", "50", "30", "120"]),
            row(&["2", "Amoxicillin 500mg Capsule", "capsule", "0", "0", "0", "0"]),
            row(&["3", "PARACETAMOL 500 mg", "tablet", "9", "9", "9", "9"]),
            row(&["4", "Paracetamol 250mg Tablet", "", "10", "", "", "10"]),
        ]);

        let extraction = classifier.extract(&grid, "2025-08", &normalizer);

        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.skipped_rows, 2);

        let first = &extraction.records[0];
        assert_eq!(first.medicine_base_name, "Paracetamol");
        assert_eq!(first.beginning_balance, 100);

        let second = &extraction.records[1];
        assert_eq!(second.dosage, "250mg");
        assert_eq!(second.unit_type, "unit");
        assert_eq!(second.delivery, 0);
        assert_eq!(second.ending_balance, 10);
    }

    #[test]
    fn test_extract_uses_selected_period() {
        let classifier = RowClassifier::default();
        let normalizer = LabelNormalizer::new();
        let grid = RawGrid::from_rows(vec![
            row(&["Sta. Cruz RHU"]),
            row(&["July-25"]),
            row(&["1", "Ascorbic Acid 500mg", "tablet", "5", "0", "1", "4"]),
        ]);

        let extraction = classifier.extract(&grid, "2025-08", &normalizer);

        assert_eq!(extraction.context.health_center, "Sta. Cruz RHU");
        assert_eq!(extraction.context.detected_period.as_deref(), Some("2025-07"));
        assert_eq!(extraction.records[0].month_year, "2025-08");
        assert_eq!(extraction.records[0].health_center, "Sta. Cruz RHU");
    }
}
