//! Import configuration.
//!
//! Every vocabulary the parser matches against lives here as data so that the
//! bulk-file and manual-entry paths share one source of truth. Defaults match
//! the monthly stock report template; a TOML file can override any field.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Records per insert chunk.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Two-digit years below this expand to 20xx, the rest to 19xx.
pub const TWO_DIGIT_YEAR_PIVOT: u32 = 50;

/// Rows scanned from the top of a file for the health-center label.
pub const HEALTH_CENTER_SCAN_ROWS: usize = 10;

/// Ending balance below which an item is reported as low stock.
pub const LOW_STOCK_THRESHOLD: u64 = 100;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid vocabulary pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for one import run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImportConfig {
    pub batch_size: usize,
    pub health_center_scan_rows: usize,
    pub year_pivot: u32,
    pub low_stock_threshold: u64,
    pub vocabulary: Vocabulary,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            health_center_scan_rows: HEALTH_CENTER_SCAN_ROWS,
            year_pivot: TWO_DIGIT_YEAR_PIVOT,
            low_stock_threshold: LOW_STOCK_THRESHOLD,
            vocabulary: Vocabulary::default(),
        }
    }
}

impl ImportConfig {
    /// Parse and validate a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let config: ImportConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if self.year_pivot > 100 {
            return Err(ConfigError::Invalid(format!(
                "year_pivot must be between 0 and 100, got {}",
                self.year_pivot
            )));
        }
        if self.vocabulary.dosage_units.is_empty() {
            return Err(ConfigError::Invalid("dosage_units must not be empty".into()));
        }
        Ok(())
    }
}

/// Word lists used by the label normalizer and row classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Vocabulary {
    /// Units that may follow the strength number (e.g., "500 mg")
    pub dosage_units: Vec<String>,
    /// Units allowed in a "/<n><unit>" ratio suffix (e.g., "/5ml")
    pub ratio_units: Vec<String>,
    /// Units allowed after an "x<n>" multiplier suffix
    pub multiplier_units: Vec<String>,
    /// Dosage-form words stripped from the base name (plural "s" implied)
    pub dosage_forms: Vec<String>,
    /// Values of the unit column that mark a row as a medicine line
    pub row_units: Vec<String>,
    /// Substrings of the name column that mark a header row
    pub header_keywords: Vec<String>,
    /// Uppercase substrings that identify the health-center cell
    pub health_center_markers: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            dosage_units: words(&["mg", "g", "ml", "mcg", "iu", "units", "%"]),
            ratio_units: words(&["mg", "g", "ml"]),
            multiplier_units: words(&["ml", "mg", "g"]),
            dosage_forms: words(&[
                "tablet",
                "capsule",
                "bottle",
                "sachet",
                "syrup",
                "drops",
                "suspension",
                "granules",
                "ampule",
                "vial",
                "oral",
                "solution",
                "tab",
                "cap",
                "cream",
                "tube",
                "nebule",
            ]),
            row_units: words(&[
                "tablet",
                "capsule",
                "bottle",
                "sachet",
                "syrup",
                "drops",
                "suspension",
                "granules",
                "ampule",
                "vial",
            ]),
            header_keywords: words(&[
                "health center",
                "medicine",
                "name",
                "item",
                "drug",
                "inventory",
            ]),
            health_center_markers: words(&["HEALTH CENTER", "RHU", "BARANGAY"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ImportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.year_pivot, 50);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ImportConfig::from_toml_str(
            r#"
            batch_size = 250

            [vocabulary]
            row_units = ["tablet", "box"]
            "#,
        )
        .unwrap();

        assert_eq!(config.batch_size, 250);
        assert_eq!(config.health_center_scan_rows, 10);
        assert_eq!(config.vocabulary.row_units, vec!["tablet", "box"]);
        assert!(config.vocabulary.dosage_forms.contains(&"nebule".to_string()));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = ImportConfig::from_toml_str("batch_size = 0");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = ImportConfig::from_toml_str("batch_size = ");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.toml");
        std::fs::write(&path, "low_stock_threshold = 20\n").unwrap();

        let config = ImportConfig::load(&path).unwrap();
        assert_eq!(config.low_stock_threshold, 20);
    }
}
