//! Medicine label normalizer.
//!
//! Handles:
//! - Whitespace cleanup (NBSP, runs of spaces)
//! - Dosage extraction ("500 MG" → "500mg", "250mg / 5ml" → "250mg/5ml")
//! - Dosage-form stripping ("Paracetamol Tablets" → "Paracetamol")

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigResult, Vocabulary};

const NUMBER: &str = r"\d+(?:\.\d+)?";

/// Result of splitting a medicine label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedLabel {
    /// Label with dosage and dosage-form words removed
    pub base_name: String,
    /// Lowercased, whitespace-free strength token; empty if none found
    pub dosage: String,
}

/// Normalizer for free-text medicine labels.
#[derive(Debug, Clone)]
pub struct LabelNormalizer {
    /// numeric strength + unit, optional ratio and multiplier suffixes
    dosage_pattern: Regex,
    /// standalone dosage-form words, optionally pluralized
    form_pattern: Regex,
}

impl Default for LabelNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelNormalizer {
    /// Create a normalizer with the built-in vocabulary.
    pub fn new() -> Self {
        Self::from_vocabulary(&Vocabulary::default())
            .expect("built-in vocabulary is escaped and always compiles")
    }

    /// Create a normalizer from a custom vocabulary.
    pub fn from_vocabulary(vocabulary: &Vocabulary) -> ConfigResult<Self> {
        let units = alternation(&vocabulary.dosage_units);
        let ratio_units = alternation(&vocabulary.ratio_units);
        let multiplier_units = alternation(&vocabulary.multiplier_units);

        let dosage_pattern = Regex::new(&format!(
            r"(?i){NUMBER}\s*(?:{units})(?:\s*/\s*{NUMBER}\s*(?:{ratio_units}))?(?:\s*[x×]\s*\d+(?:\s*(?:{multiplier_units}))?)?"
        ))?;

        let form_pattern = Regex::new(&format!(
            r"(?i)\b(?:{})s?\b",
            alternation(&vocabulary.dosage_forms)
        ))?;

        Ok(Self {
            dosage_pattern,
            form_pattern,
        })
    }

    /// Split a label into base name and dosage token. Never fails.
    ///
    /// The first strength becomes the dosage; every strength is removed from
    /// the base name so normalizing a base name again leaves it unchanged.
    pub fn normalize(&self, label: &str) -> NormalizedLabel {
        let cleaned = clean_label(label);
        let dosage = self
            .dosage_pattern
            .find(&cleaned)
            .map(|m| compact_dosage(m.as_str()))
            .unwrap_or_default();

        // removing one token can expose another ("5 tab mg"), so run to a fixed point
        let mut base_name = cleaned;
        loop {
            let next = self.strip_once(&base_name);
            if next == base_name {
                break;
            }
            base_name = next;
        }

        NormalizedLabel { base_name, dosage }
    }

    fn strip_once(&self, text: &str) -> String {
        let without_dosage = self.dosage_pattern.replace_all(text, " ");
        let stripped = self.strip_dosage_forms(&without_dosage);
        // "A 500mg + 125mg" leaves a dangling "+"
        stripped
            .trim_matches(|c: char| matches!(c, '+' | '/' | ',') || c.is_whitespace())
            .to_string()
    }

    /// Find the first dosage token in a label.
    pub fn extract_dosage(&self, label: &str) -> Option<String> {
        self.dosage_pattern
            .find(&clean_label(label))
            .map(|m| compact_dosage(m.as_str()))
    }

    /// Remove dosage-form words and tidy the remaining whitespace.
    pub fn strip_dosage_forms(&self, text: &str) -> String {
        clean_label(&self.form_pattern.replace_all(text, " "))
    }
}

/// Collapse every whitespace run (including NBSP) to one space and trim.
pub fn clean_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn compact_dosage(matched: &str) -> String {
    matched
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn alternation(words: &[String]) -> String {
    words
        .iter()
        .filter(|w| !w.is_empty())
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_label() {
        let normalizer = LabelNormalizer::new();
        let label = normalizer.normalize("Paracetamol 500 MG Tablet");

        assert_eq!(label.dosage, "500mg");
        assert_eq!(label.base_name, "Paracetamol");
    }

    #[test]
    fn test_ratio_dosage() {
        let normalizer = LabelNormalizer::new();
        let label = normalizer.normalize("Amoxicillin 250mg / 5 mL Suspension");

        assert_eq!(label.dosage, "250mg/5ml");
        assert_eq!(label.base_name, "Amoxicillin");
    }

    #[test]
    fn test_multiplier_dosage() {
        let normalizer = LabelNormalizer::new();
        let label = normalizer.normalize("Oral Rehydration Salts 20.5g x 25");

        assert_eq!(label.dosage, "20.5gx25");
        assert_eq!(label.base_name, "Rehydration Salts");
    }

    #[test]
    fn test_percent_and_iu() {
        let normalizer = LabelNormalizer::new();

        let cream = normalizer.normalize("Hydrocortisone 1% Cream Tube");
        assert_eq!(cream.dosage, "1%");
        assert_eq!(cream.base_name, "Hydrocortisone");

        let vitamin = normalizer.normalize("Vitamin A 200,000 IU Capsules");
        // the comma splits the number, so only "000 IU" is a strength
        assert_eq!(vitamin.dosage, "000iu");
    }

    #[test]
    fn test_no_dosage() {
        let normalizer = LabelNormalizer::new();
        let label = normalizer.normalize("  Ferrous\u{00A0}Sulfate  ");

        assert_eq!(label.dosage, "");
        assert_eq!(label.base_name, "Ferrous Sulfate");
    }

    #[test]
    fn test_form_words_only_removed_when_standalone() {
        let normalizer = LabelNormalizer::new();

        // "Captopril" starts with "cap" but is not the word "cap"
        let label = normalizer.normalize("Captopril 25mg Tabs");
        assert_eq!(label.base_name, "Captopril");
        assert_eq!(label.dosage, "25mg");
    }

    #[test]
    fn test_dosage_in_middle_leaves_single_space() {
        let normalizer = LabelNormalizer::new();
        let label = normalizer.normalize("Ferrous 60mg Sulfate");

        assert_eq!(label.base_name, "Ferrous Sulfate");
    }

    #[test]
    fn test_second_strength_removed_from_base() {
        let normalizer = LabelNormalizer::new();
        let label = normalizer.normalize("Amoxicillin + Clavulanic Acid 500 mg + 125 mg Tablet");

        assert_eq!(label.dosage, "500mg");
        assert_eq!(label.base_name, "Amoxicillin + Clavulanic Acid");
        assert_eq!(normalizer.normalize(&label.base_name).base_name, label.base_name);
    }

    #[test]
    fn test_empty_label() {
        let normalizer = LabelNormalizer::new();
        let label = normalizer.normalize("");

        assert_eq!(label.base_name, "");
        assert_eq!(label.dosage, "");
    }

    #[test]
    fn test_extract_dosage() {
        let normalizer = LabelNormalizer::new();

        assert_eq!(
            normalizer.extract_dosage("Salbutamol 2mg/5ml Syrup"),
            Some("2mg/5ml".to_string())
        );
        assert_eq!(normalizer.extract_dosage("Cotrimoxazole"), None);
    }

    #[test]
    fn test_custom_vocabulary() {
        let mut vocabulary = Vocabulary::default();
        vocabulary.dosage_units.push("meq".into());
        vocabulary.dosage_forms.push("ampoule".into());

        let normalizer = LabelNormalizer::from_vocabulary(&vocabulary).unwrap();
        let label = normalizer.normalize("Potassium Chloride 20 mEq Ampoule");

        assert_eq!(label.dosage, "20meq");
        assert_eq!(label.base_name, "Potassium Chloride");
    }
}
