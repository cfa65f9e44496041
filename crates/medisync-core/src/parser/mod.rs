//! Parsing pipeline for uploaded stock reports.
//!
//! - [`decoder`]: bytes → [`RawGrid`](crate::models::RawGrid)
//! - [`classifier`]: grid rows → [`MedicineRecord`](crate::models::MedicineRecord)s
//! - [`normalizer`]: medicine label → base name + dosage
//! - [`dates`]: month labels and expiry dates

pub mod classifier;
pub mod dates;
pub mod decoder;
pub mod normalizer;

pub use classifier::{parse_number, parse_quantity, Extraction, RowClassifier};
pub use dates::{
    expand_two_digit_year, is_month_label, is_month_year, month_year_from_parts, parse_date,
    parse_date_with_pivot, parse_month_label, parse_month_label_with_pivot,
};
pub use decoder::{decode, file_extension, DecodeError, DecodeResult, FileFormat};
pub use normalizer::{clean_label, LabelNormalizer, NormalizedLabel};
