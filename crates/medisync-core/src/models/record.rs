//! Inventory record models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentinel used when no health-center label can be detected.
pub const UNKNOWN_HEALTH_CENTER: &str = "Unknown Health Center";

/// One canonical medicine line for one health center and month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicineRecord {
    /// Original free text, kept for audit
    pub medicine_name: String,
    /// Name with dosage and dosage-form words removed
    pub medicine_base_name: String,
    /// Normalized strength token (e.g., "500mg"); empty if none detected
    pub dosage: String,
    /// Lowercased unit of measure (e.g., "tablet")
    pub unit_type: String,
    pub beginning_balance: u64,
    pub delivery: u64,
    pub dispensed: u64,
    pub ending_balance: u64,
    pub quantity_requested: u64,
    pub quantity_issued: u64,
    pub unit_cost: f64,
    pub total_amount: f64,
    /// Canonical "YYYY-MM" period
    pub month_year: String,
    pub health_center: String,
    /// Item code from a requisition slip
    pub medicine_code: Option<String>,
    pub batch_lot_no: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub purchase_order_no: Option<String>,
}

impl MedicineRecord {
    /// Create a record with all quantities zeroed and no audit fields.
    pub fn new(
        medicine_name: String,
        medicine_base_name: String,
        dosage: String,
        unit_type: String,
        month_year: String,
        health_center: String,
    ) -> Self {
        Self {
            medicine_name,
            medicine_base_name,
            dosage,
            unit_type,
            beginning_balance: 0,
            delivery: 0,
            dispensed: 0,
            ending_balance: 0,
            quantity_requested: 0,
            quantity_issued: 0,
            unit_cost: 0.0,
            total_amount: 0.0,
            month_year,
            health_center,
            medicine_code: None,
            batch_lot_no: None,
            expiration_date: None,
            purchase_order_no: None,
        }
    }

    /// Key that must be unique within one import batch.
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.medicine_base_name.to_lowercase(),
            self.dosage.clone(),
            self.month_year.clone(),
        )
    }

    /// True when all four stock-card quantities are zero.
    pub fn has_no_movement(&self) -> bool {
        self.beginning_balance == 0
            && self.delivery == 0
            && self.dispensed == 0
            && self.ending_balance == 0
    }

    /// Stock status derived from the ending balance.
    pub fn stock_status(&self, low_stock_threshold: u64) -> StockStatus {
        StockStatus::from_balance(self.ending_balance, low_stock_threshold)
    }
}

/// Stock level classification shown on the inventory listing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

impl StockStatus {
    pub fn from_balance(ending_balance: u64, low_stock_threshold: u64) -> Self {
        if ending_balance == 0 {
            StockStatus::OutOfStock
        } else if ending_balance < low_stock_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    /// Display label ("OUT OF STOCK", "LOW STOCK", "IN STOCK").
    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "OUT OF STOCK",
            StockStatus::LowStock => "LOW STOCK",
            StockStatus::InStock => "IN STOCK",
        }
    }
}

/// Per-file metadata derived while classifying rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionContext {
    /// Detected health-center label, or [`UNKNOWN_HEALTH_CENTER`]
    pub health_center: String,
    /// Caller-supplied period; authoritative for every record
    pub month_year: String,
    /// Month label found inside the file, normalized to "YYYY-MM".
    /// Informational only.
    pub detected_period: Option<String>,
}

/// A line entered by hand from a requisition slip.
///
/// Field names follow the JSON the upload form posts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ManualEntry {
    pub medicine_code: Option<String>,
    pub medicine_name: String,
    pub medicine_base_name: String,
    pub dosage: String,
    pub unit_type: Option<String>,
    pub quantity_requested: Option<f64>,
    pub quantity_issued: Option<f64>,
    pub unit_cost: Option<f64>,
    pub total_amount: Option<f64>,
    pub batch_lot_no: Option<String>,
    pub expiration_date: Option<String>,
    pub purchase_order_no: Option<String>,
}
