//! Inventory export with stock status.

use serde::{Deserialize, Serialize};

use crate::db::{Database, DbResult};
use crate::models::{MedicineRecord, StockStatus};

const CSV_HEADER: [&str; 11] = [
    "month_year",
    "health_center",
    "medicine_name",
    "medicine_base_name",
    "dosage",
    "unit_type",
    "beginning_balance",
    "delivery",
    "dispensed",
    "ending_balance",
    "stock_status",
];

/// Inventory export for one period (or all periods).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryExport {
    /// Export metadata
    pub metadata: InventoryMetadata,
    /// One entry per stored record
    pub items: Vec<InventoryItem>,
}

/// Inventory export metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryMetadata {
    /// "YYYY-MM" filter, or `None` for every period
    pub month_year: Option<String>,
    pub exported_at: String,
    pub total_items: usize,
    pub low_stock_threshold: u64,
}

/// A stored record with its derived stock status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    #[serde(flatten)]
    pub record: MedicineRecord,
    pub stock_status: StockStatus,
}

impl InventoryItem {
    pub fn new(record: MedicineRecord, low_stock_threshold: u64) -> Self {
        let stock_status = record.stock_status(low_stock_threshold);
        Self {
            record,
            stock_status,
        }
    }
}

impl InventoryExport {
    /// Build an export from already loaded records.
    pub fn from_records(
        records: Vec<MedicineRecord>,
        month_year: Option<&str>,
        low_stock_threshold: u64,
    ) -> Self {
        let items: Vec<InventoryItem> = records
            .into_iter()
            .map(|r| InventoryItem::new(r, low_stock_threshold))
            .collect();

        Self {
            metadata: InventoryMetadata {
                month_year: month_year.map(str::to_string),
                exported_at: chrono::Utc::now().to_rfc3339(),
                total_items: items.len(),
                low_stock_threshold,
            },
            items,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> csv::Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;

        for item in &self.items {
            let r = &item.record;
            writer.write_record([
                r.month_year.as_str(),
                r.health_center.as_str(),
                r.medicine_name.as_str(),
                r.medicine_base_name.as_str(),
                r.dosage.as_str(),
                r.unit_type.as_str(),
                r.beginning_balance.to_string().as_str(),
                r.delivery.to_string().as_str(),
                r.dispensed.to_string().as_str(),
                r.ending_balance.to_string().as_str(),
                item.stock_status.label(),
            ])?;
        }

        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Inventory exporter.
pub struct InventoryExporter<'a> {
    db: &'a Database,
    low_stock_threshold: u64,
}

impl<'a> InventoryExporter<'a> {
    pub fn new(db: &'a Database, low_stock_threshold: u64) -> Self {
        Self {
            db,
            low_stock_threshold,
        }
    }

    /// Export stored records, optionally for a single period.
    pub fn export(&self, month_year: Option<&str>) -> DbResult<InventoryExport> {
        let records = self.db.list_inventory(month_year)?;
        Ok(InventoryExport::from_records(
            records,
            month_year,
            self.low_stock_threshold,
        ))
    }
}
