//! Medicine inventory and timeseries operations.

use chrono::NaiveDate;
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::{sql_count, Database, DbError, DbResult};
use crate::models::MedicineRecord;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Monthly totals for one medicine across all health centers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeseriesPoint {
    pub medicine_base_name: String,
    pub dosage: String,
    pub month_year: String,
    pub total_dispensed: u64,
    pub total_delivery: u64,
    pub total_ending_balance: u64,
    pub health_center_count: u64,
}

const INVENTORY_COLUMNS: &str = r#"
    medicine_name, medicine_base_name, dosage, unit_type,
    beginning_balance, delivery, dispensed, ending_balance,
    quantity_requested, quantity_issued, unit_cost, total_amount,
    month_year, health_center, medicine_code, batch_lot_no,
    expiration_date, purchase_order_no
"#;

impl Database {
    /// Insert a batch of records for one upload in one transaction.
    /// Returns rows written.
    pub fn insert_inventory_batch(
        &self,
        upload_id: &str,
        records: &[MedicineRecord],
    ) -> DbResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO medicine_inventory (upload_id, {INVENTORY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
            ))?;

            for record in records {
                stmt.execute(params![
                    upload_id,
                    record.medicine_name,
                    record.medicine_base_name,
                    record.dosage,
                    record.unit_type,
                    sql_count(record.beginning_balance),
                    sql_count(record.delivery),
                    sql_count(record.dispensed),
                    sql_count(record.ending_balance),
                    sql_count(record.quantity_requested),
                    sql_count(record.quantity_issued),
                    record.unit_cost,
                    record.total_amount,
                    record.month_year,
                    record.health_center,
                    record.medicine_code,
                    record.batch_lot_no,
                    record
                        .expiration_date
                        .map(|d| d.format(DATE_FORMAT).to_string()),
                    record.purchase_order_no,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// List stored records, newest period first, then by name.
    pub fn list_inventory(&self, month_year: Option<&str>) -> DbResult<Vec<MedicineRecord>> {
        self.query_inventory(
            "WHERE ?1 IS NULL OR month_year = ?1
             ORDER BY month_year DESC, medicine_name ASC, id ASC",
            month_year,
        )
    }

    /// Records written for one upload, in insertion order. A failed upload
    /// keeps the chunks committed before the failure.
    pub fn list_upload_inventory(&self, upload_id: &str) -> DbResult<Vec<MedicineRecord>> {
        self.query_inventory("WHERE upload_id = ?1 ORDER BY id ASC", Some(upload_id))
    }

    fn query_inventory(&self, filter: &str, param: Option<&str>) -> DbResult<Vec<MedicineRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM medicine_inventory {filter}"
        ))?;

        let rows = stmt.query_map([param], |row| {
            Ok(InventoryRow {
                medicine_name: row.get(0)?,
                medicine_base_name: row.get(1)?,
                dosage: row.get(2)?,
                unit_type: row.get(3)?,
                beginning_balance: row.get(4)?,
                delivery: row.get(5)?,
                dispensed: row.get(6)?,
                ending_balance: row.get(7)?,
                quantity_requested: row.get(8)?,
                quantity_issued: row.get(9)?,
                unit_cost: row.get(10)?,
                total_amount: row.get(11)?,
                month_year: row.get(12)?,
                health_center: row.get(13)?,
                medicine_code: row.get(14)?,
                batch_lot_no: row.get(15)?,
                expiration_date: row.get(16)?,
                purchase_order_no: row.get(17)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }

    /// Rebuild the timeseries table from the inventory. Returns rows written.
    pub fn refresh_timeseries(&self) -> DbResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM medicine_timeseries", [])?;
        let inserted = tx.execute(
            r#"
            INSERT INTO medicine_timeseries (
                medicine_base_name, dosage, month_year, total_dispensed,
                total_delivery, total_ending_balance, health_center_count
            )
            SELECT medicine_base_name, dosage, month_year,
                   SUM(dispensed), SUM(delivery), SUM(ending_balance),
                   COUNT(DISTINCT health_center)
            FROM medicine_inventory
            GROUP BY medicine_base_name, dosage, month_year
            "#,
            [],
        )?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Timeseries points in chronological order, optionally for one medicine.
    pub fn list_timeseries(&self, medicine_base_name: Option<&str>) -> DbResult<Vec<TimeseriesPoint>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT medicine_base_name, dosage, month_year, total_dispensed,
                   total_delivery, total_ending_balance, health_center_count
            FROM medicine_timeseries
            WHERE ?1 IS NULL OR medicine_base_name = ?1 COLLATE NOCASE
            ORDER BY medicine_base_name, dosage, month_year
            "#,
        )?;

        let points = stmt
            .query_map([medicine_base_name], |row| {
                Ok(TimeseriesPoint {
                    medicine_base_name: row.get(0)?,
                    dosage: row.get(1)?,
                    month_year: row.get(2)?,
                    total_dispensed: non_negative(row.get(3)?),
                    total_delivery: non_negative(row.get(4)?),
                    total_ending_balance: non_negative(row.get(5)?),
                    health_center_count: non_negative(row.get(6)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(points)
    }
}

fn non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

/// Intermediate row struct for database mapping.
struct InventoryRow {
    medicine_name: String,
    medicine_base_name: String,
    dosage: String,
    unit_type: String,
    beginning_balance: i64,
    delivery: i64,
    dispensed: i64,
    ending_balance: i64,
    quantity_requested: i64,
    quantity_issued: i64,
    unit_cost: f64,
    total_amount: f64,
    month_year: String,
    health_center: String,
    medicine_code: Option<String>,
    batch_lot_no: Option<String>,
    expiration_date: Option<String>,
    purchase_order_no: Option<String>,
}

impl TryFrom<InventoryRow> for MedicineRecord {
    type Error = DbError;

    fn try_from(row: InventoryRow) -> Result<Self, Self::Error> {
        let expiration_date = row
            .expiration_date
            .map(|s| {
                NaiveDate::parse_from_str(&s, DATE_FORMAT)
                    .map_err(|_| DbError::InvalidData(format!("expiration date '{}'", s)))
            })
            .transpose()?;

        Ok(MedicineRecord {
            medicine_name: row.medicine_name,
            medicine_base_name: row.medicine_base_name,
            dosage: row.dosage,
            unit_type: row.unit_type,
            beginning_balance: non_negative(row.beginning_balance),
            delivery: non_negative(row.delivery),
            dispensed: non_negative(row.dispensed),
            ending_balance: non_negative(row.ending_balance),
            quantity_requested: non_negative(row.quantity_requested),
            quantity_issued: non_negative(row.quantity_issued),
            unit_cost: row.unit_cost,
            total_amount: row.total_amount,
            month_year: row.month_year,
            health_center: row.health_center,
            medicine_code: row.medicine_code,
            batch_lot_no: row.batch_lot_no,
            expiration_date,
            purchase_order_no: row.purchase_order_no,
        })
    }
}
