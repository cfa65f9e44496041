//! Import pipeline: validate → decode → classify → persist.
//!
//! Two entry points share persistence:
//! - [`Importer::import_file`] for CSV/TXT/Excel stock reports
//! - [`Importer::import_manual`] for requisition-slip lines entered by hand
//!
//! Records are written in chunks of [`ImportConfig::batch_size`]. The first
//! failing chunk marks the upload `failed` and aborts; earlier chunks stay
//! committed. The timeseries refresh afterwards is best effort.

mod store;

pub use store::{InventoryStore, StoreError, StoreResult};

use std::collections::HashSet;

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigResult, ImportConfig};
use crate::models::{
    ManualEntry, MedicineRecord, NewUpload, UploadUpdate, UNKNOWN_HEALTH_CENTER,
};
use crate::parser::{
    decode, month_year_from_parts, parse_date_with_pivot, DecodeError, LabelNormalizer,
    RowClassifier,
};

const DEFAULT_UNIT: &str = "unit";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Import errors. The display text is what callers show to the user.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("No file provided")]
    MissingFile,

    #[error("Month and year are required")]
    MissingPeriod,

    #[error("Invalid records data")]
    InvalidRecords(#[source] serde_json::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("File is empty or could not be parsed")]
    EmptyFile,

    #[error("No valid medicine records found. Please check your file format.")]
    NoValidRecords,

    #[error("Failed to create upload record: {0}")]
    CreateUpload(#[source] StoreError),

    #[error("Failed to insert records: {0}")]
    InsertRecords(#[source] StoreError),

    #[error("Failed to update upload status: {0}")]
    UpdateUpload(#[source] StoreError),
}

impl ImportError {
    /// True for problems with the request itself rather than the store.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            ImportError::CreateUpload(_)
                | ImportError::InsertRecords(_)
                | ImportError::UpdateUpload(_)
        )
    }
}

pub type ImportResult<T> = Result<T, ImportError>;

/// A file received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    /// MIME type as sent by the client; may be empty
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Bulk stock-report import request.
#[derive(Debug, Clone, Default)]
pub struct FileImport {
    pub file: Option<UploadedFile>,
    /// Full English month name, e.g. "August"
    pub month: String,
    pub year: String,
}

/// Requisition-slip import request.
#[derive(Debug, Clone, Default)]
pub struct ManualImport {
    pub file: Option<UploadedFile>,
    pub month: String,
    pub year: String,
    /// JSON array of [`ManualEntry`] values, if the user entered any
    pub records: Option<String>,
}

/// Outcome of a successful import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub upload_id: String,
    pub processed_rows: usize,
    pub total_rows: usize,
    pub unique_medicines: Option<usize>,
    pub health_center: String,
    /// "YYYY-MM"
    pub month: String,
    pub message: String,
}

/// Outcome of a requisition-slip import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualOutcome {
    Imported(ImportSummary),
    /// No lines were submitted; the client should show the image for review.
    NeedsManualEntry {
        image_preview: String,
        message: String,
    },
}

/// Import pipeline bound to one store.
pub struct Importer<'a, S: InventoryStore + ?Sized> {
    store: &'a S,
    config: ImportConfig,
    normalizer: LabelNormalizer,
    classifier: RowClassifier,
}

impl<'a, S: InventoryStore + ?Sized> Importer<'a, S> {
    /// Create an importer with the default configuration.
    pub fn new(store: &'a S) -> Self {
        Self::with_normalizer(store, ImportConfig::default(), LabelNormalizer::new())
    }

    /// Create an importer, compiling the normalizer from the config vocabulary.
    pub fn with_config(store: &'a S, config: ImportConfig) -> ConfigResult<Self> {
        let normalizer = LabelNormalizer::from_vocabulary(&config.vocabulary)?;
        Ok(Self::with_normalizer(store, config, normalizer))
    }

    /// Create an importer from an already compiled normalizer.
    pub fn with_normalizer(
        store: &'a S,
        config: ImportConfig,
        normalizer: LabelNormalizer,
    ) -> Self {
        let classifier = RowClassifier::new(&config);
        Self {
            store,
            config,
            normalizer,
            classifier,
        }
    }

    /// Import a CSV/TXT/Excel stock report.
    pub fn import_file(&self, request: FileImport) -> ImportResult<ImportSummary> {
        let file = request.file.ok_or(ImportError::MissingFile)?;
        let month_year = require_period(&request.month, &request.year)?;

        let grid = decode(&file.bytes, &file.filename)?;
        if grid.is_empty() {
            return Err(ImportError::EmptyFile);
        }

        let extraction = self.classifier.extract(&grid, &month_year, &self.normalizer);
        let records = extraction.records;
        if records.is_empty() {
            return Err(ImportError::NoValidRecords);
        }

        let health_center = extraction.context.health_center;
        let upload = NewUpload::new(
            &file.filename,
            &file.bytes,
            &health_center,
            &month_year,
            grid.len() as u64,
            records.len() as u64,
        );
        let upload_id = self.persist(&upload, &records)?;

        tracing::info!(
            upload_id = %upload_id,
            filename = %file.filename,
            health_center = %health_center,
            month = %month_year,
            records = records.len(),
            skipped = extraction.skipped_rows,
            "imported stock report"
        );

        Ok(ImportSummary {
            message: format!(
                "Successfully imported {} medicine records for {} {} from {}",
                records.len(),
                request.month.trim(),
                request.year.trim(),
                health_center
            ),
            upload_id,
            processed_rows: records.len(),
            total_rows: grid.len(),
            unique_medicines: Some(unique_medicines(&records)),
            health_center,
            month: month_year,
        })
    }

    /// Import requisition-slip lines, or ask for manual entry if none were sent.
    pub fn import_manual(&self, request: ManualImport) -> ImportResult<ManualOutcome> {
        let file = request.file.ok_or(ImportError::MissingFile)?;
        let month_year = require_period(&request.month, &request.year)?;

        let entries: Vec<ManualEntry> = match request.records.as_deref().map(str::trim) {
            Some(json) if !json.is_empty() => {
                serde_json::from_str(json).map_err(ImportError::InvalidRecords)?
            }
            _ => Vec::new(),
        };

        if entries.is_empty() {
            return Ok(ManualOutcome::NeedsManualEntry {
                image_preview: data_url(&file),
                message: "Image uploaded. Please review and enter the data manually.".into(),
            });
        }

        let records = self.records_from_entries(&entries, &month_year);
        if records.is_empty() {
            return Err(ImportError::NoValidRecords);
        }

        let upload = NewUpload::new(
            &file.filename,
            &file.bytes,
            UNKNOWN_HEALTH_CENTER,
            &month_year,
            entries.len() as u64,
            records.len() as u64,
        );
        let upload_id = self.persist(&upload, &records)?;

        tracing::info!(
            upload_id = %upload_id,
            filename = %file.filename,
            month = %month_year,
            records = records.len(),
            "imported requisition slip"
        );

        Ok(ManualOutcome::Imported(ImportSummary {
            message: format!(
                "Successfully imported {} medicine records from requisition slip for {} {}",
                records.len(),
                request.month.trim(),
                request.year.trim()
            ),
            upload_id,
            processed_rows: records.len(),
            total_rows: entries.len(),
            unique_medicines: Some(unique_medicines(&records)),
            health_center: UNKNOWN_HEALTH_CENTER.to_string(),
            month: month_year,
        }))
    }

    fn records_from_entries(&self, entries: &[ManualEntry], month_year: &str) -> Vec<MedicineRecord> {
        let mut records = Vec::with_capacity(entries.len());
        let mut seen = HashSet::new();

        for (index, entry) in entries.iter().enumerate() {
            let name = entry.medicine_name.trim();
            if name.is_empty() {
                tracing::debug!(entry = index, "skipping entry without medicine name");
                continue;
            }

            let label = self.normalizer.normalize(name);
            let base_name = if label.base_name.is_empty() {
                entry.medicine_base_name.trim().to_string()
            } else {
                label.base_name
            };
            let dosage = if label.dosage.is_empty() {
                entry.dosage.trim().to_lowercase()
            } else {
                label.dosage
            };
            let unit_type = entry
                .unit_type
                .as_deref()
                .map(|u| u.trim().to_lowercase())
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_UNIT.to_string());

            let mut record = MedicineRecord::new(
                name.to_string(),
                base_name,
                dosage,
                unit_type,
                month_year.to_string(),
                UNKNOWN_HEALTH_CENTER.to_string(),
            );

            let issued = entry.quantity_issued.unwrap_or(0.0);
            let unit_cost = entry.unit_cost.unwrap_or(0.0);
            record.quantity_requested = whole_quantity(entry.quantity_requested.unwrap_or(0.0));
            record.quantity_issued = whole_quantity(issued);
            record.dispensed = record.quantity_issued;
            record.unit_cost = unit_cost;
            record.total_amount = entry.total_amount.unwrap_or(issued * unit_cost);
            record.medicine_code = non_blank(&entry.medicine_code);
            record.batch_lot_no = non_blank(&entry.batch_lot_no);
            record.purchase_order_no = non_blank(&entry.purchase_order_no);
            record.expiration_date = entry
                .expiration_date
                .as_deref()
                .and_then(|d| parse_date_with_pivot(d, self.config.year_pivot));

            if !seen.insert(record.dedup_key()) {
                tracing::debug!(entry = index, name = %record.medicine_name, "skipping duplicate medicine");
                continue;
            }
            records.push(record);
        }

        records
    }

    /// Create the upload, insert every chunk, then mark it completed.
    fn persist(&self, upload: &NewUpload, records: &[MedicineRecord]) -> ImportResult<String> {
        let upload_id = self
            .store
            .create_upload(upload)
            .map_err(ImportError::CreateUpload)?;

        let batch_size = self.config.batch_size.max(1);
        for (index, chunk) in records.chunks(batch_size).enumerate() {
            if let Err(err) = self.store.insert_inventory_batch(&upload_id, chunk) {
                tracing::error!(upload_id = %upload_id, batch = index, error = %err, "batch insert failed");

                let failed = UploadUpdate::Failed {
                    error_message: err.0.clone(),
                };
                if let Err(update_err) = self.store.update_upload(&upload_id, &failed) {
                    tracing::error!(upload_id = %upload_id, error = %update_err, "could not mark upload failed");
                }
                return Err(ImportError::InsertRecords(err));
            }
        }

        let completed = UploadUpdate::Completed {
            processed_count: records.len() as u64,
        };
        self.store
            .update_upload(&upload_id, &completed)
            .map_err(ImportError::UpdateUpload)?;

        if let Err(err) = self.store.refresh_timeseries() {
            tracing::warn!(upload_id = %upload_id, error = %err, "timeseries refresh failed");
        }

        Ok(upload_id)
    }
}

fn require_period(month: &str, year: &str) -> ImportResult<String> {
    if month.trim().is_empty() || year.trim().is_empty() {
        return Err(ImportError::MissingPeriod);
    }
    Ok(month_year_from_parts(month, year))
}

fn unique_medicines(records: &[MedicineRecord]) -> usize {
    records
        .iter()
        .map(|r| r.medicine_base_name.to_lowercase())
        .collect::<HashSet<_>>()
        .len()
}

fn whole_quantity(value: f64) -> u64 {
    if value.is_nan() {
        0
    } else {
        value.floor().max(0.0) as u64
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn data_url(file: &UploadedFile) -> String {
    let mime = if file.content_type.trim().is_empty() {
        DEFAULT_CONTENT_TYPE
    } else {
        file.content_type.trim()
    };
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(&file.bytes)
    )
}
