//! Persistence seam for the import pipeline.

use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{MedicineRecord, NewUpload, UploadUpdate};

/// Store failure carrying the backend's human-readable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        StoreError(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Operations the importer needs from its backing store.
pub trait InventoryStore {
    /// Insert an upload in `processing` state and return its id.
    fn create_upload(&self, upload: &NewUpload) -> StoreResult<String>;

    /// Insert one chunk of records atomically, tagged with their upload.
    fn insert_inventory_batch(&self, upload_id: &str, records: &[MedicineRecord])
        -> StoreResult<usize>;

    /// Move an upload to `completed` or `failed`.
    fn update_upload(&self, id: &str, update: &UploadUpdate) -> StoreResult<()>;

    /// Rebuild derived aggregates. Callers treat failure as non-fatal.
    fn refresh_timeseries(&self) -> StoreResult<()>;
}

impl InventoryStore for Database {
    fn create_upload(&self, upload: &NewUpload) -> StoreResult<String> {
        Ok(self.insert_upload(upload)?)
    }

    fn insert_inventory_batch(&self, upload_id: &str, records: &[MedicineRecord]) -> StoreResult<usize> {
        Ok(Database::insert_inventory_batch(self, upload_id, records)?)
    }

    fn update_upload(&self, id: &str, update: &UploadUpdate) -> StoreResult<()> {
        Ok(Database::update_upload(self, id, update)?)
    }

    fn refresh_timeseries(&self) -> StoreResult<()> {
        Database::refresh_timeseries(self)?;
        Ok(())
    }
}
