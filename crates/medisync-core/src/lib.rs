//! MediSync Core Library
//!
//! Imports monthly medicine stock reports from rural health units into a
//! canonical, queryable inventory.
//!
//! # Architecture
//!
//! ```text
//!  CSV / TXT / XLSX bytes                 requisition-slip lines (JSON)
//!           │                                          │
//!     File Decoder ──► RawGrid                         │
//!           │                                          │
//!     Row Classifier ──► health center, period         │
//!           │                                          │
//!           └──────────► Label Normalizer ◄────────────┘
//!                         base name + dosage
//!                                │
//!                      dedup (base, dosage, month)
//!                                │
//!                 ┌──────────────▼──────────────┐
//!                 │   upload: processing        │
//!                 │   insert chunks of 1000     │
//!                 │   upload: completed/failed  │
//!                 └──────────────┬──────────────┘
//!                                │
//!                    refresh timeseries (best effort)
//! ```
//!
//! # Modules
//!
//! - [`parser`]: decoder, row classifier, label normalizer, date helpers
//! - [`import`]: the import pipeline and its store seam
//! - [`db`]: SQLite store for uploads, inventory and timeseries
//! - [`models`]: Domain types (Cell, MedicineRecord, Upload, etc.)
//! - [`export`]: Inventory export with stock status
//! - [`config`]: Import settings and matching vocabulary

pub mod config;
pub mod db;
pub mod export;
pub mod import;
pub mod models;
pub mod parser;

// Re-export commonly used types
pub use config::{ConfigError, ImportConfig, Vocabulary};
pub use db::{Database, DbError, DbResult, TimeseriesPoint};
pub use export::{InventoryExport, InventoryExporter, InventoryItem};
pub use import::{
    FileImport, ImportError, ImportResult, ImportSummary, Importer, InventoryStore,
    ManualImport, ManualOutcome, StoreError, UploadedFile,
};
pub use models::{
    Cell, ExtractionContext, ManualEntry, MedicineRecord, RawGrid, StockStatus, Upload,
    UploadStatus,
};
pub use parser::{LabelNormalizer, NormalizedLabel, RowClassifier};
