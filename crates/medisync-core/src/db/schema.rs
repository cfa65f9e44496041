//! SQLite schema definition.

/// Complete database schema for medisync.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Uploads
-- ============================================================================

CREATE TABLE IF NOT EXISTS uploads (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    health_center TEXT NOT NULL,
    month TEXT NOT NULL,                          -- YYYY-MM
    row_count INTEGER NOT NULL DEFAULT 0,
    processed_count INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'processing'
        CHECK (status IN ('processing', 'completed', 'failed')),
    error_message TEXT,
    content_hash TEXT NOT NULL,                   -- SHA-256 of uploaded bytes
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_uploads_month ON uploads(month);
CREATE INDEX IF NOT EXISTS idx_uploads_content_hash ON uploads(content_hash);

-- ============================================================================
-- Medicine Inventory
-- ============================================================================

CREATE TABLE IF NOT EXISTS medicine_inventory (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    upload_id TEXT NOT NULL REFERENCES uploads(id),
    medicine_name TEXT NOT NULL,
    medicine_base_name TEXT NOT NULL,
    dosage TEXT NOT NULL DEFAULT '',
    unit_type TEXT NOT NULL,
    beginning_balance INTEGER NOT NULL DEFAULT 0,
    delivery INTEGER NOT NULL DEFAULT 0,
    dispensed INTEGER NOT NULL DEFAULT 0,
    ending_balance INTEGER NOT NULL DEFAULT 0,
    quantity_requested INTEGER NOT NULL DEFAULT 0,
    quantity_issued INTEGER NOT NULL DEFAULT 0,
    unit_cost REAL NOT NULL DEFAULT 0,
    total_amount REAL NOT NULL DEFAULT 0,
    month_year TEXT NOT NULL,                     -- YYYY-MM
    health_center TEXT NOT NULL,
    medicine_code TEXT,
    batch_lot_no TEXT,
    expiration_date TEXT,                         -- YYYY-MM-DD
    purchase_order_no TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_inventory_upload ON medicine_inventory(upload_id);
CREATE INDEX IF NOT EXISTS idx_inventory_month_year ON medicine_inventory(month_year);
CREATE INDEX IF NOT EXISTS idx_inventory_base_dosage
    ON medicine_inventory(medicine_base_name, dosage);

-- ============================================================================
-- Medicine Timeseries (derived, rebuilt by refresh_timeseries)
-- ============================================================================

CREATE TABLE IF NOT EXISTS medicine_timeseries (
    medicine_base_name TEXT NOT NULL,
    dosage TEXT NOT NULL,
    month_year TEXT NOT NULL,
    total_dispensed INTEGER NOT NULL DEFAULT 0,
    total_delivery INTEGER NOT NULL DEFAULT 0,
    total_ending_balance INTEGER NOT NULL DEFAULT 0,
    health_center_count INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (medicine_base_name, dosage, month_year)
);
"#;
