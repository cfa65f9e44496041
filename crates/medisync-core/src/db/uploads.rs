//! Upload bookkeeping operations.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{sql_count, Database, DbError, DbResult};
use crate::models::{NewUpload, Upload, UploadStatus, UploadUpdate};

impl Database {
    /// Insert an upload in `processing` state and return its generated id.
    pub fn insert_upload(&self, upload: &NewUpload) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            r#"
            INSERT INTO uploads (
                id, filename, health_center, month, row_count,
                processed_count, status, content_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                id,
                upload.filename,
                upload.health_center,
                upload.month,
                sql_count(upload.row_count),
                sql_count(upload.processed_count),
                UploadStatus::Processing.as_str(),
                upload.content_hash,
            ],
        )?;
        Ok(id)
    }

    /// Apply a status transition to an existing upload.
    pub fn update_upload(&self, id: &str, update: &UploadUpdate) -> DbResult<()> {
        let rows_affected = match update {
            UploadUpdate::Completed { processed_count } => self.conn.execute(
                r#"
                UPDATE uploads SET
                    status = ?2,
                    processed_count = ?3,
                    error_message = NULL,
                    updated_at = datetime('now')
                WHERE id = ?1
                "#,
                params![id, update.status().as_str(), sql_count(*processed_count)],
            )?,
            UploadUpdate::Failed { error_message } => self.conn.execute(
                r#"
                UPDATE uploads SET
                    status = ?2,
                    error_message = ?3,
                    updated_at = datetime('now')
                WHERE id = ?1
                "#,
                params![id, update.status().as_str(), error_message],
            )?,
        };

        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("upload {}", id)));
        }
        Ok(())
    }

    /// Get an upload by id.
    pub fn get_upload(&self, id: &str) -> DbResult<Option<Upload>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, filename, health_center, month, row_count, processed_count,
                       status, error_message, content_hash, created_at, updated_at
                FROM uploads
                WHERE id = ?
                "#,
                [id],
                |row| {
                    Ok(UploadRow {
                        id: row.get(0)?,
                        filename: row.get(1)?,
                        health_center: row.get(2)?,
                        month: row.get(3)?,
                        row_count: row.get(4)?,
                        processed_count: row.get(5)?,
                        status: row.get(6)?,
                        error_message: row.get(7)?,
                        content_hash: row.get(8)?,
                        created_at: row.get(9)?,
                        updated_at: row.get(10)?,
                    })
                },
            )
            .optional()?;

        row.map(Upload::try_from).transpose()
    }
}

/// Intermediate row struct for database mapping.
struct UploadRow {
    id: String,
    filename: String,
    health_center: String,
    month: String,
    row_count: i64,
    processed_count: i64,
    status: String,
    error_message: Option<String>,
    content_hash: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<UploadRow> for Upload {
    type Error = DbError;

    fn try_from(row: UploadRow) -> Result<Self, Self::Error> {
        let status = UploadStatus::parse(&row.status)
            .ok_or_else(|| DbError::InvalidData(format!("upload status '{}'", row.status)))?;

        Ok(Upload {
            id: row.id,
            filename: row.filename,
            health_center: row.health_center,
            month: row.month,
            row_count: row.row_count.max(0) as u64,
            processed_count: row.processed_count.max(0) as u64,
            status,
            error_message: row.error_message,
            content_hash: row.content_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
