//! Upload bookkeeping models.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Status of one batch import.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Processing,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Processing => "processing",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(UploadStatus::Processing),
            "completed" => Some(UploadStatus::Completed),
            "failed" => Some(UploadStatus::Failed),
            _ => None,
        }
    }
}

/// Stored upload record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Upload {
    /// UUID generated when the upload is created
    pub id: String,
    pub filename: String,
    pub health_center: String,
    /// "YYYY-MM" period the upload was filed under
    pub month: String,
    /// Rows in the decoded file (or entries in a manual submission)
    pub row_count: u64,
    /// Records written (or expected to be written while processing)
    pub processed_count: u64,
    pub status: UploadStatus,
    /// Store error text when status is `Failed`
    pub error_message: Option<String>,
    /// SHA-256 of the uploaded bytes
    pub content_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields supplied when an upload starts.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUpload {
    pub filename: String,
    pub health_center: String,
    pub month: String,
    pub row_count: u64,
    pub processed_count: u64,
    pub content_hash: String,
}

impl NewUpload {
    /// Build a new upload, hashing the file contents for the audit trail.
    pub fn new(
        filename: &str,
        contents: &[u8],
        health_center: &str,
        month: &str,
        row_count: u64,
        processed_count: u64,
    ) -> Self {
        Self {
            filename: filename.to_string(),
            health_center: health_center.to_string(),
            month: month.to_string(),
            row_count,
            processed_count,
            content_hash: content_hash(contents),
        }
    }
}

/// Status transition applied to an existing upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadUpdate {
    Completed { processed_count: u64 },
    Failed { error_message: String },
}

impl UploadUpdate {
    pub fn status(&self) -> UploadStatus {
        match self {
            UploadUpdate::Completed { .. } => UploadStatus::Completed,
            UploadUpdate::Failed { .. } => UploadStatus::Failed,
        }
    }
}

/// Hex-encoded SHA-256 of the given bytes.
pub fn content_hash(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    hex::encode(hasher.finalize())
}
