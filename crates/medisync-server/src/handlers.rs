//! HTTP handlers.
//!
//! Import work is synchronous and touches SQLite, so every handler hands it to
//! `spawn_blocking` and holds the database lock only inside that task.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use medisync_core::parser::is_month_year;
use medisync_core::{
    Database, FileImport, ImportResult, ImportSummary, Importer, InventoryExporter, ManualImport,
    ManualOutcome, MedicineRecord, TimeseriesPoint, Upload, UploadedFile,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::AppState;

/// Successful import response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub upload_id: String,
    pub processed_rows: usize,
    pub total_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_medicines: Option<usize>,
    pub health_center: String,
    pub month: String,
    pub message: String,
}

impl From<ImportSummary> for UploadResponse {
    fn from(summary: ImportSummary) -> Self {
        Self {
            success: true,
            upload_id: summary.upload_id,
            processed_rows: summary.processed_rows,
            total_rows: summary.total_rows,
            unique_medicines: summary.unique_medicines,
            health_center: summary.health_center,
            month: summary.month,
            message: summary.message,
        }
    }
}

/// Response when an image arrives without entered lines.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntryResponse {
    pub success: bool,
    pub needs_manual_entry: bool,
    pub image_preview: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ImageUploadResponse {
    Imported(UploadResponse),
    NeedsManualEntry(ManualEntryResponse),
}

impl From<ManualOutcome> for ImageUploadResponse {
    fn from(outcome: ManualOutcome) -> Self {
        match outcome {
            ManualOutcome::Imported(summary) => ImageUploadResponse::Imported(summary.into()),
            ManualOutcome::NeedsManualEntry {
                image_preview,
                message,
            } => ImageUploadResponse::NeedsManualEntry(ManualEntryResponse {
                success: true,
                needs_manual_entry: true,
                image_preview,
                message,
            }),
        }
    }
}

/// Multipart fields shared by both upload endpoints.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    month: String,
    year: String,
    records: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    tracing::warn!("Failed to read upload bytes: {e}");
                    ApiError::BadRequest("Failed to read file data.".into())
                })?;

                // browsers send an empty part when no file was chosen
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "month" | "year" | "records" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid form field {}: {}", name, e)))?;
                match name.as_str() {
                    "month" => form.month = value,
                    "year" => form.year = value,
                    _ => form.records = Some(value),
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Run an import on the blocking pool with the shared database.
async fn with_importer<T, F>(state: &AppState, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Importer<'_, Database>) -> ImportResult<T> + Send + 'static,
{
    let db = state.db.clone();
    let config = state.config.import.clone();
    let normalizer = state.normalizer.clone();

    tokio::task::spawn_blocking(move || {
        let db = db
            .lock()
            .map_err(|_| ApiError::Internal("Database lock poisoned".into()))?;
        let importer = Importer::with_normalizer(&*db, config, normalizer);
        work(&importer).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Import task failed: {}", e)))?
}

/// Run a read-only query on the blocking pool.
async fn with_db<T, F>(state: &AppState, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        let db = db
            .lock()
            .map_err(|_| ApiError::Internal("Database lock poisoned".into()))?;
        work(&db)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Query task failed: {}", e)))?
}

/// POST /api/upload-medicine-stocks
pub async fn upload_medicine_stocks(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = read_form(multipart).await?;
    let request = FileImport {
        file: form.file,
        month: form.month,
        year: form.year,
    };

    let summary = with_importer(&state, move |importer| importer.import_file(request)).await?;
    Ok(Json(summary.into()))
}

/// POST /api/upload-medicine-image
pub async fn upload_medicine_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImageUploadResponse>, ApiError> {
    let form = read_form(multipart).await?;
    let request = ManualImport {
        file: form.file,
        month: form.month,
        year: form.year,
        records: form.records,
    };

    let outcome = with_importer(&state, move |importer| importer.import_manual(request)).await?;
    Ok(Json(outcome.into()))
}

/// GET /api/uploads/:id
pub async fn get_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Upload>, ApiError> {
    let upload = with_db(&state, move |db| {
        db.get_upload(&id)?
            .ok_or_else(|| ApiError::NotFound(format!("Upload {} not found", id)))
    })
    .await?;
    Ok(Json(upload))
}

/// GET /api/uploads/:id/inventory
pub async fn get_upload_inventory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MedicineRecord>>, ApiError> {
    let records = with_db(&state, move |db| {
        if db.get_upload(&id)?.is_none() {
            return Err(ApiError::NotFound(format!("Upload {} not found", id)));
        }
        Ok(db.list_upload_inventory(&id)?)
    })
    .await?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    pub month_year: Option<String>,
    pub format: Option<String>,
}

impl InventoryQuery {
    /// The requested "YYYY-MM" period, if any.
    fn period(&self) -> Result<Option<String>, ApiError> {
        let Some(period) = self
            .month_year
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
        else {
            return Ok(None);
        };

        if !is_month_year(period) {
            return Err(ApiError::BadRequest(
                "month_year must be in YYYY-MM format".into(),
            ));
        }
        Ok(Some(period.to_string()))
    }
}

/// GET /api/inventory
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryQuery>,
) -> Result<Response, ApiError> {
    let threshold = state.config.import.low_stock_threshold;
    let period = query.period()?;

    let export = with_db(&state, move |db| {
        Ok(InventoryExporter::new(db, threshold).export(period.as_deref())?)
    })
    .await?;
    Ok(Json(export).into_response())
}

/// GET /api/inventory/export
pub async fn export_inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryQuery>,
) -> Result<Response, ApiError> {
    let format = query
        .format
        .as_deref()
        .unwrap_or("csv")
        .trim()
        .to_lowercase();
    if format != "csv" && format != "json" {
        return Err(ApiError::BadRequest(format!(
            "Unsupported export format: {}. Use csv or json.",
            format
        )));
    }

    let threshold = state.config.import.low_stock_threshold;
    let period = query.period()?;
    let filename = format!(
        "inventory-{}.{}",
        period.as_deref().unwrap_or("all"),
        format
    );

    let export = with_db(&state, move |db| {
        Ok(InventoryExporter::new(db, threshold).export(period.as_deref())?)
    })
    .await?;

    let (content_type, body) = if format == "csv" {
        let csv = export
            .to_csv()
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        ("text/csv; charset=utf-8", csv)
    } else {
        let json = export
            .to_json()
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        ("application/json", json)
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct TimeseriesQuery {
    /// Base name filter, case-insensitive
    pub medicine: Option<String>,
}

/// GET /api/timeseries
pub async fn list_timeseries(
    State(state): State<AppState>,
    Query(query): Query<TimeseriesQuery>,
) -> Result<Json<Vec<TimeseriesPoint>>, ApiError> {
    let medicine = query
        .medicine
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    let points = with_db(&state, move |db| Ok(db.list_timeseries(medicine.as_deref())?)).await?;
    Ok(Json(points))
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
