//! HTTP front end for the MediSync import pipeline.
//!
//! Exposes the two upload endpoints plus read-only upload status, inventory
//! and timeseries queries. All state is one SQLite connection behind a mutex.

pub mod config;
pub mod error;
pub mod handlers;

use std::sync::{Arc, Mutex};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use medisync_core::config::ConfigResult;
use medisync_core::{Database, LabelNormalizer};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<ServerConfig>,
    /// Compiled once from `config.import.vocabulary`
    pub normalizer: LabelNormalizer,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> ConfigResult<Self> {
        let normalizer = LabelNormalizer::from_vocabulary(&config.import.vocabulary)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
            normalizer,
        })
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route(
            "/api/upload-medicine-stocks",
            post(handlers::upload_medicine_stocks),
        )
        .route(
            "/api/upload-medicine-image",
            post(handlers::upload_medicine_image),
        )
        .route("/api/uploads/:id", get(handlers::get_upload))
        .route(
            "/api/uploads/:id/inventory",
            get(handlers::get_upload_inventory),
        )
        .route("/api/inventory", get(handlers::list_inventory))
        .route("/api/inventory/export", get(handlers::export_inventory))
        .route("/api/timeseries", get(handlers::list_timeseries))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
