//! sonalyze-web library - audio upload analysis service
//!
//! Accepts `.mp3`/`.wav` uploads, computes descriptive metrics, renders a
//! PNG chart per metric and records every upload in SQLite.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sonalyze_common::config::RootFolderInitializer;
use sqlx::SqlitePool;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod analysis;
pub mod api;
pub mod charts;
pub mod config;
pub mod db;
pub mod error;
pub mod session;
pub mod utils;
pub mod validator;

pub use crate::error::{ApiError, ApiResult};

use analysis::{AnalysisError, AnalysisParameters, AnalysisPipeline};
use config::ServerSettings;
use session::SessionKey;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Root folder layout (uploads, charts)
    pub paths: RootFolderInitializer,
    /// Session cookie signing key (per process)
    pub session_key: SessionKey,
    pub settings: ServerSettings,
    pub pipeline: AnalysisPipeline,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create application state; fails when the analysis settings are invalid
    pub fn new(db: SqlitePool, settings: ServerSettings) -> Result<Self, AnalysisError> {
        let pipeline = AnalysisPipeline::new(AnalysisParameters {
            silence_threshold_db: settings.silence_threshold_db,
        })?;

        Ok(Self {
            db,
            paths: RootFolderInitializer::new(settings.root_folder.clone()),
            session_key: SessionKey::generate(),
            settings,
            pipeline,
            startup_time: Utc::now(),
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(state.paths.static_dir());
    let body_limit = state.settings.max_upload_bytes;

    Router::new()
        .merge(api::page_routes())
        .merge(api::auth_routes())
        .merge(api::upload_routes())
        .merge(api::history_routes())
        .merge(api::health_routes())
        .nest_service("/static", static_files)
        .fallback(api::pages::not_found_page)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
