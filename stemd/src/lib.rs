//! stemd library interface
//!
//! Exposes the application state and router for integration testing.

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod models;
pub mod separation;
pub mod store;
pub mod worker;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::separation::ModelRegistry;
use crate::store::JobStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Process-wide job table
    pub jobs: Arc<JobStore>,
    /// Shared model cache
    pub registry: Arc<ModelRegistry>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, registry: ModelRegistry) -> Self {
        Self {
            config: Arc::new(config),
            jobs: Arc::new(JobStore::new()),
            registry: Arc::new(registry),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.max_upload_bytes();
    let output_root = state.config.output_root.clone();

    Router::new()
        .merge(api::job_routes())
        .merge(api::model_routes())
        .merge(api::health_routes())
        // Default-root outputs are directly servable; custom-directory
        // jobs live outside this tree and are reachable only via the
        // download endpoint.
        .nest_service("/static/outputs", ServeDir::new(output_root))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
