//! Model catalog endpoint

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::models::catalog;
use crate::AppState;

/// One catalog entry as presented to clients
#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub name: &'static str,
    pub description: &'static str,
    /// Stem count for this variant
    pub stems: usize,
    pub recommended: bool,
}

/// GET /api/models
///
/// Static catalog; no I/O and no model loading.
pub async fn list_models() -> Json<Vec<ModelInfo>> {
    Json(
        catalog::VARIANTS
            .iter()
            .map(|v| ModelInfo {
                name: v.name,
                description: v.description,
                stems: v.stem_count(),
                recommended: v.recommended,
            })
            .collect(),
    )
}

/// Build model catalog routes
pub fn model_routes() -> Router<AppState> {
    Router::new().route("/api/models", get(list_models))
}
