//! Separation error types

use thiserror::Error;

/// Errors from model resolution and inference
#[derive(Debug, Error)]
pub enum SeparationError {
    /// Name is not in the catalog
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// Catalog knows the name but the weights are not on disk
    #[error("model file not found: {0}")]
    ModelNotFound(String),

    #[error("model load failed: {0}")]
    LoadFailed(String),

    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// The model produced something other than [1, stems, channels, samples]
    #[error("model {model} returned unexpected output shape {shape:?}")]
    OutputShape { model: String, shape: Vec<i64> },
}
