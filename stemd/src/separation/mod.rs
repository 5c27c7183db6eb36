//! Separation model loading, caching and inference

pub mod error;
pub mod model;
pub mod registry;

pub use error::SeparationError;
pub use model::{ModelLoader, OrtLoader, SeparationModel};
pub use registry::ModelRegistry;
