//! Model registry: per-name cache of loaded model handles
//!
//! Loading is expensive (weight materialization, session build), so
//! handles are cached for the process lifetime. Load-and-insert is
//! guarded by a per-name gate: concurrent cold starts for the same
//! variant pay the load exactly once, while distinct variants load
//! concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::{ModelLoader, SeparationError, SeparationModel};
use crate::models::catalog;

pub struct ModelRegistry {
    loader: Box<dyn ModelLoader>,
    cache: Mutex<HashMap<&'static str, Arc<dyn SeparationModel>>>,
    gates: Mutex<HashMap<&'static str, Arc<Mutex<()>>>>,
}

impl ModelRegistry {
    pub fn new(loader: Box<dyn ModelLoader>) -> Self {
        Self {
            loader,
            cache: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a model by name, loading it on first request.
    pub fn get(&self, name: &str) -> Result<Arc<dyn SeparationModel>, SeparationError> {
        let variant = catalog::find(name)
            .ok_or_else(|| SeparationError::UnknownModel(name.to_string()))?;

        if let Some(model) = self.cache.lock().unwrap().get(variant.name) {
            debug!(model = variant.name, "model cache hit");
            return Ok(Arc::clone(model));
        }

        // Serialize the load per name; whoever wins populates the cache.
        let gate = Arc::clone(
            self.gates
                .lock()
                .unwrap()
                .entry(variant.name)
                .or_default(),
        );
        let _loading = gate.lock().unwrap();

        if let Some(model) = self.cache.lock().unwrap().get(variant.name) {
            // Another task finished the load while we waited on the gate.
            return Ok(Arc::clone(model));
        }

        let model = self.loader.load(variant)?;
        self.cache
            .lock()
            .unwrap()
            .insert(variant.name, Arc::clone(&model));
        Ok(model)
    }
}
