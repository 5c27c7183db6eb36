//! Separation model trait and the ONNX Runtime implementation
//!
//! The model is an opaque collaborator: given a batched (1, channels,
//! samples) mix it returns one waveform per stem, all sharing the input's
//! length. The trait seam lets tests substitute a synthetic model, so the
//! orchestration layer can be exercised without real weights.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use ndarray::{Array2, ArrayView3};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use tracing::info;

use super::SeparationError;
use crate::models::ModelVariant;

/// A loaded, ready-to-run model variant
pub trait SeparationModel: Send + Sync {
    /// The variant this handle was loaded for; defines stem names/order.
    fn variant(&self) -> &'static ModelVariant;

    /// Separate a batched (1, channels, samples) mix into one
    /// (channels, samples) waveform per stem, in `variant().stems` order.
    fn separate(&self, mix: ArrayView3<'_, f32>) -> Result<Vec<Array2<f32>>, SeparationError>;
}

/// Materializes a model variant into a runnable handle
pub trait ModelLoader: Send + Sync {
    fn load(&self, variant: &'static ModelVariant)
        -> Result<Arc<dyn SeparationModel>, SeparationError>;
}

/// Loader backed by ONNX Runtime; weights live at `<model_dir>/<name>.onnx`
pub struct OrtLoader {
    model_dir: PathBuf,
    accelerated: bool,
}

impl OrtLoader {
    /// Probes for an accelerated execution provider once, at construction.
    /// Every model loaded through this loader shares that decision.
    pub fn new(model_dir: PathBuf) -> Self {
        let accelerated = probe_accelerator();
        info!(
            model_dir = %model_dir.display(),
            accelerated,
            "separation backend initialized"
        );
        Self {
            model_dir,
            accelerated,
        }
    }
}

/// Accelerated execution is a compile-time opt-in (`cuda` feature);
/// without it ONNX Runtime runs on general-purpose compute.
fn probe_accelerator() -> bool {
    cfg!(feature = "cuda")
}

impl ModelLoader for OrtLoader {
    fn load(
        &self,
        variant: &'static ModelVariant,
    ) -> Result<Arc<dyn SeparationModel>, SeparationError> {
        let path = self.model_dir.join(format!("{}.onnx", variant.name));
        if !path.exists() {
            return Err(SeparationError::ModelNotFound(path.display().to_string()));
        }

        info!(model = variant.name, path = %path.display(), "loading separation model");

        let mut builder = Session::builder()
            .map_err(|e| SeparationError::LoadFailed(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| SeparationError::LoadFailed(e.to_string()))?;

        #[cfg(feature = "cuda")]
        let mut builder = if self.accelerated {
            builder
                .with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default().build(),
                ])
                .map_err(|e| SeparationError::LoadFailed(e.to_string()))?
        } else {
            builder
        };
        #[cfg(not(feature = "cuda"))]
        let _ = self.accelerated;

        let session = builder
            .commit_from_file(&path)
            .map_err(|e| SeparationError::LoadFailed(format!("{}: {e}", path.display())))?;

        info!(model = variant.name, "separation model loaded");

        Ok(Arc::new(OrtModel {
            variant,
            session: Mutex::new(session),
        }))
    }
}

/// One loaded ONNX session
///
/// `Session::run` needs exclusive access, so concurrent jobs using the
/// same variant serialize on this mutex while distinct variants run
/// independently.
struct OrtModel {
    variant: &'static ModelVariant,
    session: Mutex<Session>,
}

impl SeparationModel for OrtModel {
    fn variant(&self) -> &'static ModelVariant {
        self.variant
    }

    fn separate(&self, mix: ArrayView3<'_, f32>) -> Result<Vec<Array2<f32>>, SeparationError> {
        let (_, channels, _) = mix.dim();
        let stems = self.variant.stems.len();

        let input = Tensor::from_array(mix.to_owned())
            .map_err(|e| SeparationError::InferenceFailed(format!("input tensor: {e}")))?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs!["input" => input])
            .map_err(|e| SeparationError::InferenceFailed(e.to_string()))?;

        let output = outputs
            .iter()
            .next()
            .ok_or_else(|| SeparationError::InferenceFailed("no output tensor".into()))?
            .1;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| SeparationError::InferenceFailed(format!("output tensor: {e}")))?;

        // Expected layout: [1, stems, channels, samples]
        let shape: Vec<i64> = shape.iter().copied().collect();
        if shape.len() != 4
            || shape[0] != 1
            || shape[1] != stems as i64
            || shape[2] != channels as i64
        {
            return Err(SeparationError::OutputShape {
                model: self.variant.name.to_string(),
                shape,
            });
        }
        let samples = shape[3] as usize;

        let mut separated = Vec::with_capacity(stems);
        for stem in 0..stems {
            let mut waveform = Array2::<f32>::zeros((channels, samples));
            for ch in 0..channels {
                let base = samples * (ch + channels * stem);
                for i in 0..samples {
                    waveform[[ch, i]] = data[base + i];
                }
            }
            separated.push(waveform);
        }

        Ok(separated)
    }
}
