//! Separation worker: runs one job end-to-end
//!
//! Each submitted job gets its own background task. The pipeline itself
//! (decode, inference, encode) is blocking work and runs on the blocking
//! thread pool; job-record updates go through the store so pollers always
//! see a consistent record.
//!
//! Stages advance strictly forward with fixed progress marks:
//! loading_model 10 → loading_audio 20 → separating_stems 30 →
//! saving_stems 70 → completed 100. A failure at any stage records the
//! message and freezes progress where it was.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::audio;
use crate::models::{JobStatus, StemFile};
use crate::separation::ModelRegistry;
use crate::store::JobStore;

/// Dispatch a job onto a background task. Returns immediately; the
/// outcome lands in the job record.
pub fn spawn_job(store: Arc<JobStore>, registry: Arc<ModelRegistry>, job_id: Uuid) {
    tokio::spawn(async move {
        info!(job_id = %job_id, "separation job task started");

        let result = {
            let store = Arc::clone(&store);
            let registry = Arc::clone(&registry);
            tokio::task::spawn_blocking(move || run_pipeline(&store, &registry, job_id)).await
        };

        match result {
            Ok(Ok(())) => {
                info!(job_id = %job_id, "separation job completed");
            }
            Ok(Err(e)) => {
                error!(job_id = %job_id, error = %e, "separation job failed");
                store.update(job_id, |job| job.fail(format!("{e:#}")));
            }
            Err(e) => {
                // The blocking task itself died (panic or cancellation).
                error!(job_id = %job_id, error = %e, "separation pipeline aborted");
                store.update(job_id, |job| job.fail("internal pipeline failure".into()));
            }
        }
    });
}

/// The five-stage pipeline. Any error propagates out and is recorded on
/// the job by the caller; progress stays at the failing stage's mark.
fn run_pipeline(store: &JobStore, registry: &ModelRegistry, job_id: Uuid) -> Result<()> {
    let job = store.get(job_id).context("job record missing")?;
    let input_path = job.input_path.clone().context("job has no input file")?;

    store.update(job_id, |j| j.advance(JobStatus::LoadingModel, 10));
    let model = registry.get(&job.model)?;
    let variant = model.variant();

    store.update(job_id, |j| j.advance(JobStatus::LoadingAudio, 20));
    let waveform = audio::decode::decode(&input_path)?;
    debug!(
        job_id = %job_id,
        channels = waveform.channels(),
        samples = waveform.samples(),
        "input decoded"
    );
    // The model expects batched input even for single-file jobs.
    let mix = waveform.batched();

    store.update(job_id, |j| j.advance(JobStatus::SeparatingStems, 30));
    let separated = model.separate(mix.view())?;

    store.update(job_id, |j| j.advance(JobStatus::SavingStems, 70));
    std::fs::create_dir_all(&job.output_dir).with_context(|| {
        format!("failed to create output directory {}", job.output_dir.display())
    })?;

    let mut stems = Vec::with_capacity(separated.len());
    for (name, stem) in variant.stems.iter().zip(&separated) {
        let file = format!("{name}.wav");
        let path = job.output_dir.join(&file);
        audio::encode::save_stem(stem.view(), &path, waveform.sample_rate())?;
        debug!(job_id = %job_id, stem = name, path = %path.display(), "stem written");
        stems.push(StemFile {
            name: (*name).to_string(),
            file,
            path,
        });
    }

    store.update(job_id, |j| j.complete(stems));
    Ok(())
}
