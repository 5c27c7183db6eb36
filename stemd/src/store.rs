//! In-memory job table
//!
//! Process-wide mapping from job id to job record. Each record has one
//! writer (the worker that owns the job) and arbitrarily many readers
//! (status pollers); all access goes through this type so readers always
//! observe a record atomically.
//!
//! Uses std::sync::RwLock rather than tokio's: the worker pipeline runs on
//! a blocking thread, and both sides hold the lock only for the map
//! operation itself, never across I/O or an await point.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::Job;

/// Synchronized job table. Jobs are inserted at submission and never
/// deleted; only their scratch fields are reclaimed after completion.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly created job.
    pub fn insert(&self, job: Job) {
        self.jobs.write().unwrap().insert(job.id, job);
    }

    /// Snapshot of a job record.
    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().unwrap().get(&id).cloned()
    }

    /// Apply a mutation atomically with respect to concurrent reads.
    /// Returns false if the job id is unknown.
    pub fn update<F>(&self, id: Uuid, mutate: F) -> bool
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.jobs.write().unwrap();
        match jobs.get_mut(&id) {
            Some(job) => {
                mutate(job);
                true
            }
            None => false,
        }
    }

    /// Reclaim the scratch space of a terminal job: remove the temp
    /// directory from disk and clear the ephemeral fields. Idempotent —
    /// the first observation after completion pays the cost, later calls
    /// are no-ops. Non-terminal jobs are returned untouched.
    pub fn sweep_terminal(&self, id: Uuid) -> Option<Job> {
        let (snapshot, scratch) = {
            let mut jobs = self.jobs.write().unwrap();
            let job = jobs.get_mut(&id)?;
            if !job.is_terminal() {
                return Some(job.clone());
            }
            let scratch: Option<PathBuf> = job.temp_dir.take();
            job.input_path = None;
            (job.clone(), scratch)
        };

        // Filesystem work happens outside the lock.
        if let Some(dir) = scratch {
            debug!(job_id = %id, dir = %dir.display(), "removing job scratch directory");
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                warn!(job_id = %id, dir = %dir.display(), error = %e, "scratch cleanup failed");
            }
        }

        Some(snapshot)
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
