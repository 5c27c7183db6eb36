//! Separation job state machine
//!
//! A job progresses through five pipeline stages:
//! QUEUED → LOADING_MODEL → LOADING_AUDIO → SEPARATING_STEMS → SAVING_STEMS → COMPLETED
//!
//! A failure at any stage transitions directly to ERROR and halts the job.
//! Transitions are strictly forward; progress never decreases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Separation job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, waiting for the worker to pick it up
    Queued,
    /// Resolving the separation model (cache miss pays the load cost)
    LoadingModel,
    /// Decoding the uploaded file into a waveform
    LoadingAudio,
    /// Model inference
    SeparatingStems,
    /// Writing one WAV per stem to the output directory
    SavingStems,
    /// All stems written
    Completed,
    /// Failed at some stage; `Job::error` holds the message
    Error,
}

impl JobStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Pipeline ordering; later stages compare greater.
    fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::LoadingModel => 1,
            JobStatus::LoadingAudio => 2,
            JobStatus::SeparatingStems => 3,
            JobStatus::SavingStems => 4,
            JobStatus::Completed => 5,
            JobStatus::Error => 6,
        }
    }
}

/// One written stem file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StemFile {
    /// Stem name as defined by the model variant (e.g. "vocals")
    pub name: String,
    /// Filename relative to the job's output directory
    pub file: String,
    /// Absolute path on disk
    pub path: PathBuf,
}

/// One user-submitted separation request and its tracked lifecycle state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier, generated at submission, never reused
    pub id: Uuid,

    /// Original uploaded file name (for display and download naming)
    pub filename: String,

    /// Requested model variant
    pub model: String,

    /// Current pipeline stage
    pub status: JobStatus,

    /// Percentage complete (0-100), monotonically non-decreasing
    pub progress: u8,

    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Scratch directory holding the uploaded file; owned exclusively by
    /// this job until the first terminal-state observation sweeps it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,

    /// Uploaded file inside `temp_dir`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_path: Option<PathBuf>,

    /// Destination for stem files; always suffixed with the job id so no
    /// two jobs share an output directory
    pub output_dir: PathBuf,

    /// Written stems, populated only on success
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stems: Vec<StemFile>,

    /// Failure description, populated only on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    pub fn new(
        id: Uuid,
        filename: String,
        model: String,
        temp_dir: PathBuf,
        input_path: PathBuf,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            id,
            filename,
            model,
            status: JobStatus::Queued,
            progress: 0,
            created_at: Utc::now(),
            completed_at: None,
            temp_dir: Some(temp_dir),
            input_path: Some(input_path),
            output_dir,
            stems: Vec::new(),
            error: None,
        }
    }

    /// Advance to a later pipeline stage. Backward transitions and
    /// progress regressions are ignored.
    pub fn advance(&mut self, status: JobStatus, progress: u8) {
        if status.rank() <= self.status.rank() {
            return;
        }
        self.status = status;
        self.progress = self.progress.max(progress.min(100));
    }

    /// Mark completed with the written stems list.
    pub fn complete(&mut self, stems: Vec<StemFile>) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.completed_at = Some(Utc::now());
        self.stems = stems;
    }

    /// Mark failed. Progress stays at its last value so a poller can see
    /// which stage the pipeline died in.
    pub fn fail(&mut self, message: String) {
        self.status = JobStatus::Error;
        self.error = Some(message);
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn find_stem(&self, name: &str) -> Option<&StemFile> {
        self.stems.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(
            Uuid::new_v4(),
            "song.mp3".into(),
            "htdemucs".into(),
            PathBuf::from("/tmp/scratch"),
            PathBuf::from("/tmp/scratch/input.mp3"),
            PathBuf::from("/tmp/out"),
        )
    }

    #[test]
    fn status_never_regresses() {
        let mut j = job();
        j.advance(JobStatus::SeparatingStems, 30);
        j.advance(JobStatus::LoadingAudio, 20);
        assert_eq!(j.status, JobStatus::SeparatingStems);
        assert_eq!(j.progress, 30);
    }

    #[test]
    fn progress_is_monotone() {
        let mut j = job();
        j.advance(JobStatus::LoadingModel, 10);
        j.advance(JobStatus::LoadingAudio, 5);
        assert_eq!(j.progress, 10);
        j.advance(JobStatus::SeparatingStems, 30);
        assert_eq!(j.progress, 30);
    }

    #[test]
    fn failure_freezes_progress() {
        let mut j = job();
        j.advance(JobStatus::LoadingAudio, 20);
        j.fail("decode failed".into());
        assert_eq!(j.status, JobStatus::Error);
        assert_eq!(j.progress, 20);
        assert!(j.error.is_some());
        assert!(j.stems.is_empty());
    }

    #[test]
    fn completion_sets_terminal_fields() {
        let mut j = job();
        j.complete(vec![StemFile {
            name: "vocals".into(),
            file: "vocals.wav".into(),
            path: PathBuf::from("/tmp/out/vocals.wav"),
        }]);
        assert!(j.is_terminal());
        assert_eq!(j.progress, 100);
        assert!(j.completed_at.is_some());
        assert!(j.error.is_none());
    }

    #[test]
    fn terminal_state_accepts_no_advance() {
        let mut j = job();
        j.fail("boom".into());
        j.advance(JobStatus::SavingStems, 70);
        assert_eq!(j.status, JobStatus::Error);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::SeparatingStems).unwrap();
        assert_eq!(json, "\"separating_stems\"");
    }
}
