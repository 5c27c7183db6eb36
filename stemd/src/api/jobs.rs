//! Job API handlers
//!
//! POST /api/upload, GET /api/status/{job_id},
//! GET /api/download/{job_id}/{stem_name}

use axum::{
    body::{Body, Bytes},
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{catalog, Job, JobStatus},
    worker, AppState,
};

/// Upload extensions accepted for separation
const ALLOWED_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "m4a", "aac", "ogg"];

/// POST /api/upload response
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
}

/// POST /api/upload
///
/// Multipart fields: `audio_file` (required), `model` (optional, default
/// htdemucs), `output_directory` (optional). Validates everything before
/// any job state exists, persists the upload to a per-job scratch
/// directory, then dispatches the worker and returns immediately.
pub async fn submit_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    let mut file_bytes: Option<Bytes> = None;
    let mut filename: Option<String> = None;
    let mut model = catalog::DEFAULT_MODEL.to_string();
    let mut custom_output_dir = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("audio_file") => {
                filename = field.file_name().map(str::to_string);
                file_bytes = Some(field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("failed to read audio file field: {e}"))
                })?);
            }
            Some("model") => {
                model = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("failed to read model field: {e}"))
                })?;
            }
            Some("output_directory") => {
                custom_output_dir = field
                    .text()
                    .await
                    .map_err(|e| {
                        ApiError::BadRequest(format!(
                            "failed to read output_directory field: {e}"
                        ))
                    })?
                    .trim()
                    .to_string();
            }
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or_else(|| ApiError::BadRequest("no audio file provided".into()))?;
    let filename = filename
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::BadRequest("no file selected".into()))?;

    let extension = std::path::Path::new(&filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::BadRequest(format!(
            "unsupported file type: .{extension}"
        )));
    }
    if catalog::find(&model).is_none() {
        return Err(ApiError::BadRequest(format!("unknown model: {model}")));
    }

    let job_id = Uuid::new_v4();

    // Custom directories must exist at submission time; the job id is
    // always appended so two jobs never share an output directory.
    let output_dir = if !custom_output_dir.is_empty()
        && std::path::Path::new(&custom_output_dir).is_dir()
    {
        PathBuf::from(&custom_output_dir).join(format!("stems_{job_id}"))
    } else {
        state.config.output_root.join(job_id.to_string())
    };

    // Validation passed; allocate scratch space and persist the upload
    // before the job record exists, so a failure here leaves no record.
    let temp_dir = tempfile::Builder::new()
        .prefix("stemd-")
        .tempdir()
        .map_err(ApiError::Io)?
        .keep();
    let input_path = temp_dir.join(format!("input.{extension}"));
    if let Err(e) = tokio::fs::write(&input_path, &bytes).await {
        let _ = std::fs::remove_dir_all(&temp_dir);
        return Err(ApiError::Io(e));
    }

    let job = Job::new(
        job_id,
        filename.clone(),
        model.clone(),
        temp_dir,
        input_path,
        output_dir,
    );
    state.jobs.insert(job);
    worker::spawn_job(
        Arc::clone(&state.jobs),
        Arc::clone(&state.registry),
        job_id,
    );

    info!(job_id = %job_id, model = %model, filename = %filename, "separation job queued");

    Ok(Json(SubmitResponse {
        job_id,
        status: JobStatus::Queued,
        message: "file uploaded, separation started".to_string(),
    }))
}

/// GET /api/status/{job_id}
///
/// Full job record, or 404. The first observation of a terminal job
/// reclaims its scratch space; later observations are no-ops.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    let job = state
        .jobs
        .get(job_id)
        .ok_or_else(|| ApiError::NotFound(format!("job not found: {job_id}")))?;

    let job = if job.is_terminal() {
        state.jobs.sweep_terminal(job_id).unwrap_or(job)
    } else {
        job
    };

    Ok(Json(job))
}

/// GET /api/download/{job_id}/{stem_name}
///
/// Streams one stem of a completed job, suggesting
/// `{original_filename}_{stem}.wav` as the download name.
pub async fn download_stem(
    State(state): State<AppState>,
    Path((job_id, stem_name)): Path<(Uuid, String)>,
) -> ApiResult<Response> {
    let job = state
        .jobs
        .get(job_id)
        .ok_or_else(|| ApiError::NotFound(format!("job not found: {job_id}")))?;

    if job.status != JobStatus::Completed {
        return Err(ApiError::BadRequest("job not completed".to_string()));
    }

    let stem = job
        .find_stem(&stem_name)
        .ok_or_else(|| ApiError::NotFound(format!("stem not found: {stem_name}")))?;

    let file = tokio::fs::File::open(&stem.path)
        .await
        .map_err(|_| ApiError::NotFound(format!("stem file missing: {}", stem.file)))?;
    let body = Body::from_stream(ReaderStream::new(file));

    let download_name = format!("{}_{}.wav", job.filename, stem.name);
    let headers = [
        (header::CONTENT_TYPE, "audio/wav".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{download_name}\""),
        ),
    ];

    Ok((headers, body).into_response())
}

/// Build job routes
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(submit_job))
        .route("/api/status/:job_id", get(job_status))
        .route("/api/download/:job_id/:stem_name", get(download_stem))
}
