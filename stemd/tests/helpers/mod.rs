//! Shared test helpers: synthetic separation models, fixture audio and
//! request plumbing for router-level tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::StatusCode;
use axum::Router;
use http::Request;
use ndarray::{Array2, ArrayView3, Axis};
use serde_json::Value;
use tempfile::TempDir;
use uuid::Uuid;

use stemd::config::Config;
use stemd::models::{Job, ModelVariant};
use stemd::separation::{ModelLoader, ModelRegistry, SeparationError, SeparationModel};
use stemd::AppState;

/// Synthetic model: each stem is the input mix scaled by 1/stem_count,
/// so stems sum back to the mix and every stem matches the input length.
pub struct TestModel {
    variant: &'static ModelVariant,
}

impl SeparationModel for TestModel {
    fn variant(&self) -> &'static ModelVariant {
        self.variant
    }

    fn separate(&self, mix: ArrayView3<'_, f32>) -> Result<Vec<Array2<f32>>, SeparationError> {
        let mix = mix.index_axis(Axis(0), 0).to_owned();
        let scale = 1.0 / self.variant.stems.len() as f32;
        Ok(self
            .variant
            .stems
            .iter()
            .map(|_| mix.mapv(|s| s * scale))
            .collect())
    }
}

/// Loader that counts how many times a model was actually materialized.
pub struct CountingLoader {
    pub loads: Arc<AtomicUsize>,
}

impl ModelLoader for CountingLoader {
    fn load(
        &self,
        variant: &'static ModelVariant,
    ) -> Result<Arc<dyn SeparationModel>, SeparationError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(TestModel { variant }))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub loads: Arc<AtomicUsize>,
    /// Keeps the output root alive for the test's duration
    pub dir: TempDir,
}

/// App state wired to the synthetic loader, with outputs in a temp dir.
pub fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let loads = Arc::new(AtomicUsize::new(0));
    let registry = ModelRegistry::new(Box::new(CountingLoader {
        loads: Arc::clone(&loads),
    }));
    let config = Config {
        port: 0,
        output_root: dir.path().join("outputs"),
        model_dir: dir.path().join("models"),
        max_upload_mb: 32,
    };
    TestApp {
        state: AppState::new(config, registry),
        loads,
        dir,
    }
}

/// In-memory WAV fixture: stereo-capable sine, 32-bit float.
pub fn wav_fixture(channels: u16, seconds: f32, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        let frames = (seconds * sample_rate as f32) as usize;
        for i in 0..frames {
            for ch in 0..channels {
                let s = (i as f32 * 0.01).sin() * 0.3;
                writer
                    .write_sample(if ch == 0 { s } else { -s })
                    .expect("write sample");
            }
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}

pub const BOUNDARY: &str = "stemd-test-boundary";

/// Build a multipart/form-data body for the upload endpoint.
pub fn multipart_body(
    filename: &str,
    bytes: &[u8],
    model: Option<&str>,
    output_directory: Option<&str>,
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"audio_file\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
    if let Some(model) = model {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"model\"\r\n\r\n{model}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(dir) = output_directory {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; \
                 name=\"output_directory\"\r\n\r\n{dir}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// GET a path and parse the JSON body (if any).
pub async fn get_json(app: &Router, path: &str) -> (StatusCode, Option<Value>) {
    use tower::ServiceExt;

    let request = Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(&bytes).ok()
    };
    (status, json)
}

/// GET a path and return the raw body plus the content-disposition header.
pub async fn get_raw(app: &Router, path: &str) -> (StatusCode, Vec<u8>, Option<String>) {
    use tower::ServiceExt;

    let request = Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let disposition = response
        .headers()
        .get(http::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, bytes.to_vec(), disposition)
}

/// POST a multipart body to the upload endpoint.
pub async fn post_multipart(app: &Router, path: &str, body: Vec<u8>) -> (StatusCode, Option<Value>) {
    use tower::ServiceExt;

    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(&bytes).ok()
    };
    (status, json)
}

/// Poll the status endpoint until the job is terminal.
pub async fn wait_terminal_api(app: &Router, job_id: &str) -> Value {
    for _ in 0..500 {
        let (status, body) = get_json(app, &format!("/api/status/{job_id}")).await;
        assert_eq!(status, StatusCode::OK);
        let body = body.expect("status body");
        let state = body["status"].as_str().expect("status field").to_string();
        if state == "completed" || state == "error" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job never reached a terminal state");
}

/// Poll the store directly until the job is terminal (does not trigger
/// the status endpoint's terminal sweep).
pub async fn wait_terminal_store(state: &AppState, job_id: Uuid) -> Job {
    for _ in 0..500 {
        let job = state.jobs.get(job_id).expect("job in store");
        if job.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job never reached a terminal state");
}
