//! Configuration resolution for stemd
//!
//! Per-field priority: command-line argument (highest) → environment
//! variable (`STEMD_*`, handled by clap) → TOML config file → compiled
//! default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::info;

/// Command-line interface
#[derive(Debug, Parser)]
#[command(name = "stemd", about = "Audio stem-separation service")]
pub struct Cli {
    /// Port to listen on
    #[arg(long, env = "STEMD_PORT")]
    pub port: Option<u16>,

    /// Root directory for default job outputs
    #[arg(long, env = "STEMD_OUTPUT_ROOT")]
    pub output_root: Option<PathBuf>,

    /// Directory holding the ONNX model files
    #[arg(long, env = "STEMD_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Maximum accepted upload size in MiB
    #[arg(long, env = "STEMD_MAX_UPLOAD_MB")]
    pub max_upload_mb: Option<usize>,

    /// Path to a TOML config file (default: ~/.config/stemd/config.toml)
    #[arg(long, env = "STEMD_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Optional overrides from the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub port: Option<u16>,
    pub output_root: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    pub max_upload_mb: Option<usize>,
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Default output root; a job without a custom directory writes to
    /// `<output_root>/<job_id>/`
    pub output_root: PathBuf,
    /// Where `<model>.onnx` files live
    pub model_dir: PathBuf,
    pub max_upload_mb: usize,
}

impl Config {
    pub fn resolve(cli: Cli) -> Result<Self> {
        let toml = load_toml_config(cli.config.as_deref())?;

        Ok(Self {
            port: cli.port.or(toml.port).unwrap_or(8080),
            output_root: cli
                .output_root
                .or(toml.output_root)
                .unwrap_or_else(|| PathBuf::from("static/outputs")),
            model_dir: cli
                .model_dir
                .or(toml.model_dir)
                .unwrap_or_else(default_model_dir),
            max_upload_mb: cli.max_upload_mb.or(toml.max_upload_mb).unwrap_or(500),
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

fn load_toml_config(explicit: Option<&std::path::Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let Some(dir) = dirs::config_dir() else {
                return Ok(TomlConfig::default());
            };
            let path = dir.join("stemd").join("config.toml");
            if !path.exists() {
                return Ok(TomlConfig::default());
            }
            path
        }
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    info!(path = %path.display(), "loaded TOML config");
    Ok(config)
}

/// Default model cache location: `<os cache dir>/stemd/models`
fn default_model_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("stemd").join("models"))
        .unwrap_or_else(|| PathBuf::from("models"))
}
