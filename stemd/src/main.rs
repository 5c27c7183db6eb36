//! stemd - Audio stem-separation service
//!
//! Accepts audio uploads over HTTP, runs a pretrained source-separation
//! model on a background task per job, and serves the resulting stems
//! while clients poll progress.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use stemd::config::{Cli, Config};
use stemd::separation::{ModelRegistry, OrtLoader};
use stemd::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::resolve(Cli::parse())?;

    info!("Starting stemd (stem separation service)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Bootstrap the default output root so stems are servable immediately
    std::fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "failed to create output root {}",
            config.output_root.display()
        )
    })?;
    info!("Output root: {}", config.output_root.display());
    info!("Model directory: {}", config.model_dir.display());

    let loader = OrtLoader::new(config.model_dir.clone());
    let registry = ModelRegistry::new(Box::new(loader));

    let port = config.port;
    let state = AppState::new(config, registry);
    let app = stemd::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{port}");

    axum::serve(listener, app).await?;

    Ok(())
}
