//! SnapSum - Desktop client for an OCR and summarization job server
//!
//! Picks an image from disk, the clipboard or a drop, uploads it and
//! follows the job's progress stream until the result text arrives.

mod app;
mod client;
mod clipboard;
mod config;
mod dashboard;
mod headless;
mod job;
mod shared;
mod storage;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::job::ImageUpload;
use crate::shared::{ImageSource, SharedAppState};

/// SnapSum - image OCR and summary client
#[derive(Parser, Debug)]
#[command(name = "snapsum")]
#[command(about = "Upload an image to a job server and follow OCR and summary progress")]
struct Args {
    /// Job server base URL (overrides config and SNAPSUM_SERVER)
    #[arg(short, long)]
    server: Option<String>,

    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Submit this image without opening a window and print the result
    #[arg(long, value_name = "IMAGE")]
    submit: Option<PathBuf>,

    /// Preselect this image in the dashboard
    #[arg(long, value_name = "IMAGE", conflicts_with = "submit")]
    image: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG takes precedence over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("snapsum={default_level},warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let config_path = match args.config {
        Some(path) => Some(path),
        None => storage::default_config_path()
            .inspect_err(|e| warn!("No config directory available: {:#}", e))
            .ok(),
    };

    let mut config = load_or_create_config(config_path.as_deref());
    config.apply_env_overrides();
    if let Some(server) = args.server {
        config.server.base_url = server;
    }
    info!("Job server: {}", config.server.base_url);

    if let Some(path) = args.submit {
        return headless::run_headless(config, &path);
    }

    info!("SnapSum starting...");

    // Create shared state
    let shared_state = Arc::new(RwLock::new(SharedAppState::new(config)));

    if let Some(path) = args.image {
        let upload = ImageUpload::from_path(&path)
            .with_context(|| format!("Cannot preselect {}", path.display()))?;
        shared_state.write().select_image(upload, ImageSource::File(path));
    }

    // Run the dashboard (blocking)
    if let Err(e) = dashboard::run_dashboard(shared_state, config_path) {
        tracing::error!("Dashboard error: {}", e);
    }

    info!("SnapSum shutdown complete");

    Ok(())
}

/// Load configuration from file or create default
fn load_or_create_config(path: Option<&Path>) -> AppConfig {
    if let Some(config_path) = path {
        if config_path.exists() {
            match config::load_config(config_path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", config_path);
                    return config;
                }
                Err(e) => warn!("Ignoring unreadable configuration: {:#}", e),
            }
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}
