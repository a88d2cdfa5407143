mod app;
mod block_font;

use std::{
    fs::{self, OpenOptions},
    sync::{Arc, Mutex},
};

use anyhow::Result;
use censordle_core::{
    config::{self, AppConfig},
    FileStore, SessionController,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    info!(
        store = %config.store_root.display(),
        max_attempts = config.max_selection_attempts,
        "starting censordle"
    );

    let store = FileStore::new(&config.store_root);
    let controller = SessionController::new(Arc::new(store), config.max_selection_attempts);
    let mut app = app::CensordleApp::new(controller);
    app.run().await
}

/// Log to `logs/censordle.log`; the terminal itself belongs to the UI.
fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("censordle.log"))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
