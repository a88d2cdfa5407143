//! Shared setup for the offline pipeline binaries.

use anyhow::Result;
use censordle_core::{config, AppConfig};
use tracing_subscriber::EnvFilter;

/// Initialise compact stderr logging, defaulting to `info`.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}

/// Make sure a config file exists, then load it.
pub fn load_config() -> Result<AppConfig> {
    config::ensure_default_config()?;
    AppConfig::load()
}
