//! Application configuration.
//!
//! Values are layered: built-in defaults, then `~/.config/censordle/config.toml`,
//! then `CENSORDLE_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory under the user's config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "censordle";
/// Prefix for environment overrides, e.g. `CENSORDLE_STORE_ROOT`.
pub const ENV_PREFIX: &str = "CENSORDLE";

const DEFAULT_CONFIG: &str = r#"# Censordle configuration.
# Every key is optional; environment variables prefixed with CENSORDLE_ win.

# Directory holding the published document store.
# store_root = "/path/to/store"

# Directory scraped movie records are written to and published from.
# scrape_dir = "/path/to/scraped"

# Random draws the client makes before giving up on finding a playable movie.
# max_selection_attempts = 50

# imdb_base_url = "https://www.imdb.com"
# request_timeout_secs = 30

# Pause between movies when scraping a batch of titles.
# request_delay_ms = 1000
"#;

/// Runtime settings shared by the client and the pipeline tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Root directory of the file-backed document store.
    pub store_root: PathBuf,
    /// Directory scraped records are saved to.
    pub scrape_dir: PathBuf,
    /// Upper bound on random draws during movie selection.
    pub max_selection_attempts: usize,
    /// Base URL of the movie database.
    pub imdb_base_url: String,
    /// User agent sent with scrape requests.
    pub user_agent: String,
    /// HTTP timeout for scrape requests.
    pub request_timeout_secs: u64,
    /// Pause between consecutive movies in a batch scrape.
    pub request_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_root = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR);
        Self {
            store_root: data_root.join("store"),
            scrape_dir: data_root.join("scraped"),
            max_selection_attempts: 50,
            imdb_base_url: "https://www.imdb.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            request_timeout_secs: 30,
            request_delay_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_layered(Some(&config_path()), ENV_PREFIX)
    }

    /// Load configuration from an explicit file, still honouring the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_layered(Some(path.as_ref()), ENV_PREFIX)
    }

    fn load_layered(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(false));
        }
        let settings = builder
            .add_source(Environment::with_prefix(env_prefix).try_parsing(true))
            .build()
            .context("failed to assemble configuration")?;
        let mut config: AppConfig = settings
            .try_deserialize()
            .context("failed to deserialize configuration")?;
        if config.max_selection_attempts == 0 {
            config.max_selection_attempts = 1;
        }
        Ok(config)
    }
}

/// Location of the user configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join("config.toml")
}

/// Write a commented default configuration file if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(config_path())
}

fn write_default_config(path: PathBuf) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(&path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(())
}
