use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use censordle_core::{publisher, FileStore};
use tracing::{info, warn};

/// Publish scraped movie records into the document store.
#[derive(Parser)]
#[command(name = "censordle-publish")]
#[command(about = "Upsert scraped movies and rebuild the title mapping", long_about = None)]
struct Cli {
    /// Directory of scraped JSON records
    input: PathBuf,

    /// Store directory (defaults to the configured store_root)
    #[arg(short, long)]
    store: Option<PathBuf>,
}

fn main() -> Result<()> {
    censordle_pipeline::init_logging();
    let cli = Cli::parse();
    if !cli.input.is_dir() {
        return Err(anyhow!(
            "input directory {} does not exist",
            cli.input.display()
        ));
    }

    let config = censordle_pipeline::load_config()?;
    let store = FileStore::new(cli.store.unwrap_or(config.store_root));
    let report = publisher::publish_dir(&store, &cli.input)?;

    if report.failed > 0 {
        warn!(failed = report.failed, "some movies were not published");
    }
    info!(
        published = report.published,
        titles = report.mapping_size,
        duplicates = report.duplicates.len(),
        store = %store.root().display(),
        "database population completed"
    );
    Ok(())
}
