use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use censordle_core::extractor::{read_title_lists, AdvisoryExtractor};
use tracing::{info, warn};

/// Scrape parental guides into JSON records ready for publishing.
#[derive(Parser)]
#[command(name = "censordle-scrape")]
#[command(about = "Scrape parental-guide advisories for movies", long_about = None)]
struct Cli {
    /// Movie identifier (e.g. tt0078748) or exact title
    #[arg(required_unless_present = "titles_dir")]
    movie: Option<String>,

    /// Scrape every title listed in the *.txt files of this directory
    #[arg(long, conflicts_with = "movie")]
    titles_dir: Option<PathBuf>,

    /// Directory to write records to (defaults to the configured scrape_dir)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    censordle_pipeline::init_logging();
    let cli = Cli::parse();
    let config = censordle_pipeline::load_config()?;
    let extractor = AdvisoryExtractor::new(&config)?;
    let out_dir = cli.out.unwrap_or_else(|| config.scrape_dir.clone());

    if let Some(dir) = cli.titles_dir {
        let titles = read_title_lists(&dir)?;
        if titles.is_empty() {
            return Err(anyhow!("no movie titles found in {}", dir.display()));
        }
        info!(count = titles.len(), "found movie titles in the input directory");

        let summary = extractor.scrape_titles(&titles, &out_dir).await;
        for title in &summary.failed {
            warn!(title = %title, "not scraped");
        }
        if summary.saved.is_empty() {
            return Err(anyhow!("none of the {} titles could be scraped", titles.len()));
        }
        return Ok(());
    }

    let target = cli
        .movie
        .ok_or_else(|| anyhow!("a movie identifier or title is required"))?;
    let path = extractor.scrape_one(&target, &out_dir).await?;
    println!("{}", path.display());
    Ok(())
}
