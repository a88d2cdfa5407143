//! Loads scraped records and publishes them to a document store.

use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::{
    models::{sanitize_component, Movie, TitleMapping},
    store::{DocumentStore, METADATA_COLLECTION, MOVIES_COLLECTION, TITLE_MAPPING_KEY},
};

/// Summary of a publish run.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    /// Movies written to the store.
    pub published: usize,
    /// Movies that failed validation or could not be written.
    pub failed: usize,
    /// Display keys that were seen more than once; later movies overwrote earlier ones.
    pub duplicates: Vec<String>,
    /// Entries in the published title mapping.
    pub mapping_size: usize,
    /// When the mapping document was written.
    pub published_at: DateTime<Utc>,
}

/// Stable store key: `{title}_{year}_{imdbID}` with punctuation replaced.
pub fn document_key(movie: &Movie) -> String {
    format!(
        "{}_{}_{}",
        sanitize_component(&movie.title),
        movie.year,
        movie.imdb_id
    )
}

/// Read every `*.json` movie record beneath `dir`, in path order.
///
/// Files that fail to parse are logged and skipped.
pub fn load_movies(dir: impl AsRef<Path>) -> Result<Vec<Movie>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(anyhow!("input directory {} does not exist", dir.display()));
    }

    let mut movies = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some("json")
        {
            continue;
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        match serde_json::from_str::<Movie>(&contents) {
            Ok(movie) => movies.push(movie),
            Err(err) => warn!("Skipping {}: {err}", path.display()),
        }
    }

    info!(count = movies.len(), dir = %dir.display(), "movie records loaded");
    Ok(movies)
}

/// Upsert every movie and then write the title mapping.
///
/// A single movie failing is logged and counted; failing to write the
/// mapping is an error.
pub fn publish(store: &dyn DocumentStore, movies: Vec<Movie>) -> Result<PublishReport> {
    let mut mapping = TitleMapping::new();
    let mut duplicates = Vec::new();
    let mut published = 0;
    let mut failed = 0;

    for movie in movies {
        let movie = movie.normalized();
        if let Err(reason) = movie.validate() {
            error!(%reason, "refusing to publish invalid movie");
            failed += 1;
            continue;
        }

        let key = document_key(&movie);
        let document = match serde_json::to_value(&movie) {
            Ok(document) => document,
            Err(err) => {
                error!(key = %key, %err, "failed to serialize movie");
                failed += 1;
                continue;
            }
        };
        if let Err(err) = store.put_document(MOVIES_COLLECTION, &key, &document) {
            error!(key = %key, err = %format!("{err:#}"), "failed to write movie");
            failed += 1;
            continue;
        }
        info!(key = %key, "updated");
        published += 1;

        let display_key = movie.display_key();
        if let Some(previous) = mapping.insert(display_key.clone(), key) {
            warn!(title = %display_key, replaced = %previous, "duplicate display key");
            duplicates.push(display_key);
        }
    }

    let document =
        serde_json::to_value(&mapping).context("failed to serialize title mapping")?;
    store
        .put_document(METADATA_COLLECTION, TITLE_MAPPING_KEY, &document)
        .context("failed to write title mapping document")?;
    info!(titles = mapping.len(), "updated title mapping document");

    Ok(PublishReport {
        published,
        failed,
        duplicates,
        mapping_size: mapping.len(),
        published_at: Utc::now(),
    })
}

/// Load a directory of records and publish them.
pub fn publish_dir(store: &dyn DocumentStore, dir: impl AsRef<Path>) -> Result<PublishReport> {
    let movies = load_movies(dir)?;
    publish(store, movies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        extractor::save_scraped,
        models::AdvisoryEntry,
        store::{FileStore, MemoryStore},
    };
    use serde_json::Value;
    use tempfile::tempdir;

    fn movie(id: &str, title: &str, year: u16, entries: usize) -> Movie {
        Movie {
            imdb_id: id.to_string(),
            title: title.to_string(),
            year,
            director: None,
            parental_guide_entries: (0..entries)
                .map(|n| AdvisoryEntry::new("Profanity", "Mild", format!("Line {n}.")))
                .collect(),
        }
    }

    #[test]
    fn document_keys_are_sanitized() {
        let key = document_key(&movie("tt0118583", "Alien: Resurrection", 1997, 0));
        assert_eq!(key, "Alien__Resurrection_1997_tt0118583");
    }

    #[test]
    fn mapping_values_resolve_to_movies() -> Result<()> {
        let store = MemoryStore::new();
        let report = publish(
            &store,
            vec![
                movie("tt0078748", "Alien", 1979, 3),
                movie("tt1049413", "Up", 2009, 1),
                movie("tt0000000", "  ", 2000, 2),
            ],
        )?;
        assert_eq!(report.published, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.mapping_size, 2);

        let mapping: TitleMapping = serde_json::from_value(
            store
                .get_document(METADATA_COLLECTION, TITLE_MAPPING_KEY)?
                .ok_or_else(|| anyhow!("mapping missing"))?,
        )?;
        assert_eq!(mapping["Alien (1979)"], "Alien_1979_tt0078748");
        for key in mapping.values() {
            let document = store.get_document(MOVIES_COLLECTION, key)?;
            assert!(document.is_some(), "dangling mapping value {key}");
        }
        Ok(())
    }

    #[test]
    fn published_hints_hide_title_and_director() -> Result<()> {
        let store = MemoryStore::new();
        let mut alien = movie("tt0078748", "Alien", 1979, 0);
        alien.director = Some("Ridley Scott".to_string());
        alien.parental_guide_entries = vec![
            AdvisoryEntry::new(
                "Violence & Gore",
                "Severe",
                "The Alien bursts out of Kane's chest.",
            ),
            AdvisoryEntry::new("Frightening", "Severe", "Scott keeps the aliens in shadow."),
        ];
        publish(&store, vec![alien])?;

        let document = store
            .get_document(MOVIES_COLLECTION, "Alien_1979_tt0078748")?
            .ok_or_else(|| anyhow!("Alien missing"))?;
        let published: Movie = serde_json::from_value(document)?;
        assert_eq!(published.title, "Alien");
        for entry in &published.parental_guide_entries {
            let description = entry.description.to_lowercase();
            assert!(!description.contains("alien"), "{description}");
            assert!(!description.contains("scott"), "{description}");
            assert!(!description.contains("ridley"), "{description}");
        }
        assert_eq!(
            published.parental_guide_entries[0].description,
            "The ████ bursts out of Kane's chest."
        );
        Ok(())
    }

    #[test]
    fn duplicate_display_keys_overwrite() -> Result<()> {
        let store = MemoryStore::new();
        let report = publish(
            &store,
            vec![
                movie("tt1", "Crash", 2004, 2),
                movie("tt2", "Crash", 2004, 2),
            ],
        )?;
        assert_eq!(report.published, 2);
        assert_eq!(report.duplicates, vec!["Crash (2004)"]);
        assert_eq!(report.mapping_size, 1);
        let mapping = store
            .get_document(METADATA_COLLECTION, TITLE_MAPPING_KEY)?
            .unwrap_or(Value::Null);
        assert_eq!(mapping["Crash (2004)"], "Crash_2004_tt2");
        Ok(())
    }

    #[test]
    fn publishes_scraped_directory_to_file_store() -> Result<()> {
        let scraped = tempdir()?;
        save_scraped(scraped.path(), &movie("tt0078748", "Alien", 1979, 3))?;
        fs::create_dir_all(scraped.path().join("batch2"))?;
        save_scraped(scraped.path().join("batch2"), &movie("tt0103644", "Alien 3", 1992, 2))?;
        fs::write(scraped.path().join("broken.json"), "{")?;
        fs::write(
            scraped.path().join("legacy.json"),
            r#"{"imdbID":"tt0090605","title":"Aliens","year":"1986","director":null,
               "parentalGuideEntries":[{"category":"Violence","severity":"Severe","description":" Gunfire. "}]}"#,
        )?;

        let store_dir = tempdir()?;
        let store = FileStore::new(store_dir.path());
        let report = publish_dir(&store, scraped.path())?;
        assert_eq!(report.published, 3);
        assert_eq!(report.failed, 0);

        let aliens = store
            .get_document(MOVIES_COLLECTION, "Aliens_1986_tt0090605")?
            .ok_or_else(|| anyhow!("Aliens missing"))?;
        assert_eq!(aliens["year"], 1986);
        assert_eq!(aliens["parentalGuideEntries"][0]["description"], "Gunfire.");
        assert_eq!(store.list_keys(MOVIES_COLLECTION)?.len(), 3);
        Ok(())
    }

    #[test]
    fn missing_input_directory_is_an_error() {
        let store = MemoryStore::new();
        assert!(publish_dir(&store, "/definitely/not/here").is_err());
    }
}
