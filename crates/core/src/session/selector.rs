use std::sync::Arc;

use rand::{seq::SliceRandom, Rng};
use tracing::{debug, info, warn};

use crate::{
    error::{GameError, GameResult},
    models::{AdvisoryEntry, Movie, TitleMapping},
    store::{DocumentStore, METADATA_COLLECTION, MOVIES_COLLECTION, TITLE_MAPPING_KEY},
};

/// Default bound on random draws before selection gives up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 50;

/// Picks random playable movies from a published dataset.
#[derive(Clone)]
pub struct MovieSelector {
    store: Arc<dyn DocumentStore>,
    max_attempts: usize,
}

impl MovieSelector {
    pub fn new(store: Arc<dyn DocumentStore>, max_attempts: usize) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Read the display-key index published alongside the movies.
    pub fn load_title_mapping(&self) -> GameResult<TitleMapping> {
        let document = self
            .store
            .get_document(METADATA_COLLECTION, TITLE_MAPPING_KEY)
            .map_err(|err| {
                GameError::DataUnavailable(format!("failed to read title mapping: {err:#}"))
            })?
            .ok_or_else(|| {
                GameError::DataUnavailable("title mapping document is missing".to_string())
            })?;
        let mapping: TitleMapping = serde_json::from_value(document).map_err(|err| {
            GameError::DataUnavailable(format!("malformed title mapping: {err}"))
        })?;
        info!(titles = mapping.len(), "title mapping loaded");
        Ok(mapping)
    }

    /// Fetch a movie document. Malformed documents count as missing.
    pub fn fetch_movie(&self, key: &str) -> GameResult<Option<Movie>> {
        let document = self
            .store
            .get_document(MOVIES_COLLECTION, key)
            .map_err(|err| {
                GameError::DataUnavailable(format!("failed to fetch movie {key}: {err:#}"))
            })?;
        let Some(document) = document else {
            return Ok(None);
        };
        match serde_json::from_value::<Movie>(document) {
            Ok(movie) => Ok(Some(movie)),
            Err(err) => {
                warn!(key, %err, "skipping malformed movie document");
                Ok(None)
            }
        }
    }

    /// Draw random mapping entries until one resolves to an eligible movie.
    ///
    /// The returned movie carries a freshly shuffled copy of its entries.
    pub fn select<R: Rng + ?Sized>(
        &self,
        mapping: &TitleMapping,
        rng: &mut R,
    ) -> GameResult<Movie> {
        let keys: Vec<&String> = mapping.values().collect();
        if keys.is_empty() {
            return Err(GameError::DataUnavailable(
                "title mapping is empty".to_string(),
            ));
        }

        for attempt in 1..=self.max_attempts {
            let Some(key) = keys.choose(rng) else {
                break;
            };
            match self.fetch_movie(key)? {
                Some(movie) if movie.is_eligible() => {
                    info!(attempt, key = %key, "movie selected");
                    let entries = shuffled_entries(&movie.parental_guide_entries, rng);
                    return Ok(Movie {
                        parental_guide_entries: entries,
                        ..movie
                    });
                }
                Some(movie) => {
                    debug!(
                        attempt,
                        key = %key,
                        entries = movie.parental_guide_entries.len(),
                        "movie not eligible; redrawing"
                    );
                }
                None => debug!(attempt, key = %key, "movie missing; redrawing"),
            }
        }

        warn!(attempts = self.max_attempts, "no eligible movie found");
        Err(GameError::NoEligibleMovie {
            attempts: self.max_attempts,
        })
    }
}

/// Uniformly permuted copy of the entries; the input is left untouched.
pub fn shuffled_entries<R: Rng + ?Sized>(
    entries: &[AdvisoryEntry],
    rng: &mut R,
) -> Vec<AdvisoryEntry> {
    let mut shuffled = entries.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use anyhow::Result;
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn movie(title: &str, year: u16, entries: usize) -> Movie {
        Movie {
            imdb_id: format!("tt{year}"),
            title: title.to_string(),
            year,
            director: None,
            parental_guide_entries: (1..=entries)
                .map(|n| {
                    AdvisoryEntry::new(
                        "Frightening & Intense Scenes",
                        "Severe",
                        format!("Hint {n}."),
                    )
                })
                .collect(),
        }
    }

    /// `Alien (1979)` with 3 entries and `Up (2009)` with 1.
    pub(crate) fn fixture_store() -> Result<MemoryStore> {
        let store = MemoryStore::new();
        store.put_document(
            MOVIES_COLLECTION,
            "Alien_1979_tt1979",
            &serde_json::to_value(movie("Alien", 1979, 3))?,
        )?;
        store.put_document(
            MOVIES_COLLECTION,
            "Up_2009_tt2009",
            &serde_json::to_value(movie("Up", 2009, 1))?,
        )?;
        store.put_document(
            METADATA_COLLECTION,
            TITLE_MAPPING_KEY,
            &json!({
                "Alien (1979)": "Alien_1979_tt1979",
                "Up (2009)": "Up_2009_tt2009",
            }),
        )?;
        Ok(store)
    }

    struct CountingStore {
        inner: MemoryStore,
        reads: AtomicUsize,
    }

    impl DocumentStore for CountingStore {
        fn get_document(&self, collection: &str, key: &str) -> Result<Option<Value>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_document(collection, key)
        }

        fn put_document(&self, collection: &str, key: &str, document: &Value) -> Result<()> {
            self.inner.put_document(collection, key, document)
        }

        fn list_keys(&self, collection: &str) -> Result<Vec<String>> {
            self.inner.list_keys(collection)
        }
    }

    #[test]
    fn never_selects_ineligible_movies() -> Result<()> {
        let selector = MovieSelector::new(Arc::new(fixture_store()?), DEFAULT_MAX_ATTEMPTS);
        let mapping = selector.load_title_mapping()?;
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let movie = selector.select(&mapping, &mut rng)?;
            assert_eq!(movie.display_key(), "Alien (1979)");
            assert_eq!(movie.parental_guide_entries.len(), 3);
        }
        Ok(())
    }

    #[test]
    fn gives_up_after_max_attempts() -> Result<()> {
        let inner = fixture_store()?;
        inner.remove(MOVIES_COLLECTION, "Alien_1979_tt1979");
        let store = Arc::new(CountingStore {
            inner,
            reads: AtomicUsize::new(0),
        });
        let selector = MovieSelector::new(store.clone(), 12);
        let mapping = selector.load_title_mapping()?;
        store.reads.store(0, Ordering::SeqCst);

        let result = selector.select(&mapping, &mut StdRng::seed_from_u64(1));
        assert!(matches!(
            result,
            Err(GameError::NoEligibleMovie { attempts: 12 })
        ));
        assert_eq!(store.reads.load(Ordering::SeqCst), 12);
        Ok(())
    }

    #[test]
    fn dangling_and_malformed_documents_are_skipped() -> Result<()> {
        let store = fixture_store()?;
        store.put_document(MOVIES_COLLECTION, "Broken_2000_tt2000", &json!({"title": 3}))?;
        store.put_document(
            METADATA_COLLECTION,
            TITLE_MAPPING_KEY,
            &json!({
                "Alien (1979)": "Alien_1979_tt1979",
                "Broken (2000)": "Broken_2000_tt2000",
                "Gone (2012)": "Gone_2012_tt2012",
            }),
        )?;
        let selector = MovieSelector::new(Arc::new(store), DEFAULT_MAX_ATTEMPTS);
        let mapping = selector.load_title_mapping()?;
        assert!(selector.fetch_movie("Broken_2000_tt2000")?.is_none());
        assert!(selector.fetch_movie("Gone_2012_tt2012")?.is_none());

        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..20 {
            assert_eq!(selector.select(&mapping, &mut rng)?.title, "Alien");
        }
        Ok(())
    }

    #[test]
    fn missing_or_empty_mapping_is_data_unavailable() -> Result<()> {
        let selector = MovieSelector::new(Arc::new(MemoryStore::new()), 5);
        assert!(matches!(
            selector.load_title_mapping(),
            Err(GameError::DataUnavailable(_))
        ));
        assert!(matches!(
            selector.select(&TitleMapping::new(), &mut StdRng::seed_from_u64(0)),
            Err(GameError::DataUnavailable(_))
        ));
        Ok(())
    }

    #[test]
    fn shuffle_is_a_permutation_on_a_copy() {
        let original = movie("Alien", 1979, 8).parental_guide_entries;
        let snapshot = original.clone();
        let mut rng = StdRng::seed_from_u64(3);

        let shuffled = shuffled_entries(&original, &mut rng);
        assert_eq!(original, snapshot);
        assert_eq!(shuffled.len(), original.len());
        assert!(original.iter().all(|entry| shuffled.contains(entry)));

        let orders: Vec<Vec<AdvisoryEntry>> = (0..10)
            .map(|_| shuffled_entries(&original, &mut rng))
            .collect();
        assert!(orders.iter().any(|order| order != &original));
    }
}
