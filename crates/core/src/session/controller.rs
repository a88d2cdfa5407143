use std::sync::Arc;

use rand::Rng;
use tracing::{debug, error, info};

use crate::{
    error::{GameError, GameResult},
    models::{Movie, TitleMapping},
    store::DocumentStore,
};

use super::{selector::MovieSelector, state::GameSession};

/// A selection that can run away from the UI thread.
///
/// It holds everything it needs, so it can be moved onto a worker and its
/// result handed back through [`SessionController::complete_selection`].
#[derive(Clone)]
pub struct SelectionRequest {
    generation: u64,
    selector: MovieSelector,
    mapping: Option<Arc<TitleMapping>>,
}

/// Output of a [`SelectionRequest`], tagged with the generation it was issued for.
pub struct SelectionResult {
    generation: u64,
    mapping: Option<Arc<TitleMapping>>,
    movie: GameResult<Movie>,
}

impl SelectionRequest {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Run the selection with the thread-local RNG.
    pub fn run(self) -> SelectionResult {
        self.run_with(&mut rand::thread_rng())
    }

    /// Run the selection with a caller-provided RNG.
    pub fn run_with<R: Rng + ?Sized>(self, rng: &mut R) -> SelectionResult {
        let mapping = match self.mapping {
            Some(mapping) => Ok(mapping),
            None => self.selector.load_title_mapping().map(Arc::new),
        };
        match mapping {
            Ok(mapping) => {
                let movie = self.selector.select(&mapping, rng);
                SelectionResult {
                    generation: self.generation,
                    mapping: Some(mapping),
                    movie,
                }
            }
            Err(err) => SelectionResult {
                generation: self.generation,
                mapping: None,
                movie: Err(err),
            },
        }
    }
}

impl SelectionResult {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Owns the current session and discards selections that arrive too late.
pub struct SessionController {
    selector: MovieSelector,
    mapping: Option<Arc<TitleMapping>>,
    generation: u64,
    session: Option<GameSession>,
}

impl SessionController {
    pub fn new(store: Arc<dyn DocumentStore>, max_attempts: usize) -> Self {
        Self {
            selector: MovieSelector::new(store, max_attempts),
            mapping: None,
            generation: 0,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut GameSession> {
        self.session.as_mut()
    }

    /// Title mapping, once a selection has loaded it.
    pub fn title_mapping(&self) -> Option<&TitleMapping> {
        self.mapping.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Select a movie and start a fresh session, blocking the caller.
    pub fn new_session(&mut self) -> GameResult<&GameSession> {
        self.new_session_with(&mut rand::thread_rng())
    }

    /// [`Self::new_session`] with an explicit RNG.
    pub fn new_session_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> GameResult<&GameSession> {
        let result = self.begin_selection().run_with(rng);
        self.complete_selection(result)?;
        self.session
            .as_ref()
            .ok_or_else(|| GameError::DataUnavailable("no session started".to_string()))
    }

    /// Issue a new selection request, invalidating any still in flight.
    pub fn begin_selection(&mut self) -> SelectionRequest {
        self.generation += 1;
        debug!(generation = self.generation, "selection started");
        SelectionRequest {
            generation: self.generation,
            selector: self.selector.clone(),
            mapping: self.mapping.clone(),
        }
    }

    /// Invalidate any in-flight selection without starting another.
    pub fn cancel_selection(&mut self) {
        self.generation += 1;
    }

    /// Apply a finished selection.
    ///
    /// Returns `Ok(false)` when the result belongs to an older generation and
    /// was dropped. A failed current selection clears the session.
    pub fn complete_selection(&mut self, result: SelectionResult) -> GameResult<bool> {
        if result.generation != self.generation {
            debug!(
                stale = result.generation,
                current = self.generation,
                "discarding stale selection"
            );
            return Ok(false);
        }

        if let Some(mapping) = result.mapping {
            self.mapping = Some(mapping);
        }

        match result.movie {
            Ok(movie) => {
                let mapping = self.mapping.clone().unwrap_or_default();
                let session = GameSession::new(movie, mapping)?;
                info!(
                    title = %session.movie().display_key(),
                    hints = session.total_hints(),
                    "session started"
                );
                self.session = Some(session);
                Ok(true)
            }
            Err(err) => {
                error!(%err, "movie selection failed");
                self.session = None;
                Err(err)
            }
        }
    }
}
