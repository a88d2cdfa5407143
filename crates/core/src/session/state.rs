use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{GameError, GameResult, GuessRejection},
    models::{AdvisoryEntry, Movie, TitleMapping},
};

/// Maximum number of autocomplete suggestions.
pub const MAX_SUGGESTIONS: usize = 5;

/// Lifecycle of a play-through. `Won` and `Lost` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    InProgress,
    Won,
    Lost,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::InProgress => f.write_str("in progress"),
            SessionStatus::Won => f.write_str("won"),
            SessionStatus::Lost => f.write_str("lost"),
        }
    }
}

/// How a session ended up `Lost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossReason {
    GaveUp,
    OutOfHints,
}

/// Player actions that drive the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RevealNextHint,
    SubmitGuess(String),
    GiveUp,
}

/// Result of an accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    HintRevealed { revealed: usize, remaining: usize },
    Won,
    Lost(LossReason),
}

/// One play-through against a single movie.
#[derive(Debug, Clone)]
pub struct GameSession {
    movie: Movie,
    title_mapping: Arc<TitleMapping>,
    answer: String,
    revealed_count: usize,
    previous_guesses: Vec<String>,
    status: SessionStatus,
    loss_reason: Option<LossReason>,
    feedback_message: Option<String>,
    started_at: DateTime<Utc>,
}

impl GameSession {
    /// Start a session. Entry order is taken as-is; shuffle before calling.
    pub fn new(movie: Movie, title_mapping: Arc<TitleMapping>) -> GameResult<Self> {
        if !movie.is_eligible() {
            return Err(GameError::DataUnavailable(format!(
                "{} has only {} advisory entries",
                movie.display_key(),
                movie.parental_guide_entries.len()
            )));
        }
        let answer = movie.display_key();
        Ok(Self {
            movie,
            title_mapping,
            answer,
            revealed_count: 1,
            previous_guesses: Vec::new(),
            status: SessionStatus::InProgress,
            loss_reason: None,
            feedback_message: None,
            started_at: Utc::now(),
        })
    }

    pub fn movie(&self) -> &Movie {
        &self.movie
    }

    pub fn title_mapping(&self) -> &TitleMapping {
        &self.title_mapping
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn loss_reason(&self) -> Option<LossReason> {
        self.loss_reason
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed_count
    }

    pub fn total_hints(&self) -> usize {
        self.movie.parental_guide_entries.len()
    }

    pub fn remaining_hints(&self) -> usize {
        self.total_hints() - self.revealed_count
    }

    /// The entries currently visible to the player.
    pub fn revealed_entries(&self) -> &[AdvisoryEntry] {
        &self.movie.parental_guide_entries[..self.revealed_count]
    }

    pub fn previous_guesses(&self) -> &[String] {
        &self.previous_guesses
    }

    pub fn feedback_message(&self) -> Option<&str> {
        self.feedback_message.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_finished(&self) -> bool {
        self.status != SessionStatus::InProgress
    }

    /// Pure transition: consume the session and return its successor.
    ///
    /// Rejected events hand back the session unchanged apart from its feedback text.
    pub fn apply(mut self, event: Event) -> (Self, GameResult<Outcome>) {
        let result = match event {
            Event::RevealNextHint => self.reveal_next_hint(),
            Event::SubmitGuess(text) => self.submit_guess(&text),
            Event::GiveUp => self.give_up(),
        };
        (self, result)
    }

    /// Show one more advisory, or lose when none are left.
    pub fn reveal_next_hint(&mut self) -> GameResult<Outcome> {
        self.ensure_in_progress("reveal a hint")?;
        Ok(self.advance())
    }

    /// Validate and score a guess against the title mapping.
    pub fn submit_guess(&mut self, text: &str) -> GameResult<Outcome> {
        self.ensure_in_progress("submit a guess")?;

        let guess = text.trim();
        if guess.is_empty() {
            return Err(self.reject(GuessRejection::Empty));
        }
        if !self.title_mapping.contains_key(guess) {
            return Err(self.reject(GuessRejection::NotRecognized));
        }
        if self.previous_guesses.iter().any(|previous| previous == guess) {
            return Err(self.reject(GuessRejection::AlreadyGuessed));
        }

        if guess == self.answer {
            self.status = SessionStatus::Won;
            self.feedback_message = Some(format!(
                "You guessed correctly! It's {}.",
                self.movie.title
            ));
            debug!(guess, revealed = self.revealed_count, "session won");
            return Ok(Outcome::Won);
        }

        self.previous_guesses.push(guess.to_string());
        debug!(guess, "wrong guess");
        Ok(self.advance())
    }

    /// Abandon the session.
    pub fn give_up(&mut self) -> GameResult<Outcome> {
        self.ensure_in_progress("give up")?;
        Ok(self.lose(LossReason::GaveUp))
    }

    /// Up to [`MAX_SUGGESTIONS`] display keys containing `prefix`, minus previous guesses.
    pub fn suggest_titles(&self, prefix: &str) -> Vec<String> {
        suggest_titles(&self.title_mapping, &self.previous_guesses, prefix)
    }

    fn advance(&mut self) -> Outcome {
        if self.revealed_count < self.total_hints() {
            self.revealed_count += 1;
            let remaining = self.remaining_hints();
            self.feedback_message = Some(format!("You have {remaining} more hints."));
            Outcome::HintRevealed {
                revealed: self.revealed_count,
                remaining,
            }
        } else {
            self.lose(LossReason::OutOfHints)
        }
    }

    fn lose(&mut self, reason: LossReason) -> Outcome {
        self.status = SessionStatus::Lost;
        self.loss_reason = Some(reason);
        self.feedback_message = Some(format!("Game over. It was {}.", self.movie.title));
        debug!(?reason, "session lost");
        Outcome::Lost(reason)
    }

    fn reject(&mut self, rejection: GuessRejection) -> GameError {
        self.feedback_message = Some(rejection.feedback().to_string());
        GameError::InvalidGuess(rejection)
    }

    fn ensure_in_progress(&self, operation: &'static str) -> GameResult<()> {
        if self.status == SessionStatus::InProgress {
            Ok(())
        } else {
            Err(GameError::InvalidTransition {
                operation,
                status: self.status,
            })
        }
    }
}

/// Case-insensitive substring search over the mapping's display keys.
///
/// Inputs of one character or less yield nothing.
pub fn suggest_titles(mapping: &TitleMapping, exclude: &[String], prefix: &str) -> Vec<String> {
    if prefix.chars().count() <= 1 {
        return Vec::new();
    }
    let needle = prefix.to_lowercase();
    mapping
        .keys()
        .filter(|key| key.to_lowercase().contains(&needle))
        .filter(|key| !exclude.iter().any(|guess| guess == *key))
        .take(MAX_SUGGESTIONS)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> AdvisoryEntry {
        AdvisoryEntry::new("Violence & Gore", "Moderate", format!("Hint number {n}."))
    }

    fn movie(title: &str, year: u16, entries: usize) -> Movie {
        Movie {
            imdb_id: format!("tt{year}"),
            title: title.to_string(),
            year,
            director: None,
            parental_guide_entries: (1..=entries).map(entry).collect(),
        }
    }

    fn mapping() -> Arc<TitleMapping> {
        Arc::new(
            [
                ("Alien (1979)", "Alien_1979_tt1979"),
                ("Aliens (1986)", "Aliens_1986_tt1986"),
                ("Alien 3 (1992)", "Alien_3_1992_tt1992"),
                ("Alien: Resurrection (1997)", "Alien__Resurrection_1997_tt1997"),
                ("Alien Nation (1988)", "Alien_Nation_1988_tt1988"),
                ("Alien vs. Predator (2004)", "Alien_vs__Predator_2004_tt2004"),
                ("Up (2009)", "Up_2009_tt2009"),
                ("Heat (1995)", "Heat_1995_tt1995"),
            ]
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        )
    }

    fn alien_session() -> GameSession {
        GameSession::new(movie("Alien", 1979, 3), mapping()).expect("eligible fixture")
    }

    #[test]
    fn starts_in_progress_with_one_hint() {
        let session = alien_session();
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.revealed_count(), 1);
        assert_eq!(session.revealed_entries().len(), 1);
        assert!(session.previous_guesses().is_empty());
        assert!(session.feedback_message().is_none());
    }

    #[test]
    fn refuses_ineligible_movie() {
        let result = GameSession::new(movie("Up", 2009, 1), mapping());
        assert!(matches!(result, Err(GameError::DataUnavailable(_))));
    }

    #[test]
    fn reveal_exhausts_then_loses() {
        let mut session = alien_session();
        assert_eq!(
            session.reveal_next_hint().ok(),
            Some(Outcome::HintRevealed {
                revealed: 2,
                remaining: 1
            })
        );
        assert_eq!(session.feedback_message(), Some("You have 1 more hints."));
        session.reveal_next_hint().ok();
        assert_eq!(session.revealed_count(), 3);

        assert_eq!(
            session.reveal_next_hint().ok(),
            Some(Outcome::Lost(LossReason::OutOfHints))
        );
        assert_eq!(session.status(), SessionStatus::Lost);
        assert_eq!(session.revealed_count(), 3);

        let again = session.reveal_next_hint();
        assert!(matches!(
            again,
            Err(GameError::InvalidTransition {
                status: SessionStatus::Lost,
                ..
            })
        ));
        assert_eq!(session.revealed_count(), 3);
    }

    #[test]
    fn correct_guess_wins_at_any_point() {
        for reveals in 0..3 {
            let mut session = alien_session();
            for _ in 0..reveals {
                session.reveal_next_hint().ok();
            }
            assert_eq!(session.submit_guess("Alien (1979)").ok(), Some(Outcome::Won));
            assert_eq!(session.status(), SessionStatus::Won);
            assert!(session.previous_guesses().is_empty());
        }
    }

    #[test]
    fn guess_is_trimmed_before_matching() {
        let mut session = alien_session();
        assert_eq!(session.submit_guess("  Alien (1979) ").ok(), Some(Outcome::Won));
    }

    #[test]
    fn unknown_title_changes_nothing() {
        let mut session = alien_session();
        let result = session.submit_guess("alien (1979)");
        assert!(matches!(
            result,
            Err(GameError::InvalidGuess(GuessRejection::NotRecognized))
        ));
        assert_eq!(session.revealed_count(), 1);
        assert!(session.previous_guesses().is_empty());
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(
            session.feedback_message(),
            Some("Please select a movie from the suggestions.")
        );
    }

    #[test]
    fn empty_guess_is_rejected_before_lookup() {
        let mut session = alien_session();
        for blank in ["", "   ", "\t\n"] {
            let result = session.submit_guess(blank);
            assert!(matches!(
                result,
                Err(GameError::InvalidGuess(GuessRejection::Empty))
            ));
        }
        assert_eq!(session.revealed_count(), 1);
        assert!(session.previous_guesses().is_empty());
    }

    #[test]
    fn repeated_guess_is_reported_distinctly() {
        let mut session = alien_session();
        session.submit_guess("Heat (1995)").ok();
        assert_eq!(session.revealed_count(), 2);

        let result = session.submit_guess("Heat (1995)");
        assert!(matches!(
            result,
            Err(GameError::InvalidGuess(GuessRejection::AlreadyGuessed))
        ));
        assert!(result.as_ref().is_err_and(GameError::is_recoverable));
        assert_eq!(session.revealed_count(), 2);
        assert_eq!(session.previous_guesses(), ["Heat (1995)".to_string()]);
        assert_eq!(session.status(), SessionStatus::InProgress);
    }

    #[test]
    fn wrong_guess_on_last_hint_loses() {
        let mut session = alien_session();
        session.submit_guess("Heat (1995)").ok();
        session.submit_guess("Up (2009)").ok();
        assert_eq!(session.revealed_count(), 3);
        assert_eq!(
            session.submit_guess("Aliens (1986)").ok(),
            Some(Outcome::Lost(LossReason::OutOfHints))
        );
        assert_eq!(session.previous_guesses().len(), 3);
        assert_eq!(session.feedback_message(), Some("Game over. It was Alien."));
    }

    #[test]
    fn give_up_is_immediate() {
        let mut session = alien_session();
        session.submit_guess("Heat (1995)").ok();
        assert_eq!(
            session.give_up().ok(),
            Some(Outcome::Lost(LossReason::GaveUp))
        );
        assert_eq!(session.loss_reason(), Some(LossReason::GaveUp));
        assert_eq!(session.revealed_count(), 2);
        assert_eq!(session.previous_guesses().len(), 1);
    }

    #[test]
    fn terminal_states_reject_every_operation() {
        let mut session = alien_session();
        session.submit_guess("Alien (1979)").ok();
        assert!(matches!(
            session.submit_guess("Heat (1995)"),
            Err(GameError::InvalidTransition { .. })
        ));
        assert!(matches!(
            session.give_up(),
            Err(GameError::InvalidTransition { .. })
        ));
        assert_eq!(session.status(), SessionStatus::Won);
    }

    #[test]
    fn apply_threads_session_through_events() {
        let session = alien_session();
        let (session, result) = session.apply(Event::SubmitGuess("Up (2009)".into()));
        assert!(result.is_ok());
        let (session, result) = session.apply(Event::SubmitGuess("Nope (2022)".into()));
        assert!(result.is_err());
        assert_eq!(session.revealed_count(), 2);
        let (session, result) = session.apply(Event::GiveUp);
        assert_eq!(result.ok(), Some(Outcome::Lost(LossReason::GaveUp)));
        let (session, result) = session.apply(Event::RevealNextHint);
        assert!(result.is_err());
        assert!(session.is_finished());
    }

    #[test]
    fn suggestions_need_two_characters() {
        let session = alien_session();
        assert!(session.suggest_titles("").is_empty());
        assert!(session.suggest_titles("a").is_empty());
        assert!(!session.suggest_titles("al").is_empty());
    }

    #[test]
    fn suggestions_are_capped_and_ordered() {
        let session = alien_session();
        let suggestions = session.suggest_titles("ALIEN");
        assert_eq!(suggestions.len(), MAX_SUGGESTIONS);
        assert_eq!(
            suggestions,
            vec![
                "Alien (1979)",
                "Alien 3 (1992)",
                "Alien Nation (1988)",
                "Alien vs. Predator (2004)",
                "Alien: Resurrection (1997)",
            ]
        );
    }

    #[test]
    fn suggestions_match_anywhere_and_skip_guesses() {
        let mut session = alien_session();
        assert_eq!(session.suggest_titles("eat"), vec!["Heat (1995)"]);

        session.submit_guess("Heat (1995)").ok();
        assert!(session.suggest_titles("eat").is_empty());
        let suggestions = session.suggest_titles("(19");
        assert_eq!(suggestions.len(), MAX_SUGGESTIONS);
        assert!(suggestions
            .iter()
            .all(|key| !session.previous_guesses().contains(key)));
    }

    #[test]
    fn suggestions_available_after_game_ends() {
        let mut session = alien_session();
        session.give_up().ok();
        assert_eq!(session.suggest_titles("up (2"), vec!["Up (2009)"]);
    }
}
