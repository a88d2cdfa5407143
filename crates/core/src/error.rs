//! Game-level error taxonomy.

use std::fmt;

use thiserror::Error;

use crate::session::SessionStatus;

/// Why a guess was turned away without counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessRejection {
    /// Blank or whitespace-only input.
    Empty,
    /// Not a display key in the title mapping.
    NotRecognized,
    /// Already submitted during this session.
    AlreadyGuessed,
}

impl GuessRejection {
    /// Player-facing feedback for the rejection.
    pub fn feedback(&self) -> &'static str {
        match self {
            GuessRejection::Empty => "Type a movie title first.",
            GuessRejection::NotRecognized => "Please select a movie from the suggestions.",
            GuessRejection::AlreadyGuessed => {
                "You have already guessed that. Try something else!"
            }
        }
    }
}

impl fmt::Display for GuessRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuessRejection::Empty => f.write_str("empty guess"),
            GuessRejection::NotRecognized => f.write_str("not a recognized title"),
            GuessRejection::AlreadyGuessed => f.write_str("already guessed"),
        }
    }
}

/// Errors surfaced by movie selection and the session state machine.
#[derive(Debug, Error)]
pub enum GameError {
    /// The title mapping or a movie document could not be read.
    #[error("game data unavailable: {0}")]
    DataUnavailable(String),

    /// The selector ran out of attempts without finding a playable movie.
    #[error("no eligible movie found after {attempts} attempts")]
    NoEligibleMovie {
        /// Draws made before giving up.
        attempts: usize,
    },

    /// A guess was turned away; the session is unchanged.
    #[error("invalid guess: {0}")]
    InvalidGuess(GuessRejection),

    /// An operation was invoked in a state that does not allow it.
    #[error("cannot {operation} while the game is {status}")]
    InvalidTransition {
        /// The rejected operation.
        operation: &'static str,
        /// Status the session was in.
        status: SessionStatus,
    },
}

impl GameError {
    /// Whether the player can simply carry on after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GameError::InvalidGuess(_))
    }
}

/// Convenience alias for game results.
pub type GameResult<T> = std::result::Result<T, GameError>;
