#![warn(clippy::all, missing_docs)]

//! Core logic for Censordle, the content-advisory guessing game.
//!
//! This crate hosts the data models, configuration, document store,
//! the scraping and publishing pipeline, and the game session state
//! machine used by the terminal client.

pub mod config;
pub mod error;
pub mod extractor;
pub mod models;
pub mod publisher;
pub mod session;
pub mod store;

pub use config::AppConfig;
pub use error::{GameError, GameResult, GuessRejection};
pub use models::{AdvisoryEntry, Movie, Severity, TitleMapping};
pub use session::{
    Event, GameSession, LossReason, MovieSelector, Outcome, SessionController, SessionStatus,
};
pub use store::{DocumentStore, FileStore, MemoryStore};
