#![allow(missing_docs)]

//! Game session state machine, movie selection and session ownership.

pub mod controller;
pub mod selector;
mod state;

pub use controller::{SelectionRequest, SelectionResult, SessionController};
pub use selector::{shuffled_entries, MovieSelector, DEFAULT_MAX_ATTEMPTS};
pub use state::{
    suggest_titles, Event, GameSession, LossReason, Outcome, SessionStatus, MAX_SUGGESTIONS,
};
