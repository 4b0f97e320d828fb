//! Error types for the n-back engine.
//!
//! Every failure class carries the caller location so a log line points
//! straight at the code that produced it.

use derive_more::{Display, Error, From};
use tracing::instrument;

/// Invalid or unreadable game configuration.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// The sequence provider could not produce a usable trial sequence.
#[derive(Debug, Clone, Display, Error)]
#[display("Sequence error: {} at {}:{}", message, file, line)]
pub struct SequenceError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SequenceError {
    /// Creates a new sequence error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// A presentation side effect (speech, display) failed.
#[derive(Debug, Clone, Display, Error)]
#[display("Presentation error: {} at {}:{}", message, file, line)]
pub struct PresentError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl PresentError {
    /// Creates a new presentation error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Highscore persistence failed.
#[derive(Debug, Clone, Display, Error)]
#[display("Store error: {} at {}:{}", message, file, line)]
pub struct StoreError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a new store error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<std::io::Error> for StoreError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for StoreError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("JSON error: {}", err))
    }
}

/// The trial loop hit a state it cannot continue from.
#[derive(Debug, Clone, Display, Error)]
#[display("Trial clock error: {} at {}:{}", message, file, line)]
pub struct ClockError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ClockError {
    /// Creates a new trial clock error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Errors surfaced by [`crate::GameController`].
#[derive(Debug, Clone, Display, Error, From)]
pub enum GameError {
    /// The configuration was rejected.
    #[display("{}", _0)]
    Config(ConfigError),
    /// No sequence could be generated, so the run did not begin.
    #[display("{}", _0)]
    Sequence(SequenceError),
}
