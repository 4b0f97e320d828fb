//! Strictly N-Back - engine for an n-back memory training game
//!
//! A run presents a fixed-length sequence of stimuli on a timer. The player
//! signals "match" whenever the stimulus on display equals the one shown
//! `n` trials earlier; each trial is judged at most once.
//!
//! # Architecture
//!
//! - **Sequence**: [`SequenceProvider`] produces the trials of a run
//! - **Clock**: a cancellable state machine presents each trial, then pauses
//! - **Scoring**: [`check_match`] applies the n-back rule to the current trial
//! - **Controller**: [`GameController`] ties it together and promotes highscores
//!   into a [`HighscoreStore`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use strictly_nback::{
//!     GameConfig, GameController, GameMode, MemoryHighscoreStore, RandomSequenceProvider,
//!     SilentPresenter,
//! };
//!
//! # async fn example() -> Result<(), strictly_nback::GameError> {
//! let mut controller = GameController::new(
//!     GameConfig::default(),
//!     Arc::new(RandomSequenceProvider::new()),
//!     Arc::new(SilentPresenter),
//!     Arc::new(MemoryHighscoreStore::default()),
//! )?;
//! controller.set_mode(GameMode::Visual);
//! controller.start()?;
//! controller.check_match();
//! controller.wait_until_idle().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod clock;
mod config;
mod controller;
mod error;
mod highscore;
mod mode;
mod presenter;
mod scoring;
mod sequence;
mod shared;
mod state;

pub use clock::{ClockExit, TrialPhase};
pub use config::GameConfig;
pub use controller::GameController;
pub use error::{ClockError, ConfigError, GameError, PresentError, SequenceError, StoreError};
pub use highscore::{FileHighscoreStore, HighscoreStore, MemoryHighscoreStore};
pub use mode::GameMode;
pub use presenter::{SilentPresenter, StimulusPresenter};
pub use scoring::{check_match, IgnoreReason, MatchOutcome, RunState, Scoreboard};
pub use sequence::{
    count_matches, FixedSequenceProvider, RandomSequenceProvider, SequenceProvider,
    SequenceRequest,
};
pub use state::{label_for, GameState, Stimulus};
