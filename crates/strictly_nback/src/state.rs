//! The presentation snapshot observed by front-ends.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::GameMode;

/// A stimulus value, e.g. a grid position in `0..domain_size`.
pub type Stimulus = u32;

const ALPHABET: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Returns the spoken letter for a stimulus, wrapping past `z`.
#[instrument]
pub fn label_for(stimulus: Stimulus) -> String {
    let letter = ALPHABET[(stimulus % ALPHABET.len() as u32) as usize];
    char::from(letter).to_string()
}

/// Immutable snapshot of what is being presented right now.
///
/// A new value replaces the previous one on every transition; nothing
/// mutates a published snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameState {
    mode: GameMode,
    current_stimulus: Option<Stimulus>,
    is_active: bool,
    current_label: Option<String>,
}

impl GameState {
    /// Selected presentation mode.
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Stimulus on display, `None` between trials.
    pub fn current_stimulus(&self) -> Option<Stimulus> {
        self.current_stimulus
    }

    /// True only while a stimulus is being presented.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Letter derived from the stimulus in modes that speak it.
    pub fn current_label(&self) -> Option<&str> {
        self.current_label.as_deref()
    }

    /// Copy of this snapshot with a different mode.
    pub(crate) fn with_mode(&self, mode: GameMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }

    /// Snapshot for a stimulus being presented.
    pub(crate) fn presenting(&self, stimulus: Stimulus, label: Option<String>) -> Self {
        Self {
            mode: self.mode,
            current_stimulus: Some(stimulus),
            is_active: true,
            current_label: label,
        }
    }

    /// Snapshot for the pause between stimuli (and for idle).
    pub(crate) fn quiet(&self) -> Self {
        Self {
            mode: self.mode,
            current_stimulus: None,
            is_active: false,
            current_label: None,
        }
    }
}
