//! Presentation channels.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tracing::instrument;

/// Which channel a run presents its stimuli on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum GameMode {
    /// A grid cell lights up.
    #[default]
    Visual,
    /// A letter is spoken.
    Audio,
    /// The cell lights up and its letter is spoken in the same trial.
    AudioVisual,
}

impl GameMode {
    /// Whether trials publish the stimulus for the grid.
    pub fn shows_grid(self) -> bool {
        matches!(self, Self::Visual | Self::AudioVisual)
    }

    /// Whether trials speak the stimulus label.
    pub fn speaks(self) -> bool {
        matches!(self, Self::Audio | Self::AudioVisual)
    }

    /// How long a stimulus stays up before the quiet pause.
    ///
    /// Audio holds the whole interval; grid modes leave room for the pause
    /// inside the interval.
    #[instrument]
    pub fn presentation_hold(self, event_interval: Duration, quiet: Duration) -> Duration {
        match self {
            Self::Audio => event_interval,
            Self::Visual | Self::AudioVisual => event_interval.saturating_sub(quiet),
        }
    }

    /// Human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Visual => "Visual",
            Self::Audio => "Audio",
            Self::AudioVisual => "Audio + Visual",
        }
    }
}
