//! Game configuration with TOML loading.

use std::path::Path;
use std::time::Duration;

use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::sequence::SequenceRequest;
use crate::ConfigError;

/// Tunable parameters of an n-back session.
///
/// Every field has a default, so a TOML file only needs to name the
/// options it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct GameConfig {
    /// Length of one trial (presentation plus quiet pause) in milliseconds.
    event_interval_ms: u64,

    /// Blank pause between two stimuli in milliseconds.
    quiet_duration_ms: u64,

    /// Number of trials in a run.
    number_of_events: usize,

    /// Distance between a trial and the one it is compared against.
    n_back: usize,

    /// Number of distinct stimulus values (grid cells).
    domain_size: u32,

    /// Approximate share of trials generated as intentional matches.
    match_target_percent: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            event_interval_ms: 2000,
            quiet_duration_ms: 500,
            number_of_events: 20,
            n_back: 2,
            domain_size: 9,
            match_target_percent: 30,
        }
    }
}

impl GameConfig {
    /// Loads configuration from a TOML file and validates it.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml(&content)?;
        info!(
            n_back = config.n_back,
            events = config.number_of_events,
            "Config loaded successfully"
        );
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Renders this configuration as TOML.
    #[instrument(skip(self))]
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to serialize config: {}", e)))
    }

    /// Checks the relationships between options.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_back == 0 {
            return Err(ConfigError::new("n_back must be at least 1"));
        }
        if self.number_of_events == 0 {
            return Err(ConfigError::new("number_of_events must be at least 1"));
        }
        if self.domain_size == 0 {
            return Err(ConfigError::new("domain_size must be at least 1"));
        }
        if self.quiet_duration_ms >= self.event_interval_ms {
            return Err(ConfigError::new(format!(
                "quiet_duration_ms ({}) must be shorter than event_interval_ms ({})",
                self.quiet_duration_ms, self.event_interval_ms
            )));
        }
        if self.match_target_percent > 100 {
            return Err(ConfigError::new(format!(
                "match_target_percent ({}) must not exceed 100",
                self.match_target_percent
            )));
        }
        Ok(())
    }

    /// Full trial length.
    pub fn event_interval(&self) -> Duration {
        Duration::from_millis(self.event_interval_ms)
    }

    /// Quiet pause after each stimulus.
    pub fn quiet_duration(&self) -> Duration {
        Duration::from_millis(self.quiet_duration_ms)
    }

    /// The request handed to a [`crate::SequenceProvider`] for a new run.
    pub fn sequence_request(&self) -> SequenceRequest {
        SequenceRequest::new(
            self.number_of_events,
            self.domain_size,
            self.match_target_percent,
            self.n_back,
        )
    }
}
