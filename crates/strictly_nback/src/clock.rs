//! Timed presentation loop.
//!
//! A run walks `Idle -> Presenting(0) -> Quiet(0) -> ... -> Quiet(last) -> Finished`.
//! The only suspension points are the holds, and each one races the
//! run's cancellation signal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::shared::SharedGame;
use crate::{label_for, ClockError, GameConfig, GameMode, Stimulus, StimulusPresenter};

/// Position of a run in the presentation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    /// Not started.
    Idle,
    /// Stimulus `i` is on display.
    Presenting(usize),
    /// Pause after stimulus `i`.
    Quiet(usize),
    /// Every trial has been shown.
    Finished,
}

impl TrialPhase {
    /// The phase that follows this one in a sequence of `len` trials.
    pub fn next(self, len: usize) -> Self {
        match self {
            Self::Idle if len == 0 => Self::Finished,
            Self::Idle => Self::Presenting(0),
            Self::Presenting(index) => Self::Quiet(index),
            Self::Quiet(index) if index + 1 < len => Self::Presenting(index + 1),
            Self::Quiet(_) | Self::Finished => Self::Finished,
        }
    }
}

/// How a trial loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockExit {
    /// Every trial was presented.
    Completed,
    /// A stop request or a newer run took over.
    Cancelled,
}

/// Drives one run through its sequence.
pub(crate) struct TrialClock {
    generation: u64,
    sequence: Arc<[Stimulus]>,
    mode: GameMode,
    presentation_hold: Duration,
    quiet_hold: Duration,
    shared: Arc<SharedGame>,
    presenter: Arc<dyn StimulusPresenter>,
    cancel: watch::Receiver<bool>,
}

impl TrialClock {
    pub(crate) fn new(
        generation: u64,
        sequence: Arc<[Stimulus]>,
        mode: GameMode,
        config: &GameConfig,
        shared: Arc<SharedGame>,
        presenter: Arc<dyn StimulusPresenter>,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            generation,
            sequence,
            mode,
            presentation_hold: mode
                .presentation_hold(config.event_interval(), config.quiet_duration()),
            quiet_hold: config.quiet_duration(),
            shared,
            presenter,
            cancel,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Runs until the sequence is exhausted or the run is cancelled.
    #[instrument(skip(self), fields(generation = self.generation, mode = %self.mode, len = self.sequence.len()))]
    pub(crate) async fn run(mut self) -> Result<ClockExit, ClockError> {
        let mut phase = TrialPhase::Idle;
        loop {
            phase = phase.next(self.sequence.len());
            let entered = match phase {
                TrialPhase::Presenting(index) => {
                    self.enter_presenting(index)? && self.hold(self.presentation_hold).await
                }
                TrialPhase::Quiet(index) => {
                    debug!(index, "Quiet");
                    self.shared.quiet(self.generation) && self.hold(self.quiet_hold).await
                }
                TrialPhase::Finished => return Ok(ClockExit::Completed),
                TrialPhase::Idle => {
                    return Err(ClockError::new("Phase machine returned to Idle"));
                }
            };
            if !entered {
                debug!(?phase, "Cancellation observed");
                return Ok(ClockExit::Cancelled);
            }
        }
    }

    /// Publishes trial `index` and fires its side effect. False when superseded.
    fn enter_presenting(&self, index: usize) -> Result<bool, ClockError> {
        let stimulus = *self.sequence.get(index).ok_or_else(|| {
            ClockError::new(format!(
                "Trial {} outside sequence of {}",
                index,
                self.sequence.len()
            ))
        })?;

        let label = self.mode.speaks().then(|| label_for(stimulus));
        debug!(index, stimulus, ?label, "Presenting");
        if !self
            .shared
            .present(self.generation, index, stimulus, label.clone())
        {
            return Ok(false);
        }

        if let Some(label) = label
            && let Err(e) = self.presenter.speak(&label)
        {
            warn!(index, mode = %self.mode, error = %e, "Speech failed; trial continues");
        }
        Ok(true)
    }

    /// Waits `duration` unless cancelled first. True when the hold completed.
    async fn hold(&mut self, duration: Duration) -> bool {
        if *self.cancel.borrow() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.cancel.changed() => false,
            _ = sleep(duration) => true,
        }
    }
}
