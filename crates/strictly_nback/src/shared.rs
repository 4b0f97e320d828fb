//! State shared between the controller and its trial loop.
//!
//! All writes go through the `inner` mutex and every publish from a trial
//! loop carries the generation of the run that owns it. A loop whose
//! generation is no longer current cannot publish anything.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::scoring::{self, MatchOutcome, RunState, Scoreboard};
use crate::{GameMode, GameState, Stimulus};

#[derive(Debug)]
struct Inner {
    generation: u64,
    sequence: Arc<[Stimulus]>,
    run: RunState,
    scoreboard: Scoreboard,
}

/// Observable game state with a single logical writer.
#[derive(Debug)]
pub(crate) struct SharedGame {
    inner: Mutex<Inner>,
    game_state: watch::Sender<GameState>,
    selected_mode: watch::Sender<GameMode>,
    score: watch::Sender<u32>,
    correct_answers: watch::Sender<u32>,
    highscore: watch::Sender<u32>,
    current_index: watch::Sender<Option<usize>>,
    running: watch::Sender<bool>,
}

impl SharedGame {
    pub(crate) fn new(highscore: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                generation: 0,
                sequence: Arc::from(Vec::new()),
                run: RunState::new(),
                scoreboard: Scoreboard::default(),
            }),
            game_state: watch::channel(GameState::default()).0,
            selected_mode: watch::channel(GameMode::default()).0,
            score: watch::channel(0).0,
            correct_answers: watch::channel(0).0,
            highscore: watch::channel(highscore).0,
            current_index: watch::channel(None).0,
            running: watch::channel(false).0,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace_state(&self, next: impl FnOnce(&GameState) -> GameState) {
        let next = next(&self.game_state.borrow());
        self.game_state.send_replace(next);
    }

    /// Idle snapshot carrying the mode selected for the next run.
    fn publish_idle(&self) {
        let mode = *self.selected_mode.borrow();
        self.replace_state(|state| state.quiet().with_mode(mode));
    }

    fn publish_scores(&self, scoreboard: Scoreboard) {
        self.score.send_replace(scoreboard.score());
        self.correct_answers.send_replace(scoreboard.correct_answers());
    }

    /// Invalidates the current run, if any, and publishes the idle state.
    #[instrument(skip(self))]
    pub(crate) fn cancel_current(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        if inner.run.is_running() {
            info!(index = ?inner.run.current_index(), "Cancelling run");
        }
        inner.run.end();
        self.running.send_replace(false);
        self.publish_idle();
    }

    /// Zeroes score and correct answers.
    #[instrument(skip(self))]
    pub(crate) fn reset_scores(&self) {
        let mut inner = self.lock();
        inner.scoreboard = Scoreboard::default();
        self.publish_scores(inner.scoreboard);
    }

    /// Installs a fresh sequence presented in `mode` and returns the
    /// generation owning it.
    #[instrument(skip(self, sequence), fields(len = sequence.len()))]
    pub(crate) fn begin(&self, sequence: Arc<[Stimulus]>, mode: GameMode) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.sequence = sequence;
        inner.run.begin();
        inner.scoreboard = Scoreboard::default();
        self.publish_scores(inner.scoreboard);
        self.current_index.send_replace(None);
        self.running.send_replace(true);
        self.replace_state(|state| state.quiet().with_mode(mode));
        debug!(generation = inner.generation, "Run installed");
        inner.generation
    }

    /// Publishes trial `index` as active. Returns false for a stale run.
    pub(crate) fn present(
        &self,
        generation: u64,
        index: usize,
        stimulus: Stimulus,
        label: Option<String>,
    ) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.run.advance_to(index);
        self.current_index.send_replace(Some(index));
        self.replace_state(|state| state.presenting(stimulus, label));
        true
    }

    /// Clears the stimulus between trials. Returns false for a stale run.
    pub(crate) fn quiet(&self, generation: u64) -> bool {
        let inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        self.replace_state(GameState::quiet);
        true
    }

    /// Ends the run owned by `generation`, returning its final score.
    #[instrument(skip(self))]
    pub(crate) fn finish(&self, generation: u64) -> Option<u32> {
        let mut inner = self.lock();
        if inner.generation != generation {
            return None;
        }
        inner.run.end();
        self.running.send_replace(false);
        self.publish_idle();
        Some(inner.scoreboard.score())
    }

    /// Judges the current trial and publishes any score change.
    pub(crate) fn check_match(&self, n_back: usize) -> (MatchOutcome, u32) {
        let mut inner = self.lock();
        let Inner {
            sequence,
            run,
            scoreboard,
            ..
        } = &mut *inner;
        let outcome = scoring::check_match(run, scoreboard, sequence, n_back);
        if outcome.was_judged() {
            self.publish_scores(*scoreboard);
        }
        (outcome, scoreboard.score())
    }

    /// Raises the highscore to `score` if it is higher. Returns whether it moved.
    pub(crate) fn raise_highscore(&self, score: u32) -> bool {
        self.highscore.send_if_modified(|highscore| {
            if score > *highscore {
                *highscore = score;
                true
            } else {
                false
            }
        })
    }

    /// Selects the mode for the next run. The snapshot only follows while
    /// idle; a run in progress keeps presenting in its own mode.
    pub(crate) fn set_mode(&self, mode: GameMode) {
        let inner = self.lock();
        self.selected_mode.send_replace(mode);
        if !inner.run.is_running() {
            self.replace_state(|state| state.with_mode(mode));
        }
    }

    pub(crate) fn selected_mode(&self) -> &watch::Sender<GameMode> {
        &self.selected_mode
    }

    pub(crate) fn game_state(&self) -> &watch::Sender<GameState> {
        &self.game_state
    }

    pub(crate) fn score(&self) -> &watch::Sender<u32> {
        &self.score
    }

    pub(crate) fn correct_answers(&self) -> &watch::Sender<u32> {
        &self.correct_answers
    }

    pub(crate) fn highscore(&self) -> &watch::Sender<u32> {
        &self.highscore
    }

    pub(crate) fn current_index(&self) -> &watch::Sender<Option<usize>> {
        &self.current_index
    }

    pub(crate) fn running(&self) -> &watch::Sender<bool> {
        &self.running
    }
}
