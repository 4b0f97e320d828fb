//! Match evaluation against the n-back rule.
//!
//! A trial can be judged at most once: the index is recorded in
//! [`RunState`] before the score moves, so repeated presses during the
//! same trial are ignored rather than debounced.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::Stimulus;

/// Progress of the current run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    current_index: Option<usize>,
    is_running: bool,
    responded_indices: BTreeSet<usize>,
}

impl RunState {
    /// Creates an idle run state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the trial being presented, `None` before the first one.
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Trials that have already been judged.
    pub fn responded_indices(&self) -> &BTreeSet<usize> {
        &self.responded_indices
    }

    /// Resets for a new run.
    pub fn begin(&mut self) {
        self.current_index = None;
        self.is_running = true;
        self.responded_indices.clear();
    }

    /// Moves to the given trial.
    pub fn advance_to(&mut self, index: usize) {
        self.current_index = Some(index);
    }

    /// Marks the run as over. The last index is kept for display.
    pub fn end(&mut self) {
        self.is_running = false;
    }
}

/// Score counters of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    score: u32,
    correct_answers: u32,
}

impl Scoreboard {
    /// Current score, never below zero.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Confirmed matches this run.
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    fn record_match(&mut self) {
        self.score += 1;
        self.correct_answers += 1;
    }

    fn record_mismatch(&mut self) {
        self.score = self.score.saturating_sub(1);
    }
}

/// Why a match check left everything untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum IgnoreReason {
    /// No run is in progress.
    #[display("no run in progress")]
    NotRunning,
    /// Fewer than n trials have been shown.
    #[display("not enough history")]
    InsufficientHistory,
    /// The trial was already judged.
    #[display("trial already judged")]
    AlreadyResponded,
    /// The current index points outside the sequence.
    #[display("index outside the sequence")]
    IndexOutOfRange,
}

/// Result of a match check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum MatchOutcome {
    /// The stimulus equals the one n trials back.
    #[display("match")]
    Match,
    /// The stimulus differs from the one n trials back.
    #[display("mismatch")]
    Mismatch,
    /// Nothing was scored.
    #[display("ignored: {}", _0)]
    Ignored(IgnoreReason),
}

impl MatchOutcome {
    /// True when the check changed the run.
    pub fn was_judged(self) -> bool {
        !matches!(self, Self::Ignored(_))
    }
}

/// Judges the current trial of `run` against the one `n_back` trials earlier.
///
/// Ignored checks leave `run` and `scoreboard` untouched.
#[instrument(skip(run, scoreboard, sequence), fields(index = ?run.current_index))]
pub fn check_match(
    run: &mut RunState,
    scoreboard: &mut Scoreboard,
    sequence: &[Stimulus],
    n_back: usize,
) -> MatchOutcome {
    if !run.is_running {
        return MatchOutcome::Ignored(IgnoreReason::NotRunning);
    }
    let Some(index) = run.current_index.filter(|index| *index >= n_back) else {
        return MatchOutcome::Ignored(IgnoreReason::InsufficientHistory);
    };
    if run.responded_indices.contains(&index) {
        debug!(index, "Trial already judged");
        return MatchOutcome::Ignored(IgnoreReason::AlreadyResponded);
    }

    let (Some(current), Some(earlier)) = (sequence.get(index), sequence.get(index - n_back))
    else {
        debug_assert!(false, "index {} outside sequence of {}", index, sequence.len());
        return MatchOutcome::Ignored(IgnoreReason::IndexOutOfRange);
    };

    run.responded_indices.insert(index);
    let outcome = if current == earlier {
        scoreboard.record_match();
        MatchOutcome::Match
    } else {
        scoreboard.record_mismatch();
        MatchOutcome::Mismatch
    };

    debug!(
        index,
        outcome = %outcome,
        score = scoreboard.score,
        correct = scoreboard.correct_answers,
        "Trial judged"
    );
    outcome
}
