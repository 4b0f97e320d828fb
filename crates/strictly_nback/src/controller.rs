//! Public facade of the n-back engine.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::clock::{ClockExit, TrialClock};
use crate::shared::SharedGame;
use crate::{
    GameConfig, GameError, GameMode, GameState, HighscoreStore, MatchOutcome, SequenceProvider,
    Stimulus, StimulusPresenter,
};

/// Handle on the run currently owned by the controller.
struct ActiveRun {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Composes sequence generation, the trial clock, scoring and highscore
/// promotion behind one API.
///
/// Must be created inside a Tokio runtime: it spawns the highscore feed
/// listener and, on [`GameController::start`], the trial loop. Dropping the
/// controller cancels both.
pub struct GameController {
    config: GameConfig,
    provider: Arc<dyn SequenceProvider>,
    presenter: Arc<dyn StimulusPresenter>,
    store: Arc<dyn HighscoreStore>,
    shared: Arc<SharedGame>,
    active: Option<ActiveRun>,
    feed_task: JoinHandle<()>,
}

impl std::fmt::Debug for GameController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameController")
            .field("config", &self.config)
            .field("game_state", &*self.shared.game_state().borrow())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl GameController {
    /// Creates a controller after validating `config`.
    ///
    /// The highscore starts at the store's current value and follows its
    /// feed upward from then on.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Config`] if the configuration is inconsistent.
    #[instrument(skip(provider, presenter, store))]
    pub fn new(
        config: GameConfig,
        provider: Arc<dyn SequenceProvider>,
        presenter: Arc<dyn StimulusPresenter>,
        store: Arc<dyn HighscoreStore>,
    ) -> Result<Self, GameError> {
        config.validate()?;

        let mut feed = store.feed();
        let initial = *feed.borrow_and_update();
        info!(highscore = initial, "Creating GameController");
        let shared = Arc::new(SharedGame::new(initial));

        let listener = Arc::clone(&shared);
        let feed_task = tokio::spawn(async move {
            while feed.changed().await.is_ok() {
                let stored = *feed.borrow_and_update();
                if listener.raise_highscore(stored) {
                    debug!(highscore = stored, "Adopted highscore from store");
                }
            }
        });

        Ok(Self {
            config,
            provider,
            presenter,
            store,
            shared,
            active: None,
            feed_task,
        })
    }

    /// Selects the mode for the next run. A run in progress keeps its mode.
    #[instrument(skip(self))]
    pub fn set_mode(&self, mode: GameMode) {
        info!(%mode, "Mode selected");
        self.shared.set_mode(mode);
    }

    /// Starts a new run, cancelling any run in progress.
    ///
    /// Cancellation of the old run is requested, not awaited. The new
    /// sequence is generated synchronously; the trial loop runs on a
    /// spawned task.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Sequence`] if no valid sequence could be
    /// generated. No run is in progress afterwards.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<(), GameError> {
        self.stop();
        self.shared.reset_scores();

        let request = self.config.sequence_request();
        let sequence = self.provider.generate(&request).and_then(|sequence| {
            request.verify(&sequence)?;
            Ok(sequence)
        });
        let sequence: Arc<[Stimulus]> = match sequence {
            Ok(sequence) => sequence.into(),
            Err(e) => {
                error!(error = %e, "Sequence generation failed; run not started");
                return Err(e.into());
            }
        };

        let mode = self.mode();
        let generation = self.shared.begin(Arc::clone(&sequence), mode);
        info!(%mode, generation, ?sequence, "Run started");

        let (cancel, cancelled) = watch::channel(false);
        let clock = TrialClock::new(
            generation,
            sequence,
            mode,
            &self.config,
            Arc::clone(&self.shared),
            Arc::clone(&self.presenter),
            cancelled,
        );
        let task = tokio::spawn(drive(
            clock,
            Arc::clone(&self.shared),
            Arc::clone(&self.store),
        ));
        self.active = Some(ActiveRun { cancel, task });
        Ok(())
    }

    /// Cancels the run in progress, if any.
    ///
    /// Observers see `is_running == false` and an empty stimulus as soon as
    /// this returns; the loop itself exits at its next hold.
    #[instrument(skip(self))]
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.send_replace(true);
            debug!(finished = active.task.is_finished(), "Stop requested");
        }
        self.shared.cancel_current();
    }

    /// Judges the trial on display against the one n trials back.
    ///
    /// A match that lifts the score above the highscore is persisted at
    /// once, so an interrupted run still keeps its best.
    #[instrument(skip(self))]
    pub fn check_match(&self) -> MatchOutcome {
        let (outcome, score) = self.shared.check_match(*self.config.n_back());
        if outcome == MatchOutcome::Match {
            promote_highscore(&self.shared, &self.store, score);
        }
        outcome
    }

    /// Resolves once no run is in progress.
    pub async fn wait_until_idle(&self) {
        let mut running = self.shared.running().subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = running.wait_for(|running| !*running).await;
    }

    /// Configuration in use.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Mode selected for the next run.
    ///
    /// While a run is in progress this can differ from
    /// [`GameState::mode`], which names the channel the run presents on.
    pub fn mode(&self) -> GameMode {
        *self.shared.selected_mode().borrow()
    }

    /// Current presentation snapshot.
    pub fn game_state(&self) -> GameState {
        self.shared.game_state().borrow().clone()
    }

    /// Current score.
    pub fn score(&self) -> u32 {
        *self.shared.score().borrow()
    }

    /// Confirmed matches this run.
    pub fn correct_answers(&self) -> u32 {
        *self.shared.correct_answers().borrow()
    }

    /// Best score known to this controller.
    pub fn highscore(&self) -> u32 {
        *self.shared.highscore().borrow()
    }

    /// Index of the trial on display or last shown.
    pub fn current_index(&self) -> Option<usize> {
        *self.shared.current_index().borrow()
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        *self.shared.running().borrow()
    }

    /// Match distance.
    pub fn n_back(&self) -> usize {
        *self.config.n_back()
    }

    /// Trial length in milliseconds.
    pub fn event_interval(&self) -> u64 {
        *self.config.event_interval_ms()
    }

    /// Trials per run.
    pub fn number_of_events(&self) -> usize {
        *self.config.number_of_events()
    }

    /// Change feed of the presentation snapshot.
    pub fn subscribe_game_state(&self) -> watch::Receiver<GameState> {
        self.shared.game_state().subscribe()
    }

    /// Change feed of the mode selected for the next run.
    pub fn subscribe_mode(&self) -> watch::Receiver<GameMode> {
        self.shared.selected_mode().subscribe()
    }

    /// Change feed of the score.
    pub fn subscribe_score(&self) -> watch::Receiver<u32> {
        self.shared.score().subscribe()
    }

    /// Change feed of the correct-answer count.
    pub fn subscribe_correct_answers(&self) -> watch::Receiver<u32> {
        self.shared.correct_answers().subscribe()
    }

    /// Change feed of the highscore.
    pub fn subscribe_highscore(&self) -> watch::Receiver<u32> {
        self.shared.highscore().subscribe()
    }

    /// Change feed of the current trial index.
    pub fn subscribe_current_index(&self) -> watch::Receiver<Option<usize>> {
        self.shared.current_index().subscribe()
    }

    /// Change feed of the running flag.
    pub fn subscribe_running(&self) -> watch::Receiver<bool> {
        self.shared.running().subscribe()
    }
}

impl Drop for GameController {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.send_replace(true);
            active.task.abort();
        }
        self.feed_task.abort();
    }
}

/// Runs a trial loop to its end and settles the highscore.
async fn drive(clock: TrialClock, shared: Arc<SharedGame>, store: Arc<dyn HighscoreStore>) {
    let generation = clock.generation();
    match AssertUnwindSafe(clock.run()).catch_unwind().await {
        Ok(Ok(ClockExit::Completed)) => info!(generation, "Run completed"),
        Ok(Ok(ClockExit::Cancelled)) => {
            debug!(generation, "Run cancelled");
            return;
        }
        Ok(Err(e)) => error!(generation, error = %e, "Trial loop failed; run abandoned"),
        Err(_) => error!(generation, "Trial loop panicked; run abandoned"),
    }

    if let Some(score) = shared.finish(generation) {
        info!(score, "Final score");
        promote_highscore(&shared, &store, score);
    }
}

/// Raises the local highscore and persists it in the background.
fn promote_highscore(shared: &SharedGame, store: &Arc<dyn HighscoreStore>, score: u32) {
    if !shared.raise_highscore(score) {
        return;
    }
    info!(highscore = score, "New highscore");
    let store = Arc::clone(store);
    tokio::spawn(async move {
        if let Err(e) = store.save(score).await {
            warn!(highscore = score, error = %e, "Failed to persist highscore");
        }
    });
}
