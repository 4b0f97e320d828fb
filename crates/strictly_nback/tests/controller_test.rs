//! Tests for GameController runs on a paused clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;

use strictly_nback::{
    FixedSequenceProvider, GameConfig, GameController, GameError, GameMode, HighscoreStore,
    IgnoreReason, MatchOutcome, MemoryHighscoreStore, PresentError, SequenceError,
    SequenceProvider, SequenceRequest, SilentPresenter, Stimulus, StimulusPresenter,
};

const SCRIPT: [Stimulus; 6] = [3, 5, 3, 7, 3, 5];

/// Presenter that records every label it is asked to speak.
#[derive(Default)]
struct RecordingPresenter {
    spoken: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl StimulusPresenter for RecordingPresenter {
    fn speak(&self, label: &str) -> Result<(), PresentError> {
        self.spoken.lock().unwrap().push(label.to_string());
        Ok(())
    }
}

/// Presenter whose audio device is gone.
struct BrokenPresenter;

impl StimulusPresenter for BrokenPresenter {
    fn speak(&self, _label: &str) -> Result<(), PresentError> {
        Err(PresentError::new("no audio device"))
    }
}

/// Presenter that blows up on a given label.
struct PanickingPresenter {
    on: &'static str,
}

impl StimulusPresenter for PanickingPresenter {
    fn speak(&self, label: &str) -> Result<(), PresentError> {
        if label == self.on {
            panic!("speech engine crashed");
        }
        Ok(())
    }
}

/// Provider that never produces anything.
struct FailingProvider;

impl SequenceProvider for FailingProvider {
    fn generate(&self, _request: &SequenceRequest) -> Result<Vec<Stimulus>, SequenceError> {
        Err(SequenceError::new("generator offline"))
    }
}

fn config_for(sequence: &[Stimulus]) -> GameConfig {
    GameConfig::default().with_number_of_events(sequence.len())
}

fn controller_with(
    sequence: &[Stimulus],
    presenter: Arc<dyn StimulusPresenter>,
    store: Arc<MemoryHighscoreStore>,
) -> GameController {
    GameController::new(
        config_for(sequence),
        Arc::new(FixedSequenceProvider::new(sequence.to_vec())),
        presenter,
        store,
    )
    .expect("Valid config")
}

fn scripted() -> (GameController, Arc<MemoryHighscoreStore>) {
    let store = Arc::new(MemoryHighscoreStore::default());
    let controller = controller_with(&SCRIPT, Arc::new(SilentPresenter), Arc::clone(&store));
    (controller, store)
}

async fn wait_for_index(controller: &GameController, index: usize) {
    controller
        .subscribe_current_index()
        .wait_for(|current| *current == Some(index))
        .await
        .expect("Index feed closed");
}

async fn wait_for_stored(store: &MemoryHighscoreStore, value: u32) {
    store
        .feed()
        .wait_for(|stored| *stored == value)
        .await
        .expect("Store feed closed");
}

#[tokio::test(start_paused = true)]
async fn test_fresh_controller_defaults() {
    let (controller, _store) = scripted();
    let state = controller.game_state();
    assert_eq!(state.mode(), GameMode::Visual);
    assert_eq!(state.current_stimulus(), None);
    assert!(!state.is_active());
    assert!(!controller.is_running());
    assert_eq!(controller.current_index(), None);
    assert_eq!(controller.n_back(), 2);
    assert_eq!(controller.event_interval(), 2000);
    assert_eq!(controller.number_of_events(), SCRIPT.len());
}

#[tokio::test(start_paused = true)]
async fn test_scripted_scoring() {
    let (mut controller, _store) = scripted();
    controller.start().expect("Start failed");

    wait_for_index(&controller, 2).await;
    assert_eq!(controller.check_match(), MatchOutcome::Match);
    assert_eq!((controller.score(), controller.correct_answers()), (1, 1));

    wait_for_index(&controller, 3).await;
    assert_eq!(controller.check_match(), MatchOutcome::Mismatch);
    assert_eq!((controller.score(), controller.correct_answers()), (0, 1));

    wait_for_index(&controller, 4).await;
    assert_eq!(controller.check_match(), MatchOutcome::Match);
    assert_eq!((controller.score(), controller.correct_answers()), (1, 2));

    controller.wait_until_idle().await;
    assert_eq!(controller.score(), 1);
    assert_eq!(controller.highscore(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_check_before_history_is_ignored() {
    let (mut controller, _store) = scripted();
    controller.start().expect("Start failed");

    wait_for_index(&controller, 1).await;
    assert_eq!(
        controller.check_match(),
        MatchOutcome::Ignored(IgnoreReason::InsufficientHistory)
    );
    assert_eq!(controller.score(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_double_check_scores_once() {
    let (mut controller, _store) = scripted();
    controller.start().expect("Start failed");

    wait_for_index(&controller, 2).await;
    assert_eq!(controller.check_match(), MatchOutcome::Match);
    assert_eq!(
        controller.check_match(),
        MatchOutcome::Ignored(IgnoreReason::AlreadyResponded)
    );
    assert_eq!(controller.score(), 1);
    assert_eq!(controller.correct_answers(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_check_while_idle_is_ignored() {
    let (controller, _store) = scripted();
    assert_eq!(
        controller.check_match(),
        MatchOutcome::Ignored(IgnoreReason::NotRunning)
    );
}

#[tokio::test(start_paused = true)]
async fn test_untouched_run_scores_nothing() {
    let (mut controller, store) = scripted();
    controller.start().expect("Start failed");
    assert!(controller.is_running());

    controller.wait_until_idle().await;
    assert_eq!(controller.score(), 0);
    assert_eq!(controller.correct_answers(), 0);
    assert_eq!(controller.current_index(), Some(SCRIPT.len() - 1));
    assert_eq!(controller.game_state().current_stimulus(), None);
    assert!(store.saves().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_visual_timing() {
    let (mut controller, _store) = scripted();
    controller.start().expect("Start failed");

    sleep(Duration::from_millis(1499)).await;
    let state = controller.game_state();
    assert!(state.is_active());
    assert_eq!(state.current_stimulus(), Some(3));
    assert_eq!(state.current_label(), None);

    sleep(Duration::from_millis(2)).await;
    let state = controller.game_state();
    assert!(!state.is_active());
    assert_eq!(state.current_stimulus(), None);
    assert_eq!(controller.current_index(), Some(0));

    sleep(Duration::from_millis(500)).await;
    assert_eq!(controller.game_state().current_stimulus(), Some(5));
    assert_eq!(controller.current_index(), Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_audio_holds_full_interval_and_speaks_once_per_trial() {
    let presenter = Arc::new(RecordingPresenter::default());
    let store = Arc::new(MemoryHighscoreStore::default());
    let mut controller = controller_with(&SCRIPT, presenter.clone(), store);
    controller.set_mode(GameMode::Audio);
    controller.start().expect("Start failed");

    sleep(Duration::from_millis(1999)).await;
    let state = controller.game_state();
    assert!(state.is_active());
    assert_eq!(state.current_label(), Some("d"));

    sleep(Duration::from_millis(2)).await;
    assert!(!controller.game_state().is_active());
    assert_eq!(controller.game_state().current_label(), None);

    controller.wait_until_idle().await;
    assert_eq!(presenter.spoken(), ["d", "f", "d", "h", "d", "f"]);
}

#[tokio::test(start_paused = true)]
async fn test_audio_visual_presents_both_channels() {
    let presenter = Arc::new(RecordingPresenter::default());
    let store = Arc::new(MemoryHighscoreStore::default());
    let mut controller = controller_with(&SCRIPT, presenter.clone(), store);
    controller.set_mode(GameMode::AudioVisual);
    controller.start().expect("Start failed");

    sleep(Duration::from_millis(1000)).await;
    let state = controller.game_state();
    assert_eq!(state.current_stimulus(), Some(3));
    assert_eq!(state.current_label(), Some("d"));

    sleep(Duration::from_millis(501)).await;
    assert!(!controller.game_state().is_active());

    controller.wait_until_idle().await;
    assert_eq!(presenter.spoken().len(), SCRIPT.len());
}

#[tokio::test(start_paused = true)]
async fn test_mode_change_applies_to_next_run() {
    let presenter = Arc::new(RecordingPresenter::default());
    let store = Arc::new(MemoryHighscoreStore::default());
    let mut controller = controller_with(&SCRIPT, presenter.clone(), store);
    controller.start().expect("Start failed");

    wait_for_index(&controller, 1).await;
    controller.set_mode(GameMode::Audio);
    assert_eq!(controller.mode(), GameMode::Audio);
    assert_eq!(controller.game_state().mode(), GameMode::Visual);

    controller.wait_until_idle().await;
    assert!(presenter.spoken().is_empty());
    assert_eq!(controller.game_state().mode(), GameMode::Audio);

    controller.start().expect("Restart failed");
    controller.wait_until_idle().await;
    assert_eq!(presenter.spoken().len(), SCRIPT.len());
}

#[tokio::test(start_paused = true)]
async fn test_visual_run_stays_visible_after_mode_change() {
    let (mut controller, _store) = scripted();
    controller.start().expect("Start failed");

    wait_for_index(&controller, 1).await;
    controller.set_mode(GameMode::Audio);
    wait_for_index(&controller, 2).await;

    let state = controller.game_state();
    assert!(state.is_active());
    assert_eq!(state.current_stimulus(), Some(3));
    assert_eq!(state.mode(), GameMode::Visual);
    assert!(state.mode().shows_grid());
    assert_eq!(state.current_label(), None);

    controller.stop();
    assert_eq!(controller.game_state().mode(), GameMode::Audio);
}

#[tokio::test(start_paused = true)]
async fn test_stop_mid_run() {
    let sequence: Vec<Stimulus> = (0..20).map(|i| i % 9).collect();
    let store = Arc::new(MemoryHighscoreStore::default());
    let mut controller = controller_with(&sequence, Arc::new(SilentPresenter), store);
    controller.start().expect("Start failed");

    wait_for_index(&controller, 3).await;
    assert!(controller.game_state().is_active());
    controller.stop();

    assert!(!controller.is_running());
    assert_eq!(controller.game_state().current_stimulus(), None);
    assert!(!controller.game_state().is_active());

    sleep(Duration::from_secs(120)).await;
    assert_eq!(controller.current_index(), Some(3));
    assert_eq!(controller.game_state().current_stimulus(), None);
    assert!(!controller.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_restart_replaces_running_run() {
    let (mut controller, _store) = scripted();
    controller.start().expect("Start failed");

    wait_for_index(&controller, 2).await;
    assert_eq!(controller.check_match(), MatchOutcome::Match);

    wait_for_index(&controller, 3).await;
    controller.start().expect("Restart failed");
    assert!(controller.is_running());
    assert_eq!(controller.score(), 0);
    assert_eq!(controller.correct_answers(), 0);
    assert_eq!(controller.current_index(), None);

    wait_for_index(&controller, 2).await;
    assert_eq!(controller.check_match(), MatchOutcome::Match);
    assert_eq!(controller.score(), 1);

    controller.wait_until_idle().await;
    assert_eq!(controller.current_index(), Some(SCRIPT.len() - 1));
}

#[tokio::test(start_paused = true)]
async fn test_sequence_failure_prevents_start() {
    let store = Arc::new(MemoryHighscoreStore::default());
    let mut controller = GameController::new(
        GameConfig::default(),
        Arc::new(FailingProvider),
        Arc::new(SilentPresenter),
        store,
    )
    .expect("Valid config");

    let result = controller.start();
    assert!(matches!(result, Err(GameError::Sequence(_))));
    assert!(!controller.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_provider_breaking_contract_prevents_start() {
    let store = Arc::new(MemoryHighscoreStore::default());
    let mut controller = GameController::new(
        GameConfig::default().with_number_of_events(4),
        Arc::new(FixedSequenceProvider::new(vec![1, 2, 30, 4])),
        Arc::new(SilentPresenter),
        store,
    )
    .expect("Valid config");

    assert!(matches!(controller.start(), Err(GameError::Sequence(_))));
    assert!(!controller.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_config_rejected() {
    let result = GameController::new(
        GameConfig::default().with_n_back(0),
        Arc::new(FixedSequenceProvider::new(SCRIPT.to_vec())),
        Arc::new(SilentPresenter),
        Arc::new(MemoryHighscoreStore::default()),
    );
    assert!(matches!(result, Err(GameError::Config(_))));
}

#[tokio::test(start_paused = true)]
async fn test_speech_failure_does_not_stop_run() {
    let store = Arc::new(MemoryHighscoreStore::default());
    let mut controller = controller_with(&SCRIPT, Arc::new(BrokenPresenter), store);
    controller.set_mode(GameMode::Audio);
    controller.start().expect("Start failed");

    wait_for_index(&controller, 2).await;
    assert_eq!(controller.game_state().current_label(), Some("d"));
    assert_eq!(controller.check_match(), MatchOutcome::Match);

    controller.wait_until_idle().await;
    assert_eq!(controller.current_index(), Some(SCRIPT.len() - 1));
    assert_eq!(controller.score(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_presenter_abandons_run() {
    let store = Arc::new(MemoryHighscoreStore::default());
    let mut controller = controller_with(&SCRIPT, Arc::new(PanickingPresenter { on: "h" }), store);
    controller.set_mode(GameMode::Audio);
    controller.start().expect("Start failed");

    controller.wait_until_idle().await;
    assert!(!controller.is_running());
    assert_eq!(controller.current_index(), Some(3));
    assert_eq!(controller.game_state().current_stimulus(), None);
}

#[tokio::test(start_paused = true)]
async fn test_match_persists_highscore_immediately() {
    let (mut controller, store) = scripted();
    controller.start().expect("Start failed");

    wait_for_index(&controller, 2).await;
    assert_eq!(controller.check_match(), MatchOutcome::Match);
    assert_eq!(controller.highscore(), 1);

    wait_for_stored(&store, 1).await;
    assert!(controller.is_running());

    controller.wait_until_idle().await;
    assert_eq!(store.saves(), [1]);
}

#[tokio::test(start_paused = true)]
async fn test_highscore_not_lowered_by_weaker_run() {
    let store = Arc::new(MemoryHighscoreStore::new(5));
    let mut controller = controller_with(&SCRIPT, Arc::new(SilentPresenter), Arc::clone(&store));
    assert_eq!(controller.highscore(), 5);

    controller.start().expect("Start failed");
    wait_for_index(&controller, 2).await;
    controller.check_match();
    controller.wait_until_idle().await;

    assert_eq!(controller.highscore(), 5);
    assert!(store.saves().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_highscore_follows_store_feed_upward() {
    let (controller, store) = scripted();

    store.publish_external(9);
    controller
        .subscribe_highscore()
        .wait_for(|highscore| *highscore == 9)
        .await
        .expect("Highscore feed closed");

    store.publish_external(4);
    tokio::task::yield_now().await;
    assert_eq!(controller.highscore(), 9);
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_keeps_in_memory_highscore() {
    let (mut controller, store) = scripted();
    store.set_failing(true);
    controller.start().expect("Start failed");

    wait_for_index(&controller, 2).await;
    controller.check_match();
    controller.wait_until_idle().await;

    assert_eq!(controller.highscore(), 1);
    assert!(store.saves().is_empty());
    assert!(!controller.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_highscore_is_best_of_runs() {
    let (mut controller, store) = scripted();

    controller.start().expect("Start failed");
    for index in [2, 4] {
        wait_for_index(&controller, index).await;
        controller.check_match();
    }
    controller.wait_until_idle().await;
    assert_eq!(controller.highscore(), 2);

    controller.start().expect("Restart failed");
    wait_for_index(&controller, 2).await;
    controller.check_match();
    controller.wait_until_idle().await;
    assert_eq!(controller.score(), 1);
    assert_eq!(controller.highscore(), 2);

    wait_for_stored(&store, 2).await;
    assert_eq!(store.saves(), [1, 2]);
}
