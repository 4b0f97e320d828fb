//! Application state and key handling.

use crossterm::event::KeyCode;
use strictly_nback::{GameController, GameMode, MatchOutcome};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    /// Keep running.
    Continue,
    /// Leave the game.
    Quit,
}

/// Main application state.
pub struct App {
    controller: GameController,
    speech_rx: mpsc::UnboundedReceiver<String>,
    last_spoken: Option<String>,
    status_message: String,
    was_running: bool,
}

impl App {
    /// Creates a new application around a controller.
    pub fn new(controller: GameController, speech_rx: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            controller,
            speech_rx,
            last_spoken: None,
            status_message: "Press 's' to start.".to_string(),
            was_running: false,
        }
    }

    /// The engine being played.
    pub fn controller(&self) -> &GameController {
        &self.controller
    }

    /// Gets the current status message.
    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Letter spoken most recently in the current trial.
    pub fn last_spoken(&self) -> Option<&str> {
        self.last_spoken.as_deref()
    }

    /// Handles a key press.
    #[instrument(skip(self))]
    pub fn handle_key(&mut self, key: KeyCode) -> AppAction {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                info!("User quit");
                self.controller.stop();
                return AppAction::Quit;
            }
            KeyCode::Char('v') => self.select_mode(GameMode::Visual),
            KeyCode::Char('a') => self.select_mode(GameMode::Audio),
            KeyCode::Char('b') => self.select_mode(GameMode::AudioVisual),
            KeyCode::Char('s') | KeyCode::Enter => self.start(),
            KeyCode::Char(' ') | KeyCode::Char('m') => self.check_match(),
            KeyCode::Char('x') => {
                self.controller.stop();
                self.status_message = "Stopped. Press 's' to start again.".to_string();
            }
            _ => {}
        }
        AppAction::Continue
    }

    /// Pulls in speech and notices the end of a run.
    pub fn tick(&mut self) {
        while let Ok(label) = self.speech_rx.try_recv() {
            self.last_spoken = Some(label);
        }
        if !self.controller.game_state().is_active() {
            self.last_spoken = None;
        }

        let running = self.controller.is_running();
        if self.was_running && !running {
            self.status_message = format!(
                "Run over: score {}, {} correct. Press 's' to play again.",
                self.controller.score(),
                self.controller.correct_answers()
            );
        }
        self.was_running = running;
    }

    fn select_mode(&mut self, mode: GameMode) {
        self.controller.set_mode(mode);
        self.status_message = if self.controller.is_running() {
            format!("{} selected for the next run.", mode.label())
        } else {
            format!("{} selected. Press 's' to start.", mode.label())
        };
    }

    fn start(&mut self) {
        match self.controller.start() {
            Ok(()) => {
                self.was_running = true;
                self.status_message = format!(
                    "Press space when the stimulus matches the one {} back.",
                    self.controller.n_back()
                );
            }
            Err(e) => {
                warn!(error = %e, "Could not start run");
                self.status_message = format!("Could not start: {}", e);
            }
        }
    }

    fn check_match(&mut self) {
        let outcome = self.controller.check_match();
        debug!(%outcome, "Match checked");
        self.status_message = match outcome {
            MatchOutcome::Match => "Match!".to_string(),
            MatchOutcome::Mismatch => "No match.".to_string(),
            MatchOutcome::Ignored(reason) => format!("Not counted: {}.", reason),
        };
    }
}
