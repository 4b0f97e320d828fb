//! Terminal UI for N-Back Trainer

mod app;
mod speaker;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use strictly_nback::{
    FileHighscoreStore, GameConfig, GameController, GameMode, RandomSequenceProvider,
};
use tokio::time::{Duration, sleep};
use tracing::{error, info, instrument};

use app::{App, AppAction};
use speaker::ChannelSpeaker;

/// Runs the terminal game until the user quits.
pub async fn run_tui(
    mode: GameMode,
    config_path: Option<PathBuf>,
    highscore_file: PathBuf,
    seed: Option<u64>,
) -> Result<()> {
    // Setup logging to file to avoid interfering with TUI
    let log_file = std::fs::File::create("nback_trainer.log")?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .try_init(); // Don't panic if already initialized

    info!("Starting N-Back Trainer TUI");

    let config = match &config_path {
        Some(path) => GameConfig::from_file(path)?,
        None => GameConfig::default(),
    };
    ensure!(
        *config.domain_size() <= ui::MAX_DOMAIN_SIZE,
        "domain_size {} does not fit the grid (at most {})",
        config.domain_size(),
        ui::MAX_DOMAIN_SIZE
    );
    let provider = match seed {
        Some(seed) => RandomSequenceProvider::seeded(seed),
        None => RandomSequenceProvider::new(),
    };
    let store = FileHighscoreStore::open(&highscore_file)
        .with_context(|| format!("Failed to open {}", highscore_file.display()))?;
    let (speaker, speech_rx) = ChannelSpeaker::new();

    let controller = GameController::new(
        config,
        Arc::new(provider),
        Arc::new(speaker),
        Arc::new(store),
    )?;
    controller.set_mode(mode);
    let mut app = App::new(controller, speech_rx);

    let mut terminal = ratatui::init();
    let res = run_loop(&mut terminal, &mut app).await;
    ratatui::restore();

    if let Err(err) = &res {
        error!(error = ?err, "Game loop error");
    }
    res
}

/// Draw/input loop.
#[instrument(skip_all)]
async fn run_loop(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|frame| ui::draw(frame, app))?;

        // Poll for input with short timeout to keep the grid responsive.
        if event::poll(Duration::from_millis(30))?
            && let Event::Key(key) = event::read()?
        {
            // Skip key release events (crossterm fires both press and release).
            if key.kind == KeyEventKind::Release {
                continue;
            }
            if app.handle_key(key.code) == AppAction::Quit {
                return Ok(());
            }
        }

        sleep(Duration::from_millis(10)).await;
    }
}
