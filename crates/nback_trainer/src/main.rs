//! N-Back Trainer - Terminal front-end
//!
//! Plays the strictly_nback engine in a terminal window.

#![warn(missing_docs)]

mod cli;
mod tui;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use strictly_nback::GameConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            mode,
            config,
            highscore_file,
            seed,
        } => tui::run_tui(mode, config, highscore_file, seed).await,
        Command::DefaultConfig => {
            print!("{}", GameConfig::default().to_toml()?);
            Ok(())
        }
    }
}
