//! Command-line interface for nback_trainer.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use strictly_nback::GameMode;

/// N-Back Trainer - terminal n-back memory game
#[derive(Parser, Debug)]
#[command(name = "nback_trainer")]
#[command(about = "Train working memory with an n-back game", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play in the terminal
    Play {
        /// Initial presentation mode (visual, audio, audio-visual)
        #[arg(short, long, default_value = "visual")]
        mode: GameMode,

        /// Path to a TOML game config; defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Where the highscore is kept
        #[arg(long, default_value = "nback_highscore.json")]
        highscore_file: PathBuf,

        /// Seed for reproducible sequences
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the default game config as TOML
    DefaultConfig,
}
