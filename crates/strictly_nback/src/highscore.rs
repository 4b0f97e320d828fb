//! Highscore persistence.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::StoreError;

/// Durable home of the best score.
#[async_trait]
pub trait HighscoreStore: Send + Sync {
    /// Live view of the stored highscore.
    ///
    /// The current value is the initial load; later values are external
    /// updates, including the echo of this process's own saves.
    fn feed(&self) -> watch::Receiver<u32>;

    /// Stores an absolute highscore value.
    async fn save(&self, highscore: u32) -> Result<(), StoreError>;
}

/// In-process store, useful for tests and ephemeral sessions.
#[derive(Debug)]
pub struct MemoryHighscoreStore {
    feed: watch::Sender<u32>,
    saves: Mutex<Vec<u32>>,
    failing: AtomicBool,
}

impl MemoryHighscoreStore {
    /// Creates a store holding `initial`.
    #[instrument]
    pub fn new(initial: u32) -> Self {
        let (feed, _) = watch::channel(initial);
        Self {
            feed,
            saves: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Every value passed to a successful `save`, in order.
    pub fn saves(&self) -> Vec<u32> {
        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Value currently stored.
    pub fn stored(&self) -> u32 {
        *self.feed.borrow()
    }

    /// Simulates another writer changing the stored value.
    #[instrument(skip(self))]
    pub fn publish_external(&self, highscore: u32) {
        self.feed.send_replace(highscore);
    }

    /// Makes subsequent saves fail (or succeed again).
    #[instrument(skip(self))]
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Default for MemoryHighscoreStore {
    fn default() -> Self {
        Self::new(0)
    }
}

#[async_trait]
impl HighscoreStore for MemoryHighscoreStore {
    fn feed(&self) -> watch::Receiver<u32> {
        self.feed.subscribe()
    }

    #[instrument(skip(self))]
    async fn save(&self, highscore: u32) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            warn!(highscore, "Rejecting save");
            return Err(StoreError::new("Store is unavailable"));
        }
        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(highscore);
        self.feed.send_replace(highscore);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct HighscoreRecord {
    highscore: u32,
}

/// Store backed by a small JSON document on disk.
#[derive(Debug)]
pub struct FileHighscoreStore {
    path: PathBuf,
    feed: watch::Sender<u32>,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileHighscoreStore {
    /// Opens the store at `path`. A missing file counts as a highscore of 0.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file exists but cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let initial = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<HighscoreRecord>(&content)?.highscore,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No highscore file yet");
                0
            }
            Err(e) => return Err(e.into()),
        };
        info!(highscore = initial, "Highscore store opened");

        let (feed, _) = watch::channel(initial);
        Ok(Self {
            path,
            feed,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HighscoreStore for FileHighscoreStore {
    fn feed(&self) -> watch::Receiver<u32> {
        self.feed.subscribe()
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn save(&self, highscore: u32) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let content = serde_json::to_string_pretty(&HighscoreRecord { highscore })?;
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        tokio::fs::write(&staging, content).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        self.feed.send_replace(highscore);
        info!(highscore, "Highscore saved");
        Ok(())
    }
}
