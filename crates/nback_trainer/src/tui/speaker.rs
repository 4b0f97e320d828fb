//! Audio channel for the terminal: spoken letters are shown on screen.

use strictly_nback::{PresentError, StimulusPresenter};
use tokio::sync::mpsc;
use tracing::{debug, instrument};

/// Forwards spoken labels to the UI loop.
#[derive(Debug, Clone)]
pub struct ChannelSpeaker {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSpeaker {
    /// Creates a speaker and the receiver the UI drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StimulusPresenter for ChannelSpeaker {
    #[instrument(skip(self))]
    fn speak(&self, label: &str) -> Result<(), PresentError> {
        debug!(label, "Speaking");
        self.tx
            .send(label.to_string())
            .map_err(|_| PresentError::new("Terminal UI is no longer listening"))
    }
}
