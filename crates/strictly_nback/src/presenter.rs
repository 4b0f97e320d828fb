//! Presentation side effects.

use tracing::instrument;

use crate::PresentError;

/// Capability that turns a stimulus into sound.
///
/// Visual presentation needs no call: front-ends watch
/// [`crate::GameState`] instead. `speak` must hand the label off and
/// return without waiting for playback.
pub trait StimulusPresenter: Send + Sync {
    /// Speaks the label of the current stimulus.
    fn speak(&self, label: &str) -> Result<(), PresentError>;
}

/// Presenter that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPresenter;

impl StimulusPresenter for SilentPresenter {
    #[instrument(skip(self))]
    fn speak(&self, _label: &str) -> Result<(), PresentError> {
        Ok(())
    }
}
