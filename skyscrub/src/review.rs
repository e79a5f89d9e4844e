//! Hooks for an external review frontend.
//!
//! A frontend registers a pair of capabilities: one that is handed each
//! frame with outliers before it is painted, and one reporting how many
//! frames it is still holding. The pipeline will not declare the run
//! complete while reviews are pending. Configuring one half of the pair
//! without the other is a startup error.

use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::error::{Result, SkyscrubError};
use crate::frame::{Frame, StateChangeCallback};

/// Handed a frame with a nonzero outlier count before it leaves the
/// inter-frame stage. May flip decisions with [`Frame::user_select`].
pub type FrameCheckCallback = dyn Fn(&mut Frame) + Send + Sync;

/// Number of frames the review frontend is still holding.
pub type PendingReviewCount = dyn Fn() -> usize + Send + Sync;

/// Optional external hooks into a pipeline run.
#[derive(Default, Clone)]
pub struct Callbacks {
    /// Called on every frame state transition; drives progress display.
    pub frame_state_change: Option<Arc<StateChangeCallback>>,
    pub frame_check: Option<Arc<FrameCheckCallback>>,
    pub pending_review_count: Option<Arc<PendingReviewCount>>,
    /// Signalled by the frontend each time a pending review resolves, so
    /// shutdown can block instead of spinning.
    pub review_done: Option<Receiver<()>>,
}

impl Callbacks {
    /// The review pair must be configured together or not at all.
    pub fn validate(&self) -> Result<()> {
        match (&self.frame_check, &self.pending_review_count) {
            (Some(_), None) => Err(SkyscrubError::Config(
                "frame_check is configured without pending_review_count".into(),
            )),
            (None, Some(_)) => Err(SkyscrubError::Config(
                "pending_review_count is configured without frame_check".into(),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_callbacks_are_valid() {
        assert!(Callbacks::default().validate().is_ok());
    }

    #[test]
    fn test_half_configured_review_pair_is_fatal() {
        let half = Callbacks {
            frame_check: Some(Arc::new(|_frame: &mut Frame| {})),
            ..Callbacks::default()
        };
        assert!(half.validate().is_err());

        let other_half = Callbacks {
            pending_review_count: Some(Arc::new(|| 0)),
            ..Callbacks::default()
        };
        assert!(other_half.validate().is_err());
    }

    #[test]
    fn test_full_review_pair_is_valid() {
        let full = Callbacks {
            frame_check: Some(Arc::new(|_frame: &mut Frame| {})),
            pending_review_count: Some(Arc::new(|| 0)),
            ..Callbacks::default()
        };
        assert!(full.validate().is_ok());
    }
}
