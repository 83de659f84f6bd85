//! Session state observers
//!
//! Observers receive every [`StateTransition`] synchronously, in order, so
//! frontends can react to a session without polling it.

use crate::session::{SegmentationState, StateTransition};

/// Trait for reacting to segmentation state changes
pub trait StateObserver: Send + Sync {
    /// Called once per transition while the session is locked
    ///
    /// Implementations must return quickly and must not call back into the session.
    fn on_transition(&self, transition: &StateTransition);
}

/// Observer that discards all transitions
pub struct NoOpObserver;

impl StateObserver for NoOpObserver {
    fn on_transition(&self, _transition: &StateTransition) {}
}

/// Observer that logs transitions
pub struct LoggingObserver {
    verbose: bool,
}

impl LoggingObserver {
    /// Create a new logging observer
    ///
    /// # Arguments
    /// * `verbose` - Also log `Idle` and `Processing` transitions
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl StateObserver for LoggingObserver {
    fn on_transition(&self, transition: &StateTransition) {
        match &transition.state {
            SegmentationState::Success(bitmap) => log::info!(
                "✅ Segmentation {} finished ({}x{})",
                transition.generation,
                bitmap.width(),
                bitmap.height()
            ),
            SegmentationState::Error(err) => log::error!(
                "❌ Segmentation {} failed [{}]: {}",
                transition.generation,
                err.code(),
                err
            ),
            state if self.verbose => {
                log::info!("Segmentation {}: {}", transition.generation, state);
            },
            _ => {},
        }
    }
}
