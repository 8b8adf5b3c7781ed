//! Coarse-grained cancellation for pipeline runs
//!
//! The owning job controller may signal cancellation at any time; the engine
//! checks the token between stage boundaries and aborts without partial
//! output. There is no mid-frame cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{EngineError, Stage};

/// Shared cancellation flag, cheap to clone across the controller and the
/// engine invocation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True if cancellation has been signalled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Stage-boundary check: returns `EngineError::Cancelled` naming the
    /// stage that was about to run.
    pub fn checkpoint(&self, next_stage: Stage) -> Result<(), EngineError> {
        if self.is_cancelled() {
            log::info!("Cancellation observed before {}", next_stage);
            return Err(EngineError::Cancelled { stage: next_stage });
        }
        Ok(())
    }
}
