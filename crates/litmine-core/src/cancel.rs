//! Cooperative cancellation for long-running jobs.
//!
//! Cancellation is checked between discrete units of work (term pairs,
//! document inserts, cluster polls), never preemptively. The token is
//! shared between the job store, the worker executing the job, and the
//! engine doing the computation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag for one job.
///
/// Cloning the token clones the handle, not the flag; every clone observes
/// the same cancellation state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a new, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Return `Err(Error::Cancelled)` if cancellation has been requested.
    ///
    /// Checkpoint helper for engine loops.
    pub fn checkpoint(&self) -> crate::Result<()> {
        if self.is_cancelled() {
            Err(crate::Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
