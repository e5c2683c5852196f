//! Scripted in-process cluster for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use litmine_core::{PlausibilityScore, Result};

use crate::cluster::{BatchCluster, ClusterHandle, ClusterStatus, EvalRequest};

/// A cluster whose terminal answer is fixed up front and reached after a
/// configurable number of pending polls. Records every submission and
/// cancellation for assertions.
pub struct MockCluster {
    pending_polls: AtomicUsize,
    terminal: ClusterStatus,
    submissions: Mutex<Vec<EvalRequest>>,
    cancellations: Mutex<Vec<ClusterHandle>>,
}

impl MockCluster {
    /// Finish with `scores` after reporting pending `polls` times.
    pub fn completing_after(polls: usize, scores: Vec<PlausibilityScore>) -> Self {
        Self {
            pending_polls: AtomicUsize::new(polls),
            terminal: ClusterStatus::Done(scores),
            submissions: Mutex::new(Vec::new()),
            cancellations: Mutex::new(Vec::new()),
        }
    }

    /// Report pending forever.
    pub fn never_completing() -> Self {
        Self {
            pending_polls: AtomicUsize::new(usize::MAX),
            terminal: ClusterStatus::Pending,
            submissions: Mutex::new(Vec::new()),
            cancellations: Mutex::new(Vec::new()),
        }
    }

    /// Fail remotely with `reason` after reporting pending `polls` times.
    pub fn failing_after(polls: usize, reason: impl Into<String>) -> Self {
        Self {
            pending_polls: AtomicUsize::new(polls),
            terminal: ClusterStatus::Failed(reason.into()),
            submissions: Mutex::new(Vec::new()),
            cancellations: Mutex::new(Vec::new()),
        }
    }

    /// Requests submitted so far.
    pub fn submissions(&self) -> Vec<EvalRequest> {
        self.submissions.lock().expect("mock lock").clone()
    }

    /// Handles cancelled so far.
    pub fn cancellations(&self) -> Vec<ClusterHandle> {
        self.cancellations.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl BatchCluster for MockCluster {
    async fn submit(&self, request: &EvalRequest) -> Result<ClusterHandle> {
        let mut submissions = self.submissions.lock().expect("mock lock");
        submissions.push(request.clone());
        Ok(ClusterHandle(format!("mock-{}", submissions.len())))
    }

    async fn status(&self, _handle: &ClusterHandle) -> Result<ClusterStatus> {
        let remaining = self.pending_polls.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.pending_polls.store(remaining - 1, Ordering::SeqCst);
            }
            return Ok(ClusterStatus::Pending);
        }
        Ok(self.terminal.clone())
    }

    async fn cancel(&self, handle: &ClusterHandle) -> Result<()> {
        self.cancellations
            .lock()
            .expect("mock lock")
            .push(handle.clone());
        Ok(())
    }
}
