//! The batch-cluster client boundary.
//!
//! The dispatcher only needs three operations from the remote cluster:
//! submit a payload, check on a handle, cancel a handle. Everything behind
//! them (schedulers, containers, the model call itself) is opaque.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use litmine_core::{PlausibilityScore, Result, TripleResult};

use crate::config::Credentials;

/// Payload submitted to the cluster: the triple list, the requested
/// evaluation model, and the externally supplied credentials the remote
/// job runs with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRequest {
    pub model: String,
    pub credentials: Credentials,
    pub triples: Vec<TripleResult>,
}

/// Opaque handle identifying a submitted cluster job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterHandle(pub String);

impl std::fmt::Display for ClusterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Observed state of a cluster job.
#[derive(Debug, Clone)]
pub enum ClusterStatus {
    /// Still queued or running remotely.
    Pending,
    /// Finished; plausibility scores are available.
    Done(Vec<PlausibilityScore>),
    /// Failed remotely with a reason.
    Failed(String),
}

/// Client for the external batch-compute cluster.
#[async_trait]
pub trait BatchCluster: Send + Sync {
    /// Submit an evaluation and return its handle.
    async fn submit(&self, request: &EvalRequest) -> Result<ClusterHandle>;

    /// Check on a submitted evaluation. A repeatable, resumable check, not
    /// a blocking wait.
    async fn status(&self, handle: &ClusterHandle) -> Result<ClusterStatus>;

    /// Best-effort cancellation of a submitted evaluation.
    async fn cancel(&self, handle: &ClusterHandle) -> Result<()>;
}
