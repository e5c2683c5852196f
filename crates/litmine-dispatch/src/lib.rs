//! # litmine-dispatch
//!
//! Hypothesis-evaluation dispatcher: packages discovered triples, submits
//! them as an opaque batch job to an external compute cluster, polls for
//! completion, and merges the returned plausibility scores back into the
//! results.
//!
//! The cluster is treated as a slow, possibly-unreliable dependency: the
//! dispatcher never blocks a thread on the remote call (polling is a
//! bounded-interval, resumable check), tolerates a handle that never
//! reaches done (overall timeout), and surfaces remote failures with a
//! distinguishable cause.
//!
//! # Feature Flags
//!
//! - `mock`: Enable the scripted in-process cluster (for tests)

pub mod cluster;
pub mod config;
pub mod dispatcher;
pub mod http;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use litmine_core::*;

pub use cluster::{BatchCluster, ClusterHandle, ClusterStatus, EvalRequest};
pub use config::{Credentials, DispatchConfig};
pub use dispatcher::HypothesisDispatcher;
pub use http::HttpBatchCluster;
