//! # litmine-jobs
//!
//! Background job queue system for litmine.
//!
//! This crate provides:
//! - An in-memory job store with three priority FIFO queues and atomic
//!   status transitions
//! - Async job processing with a bounded worker pool
//! - Progress tracking and notifications via broadcast channels
//! - Cooperative cancellation of queued and running jobs
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use litmine_core::{JobParams, JobPriority};
//! use litmine_index::TermIndex;
//! use litmine_jobs::{JobWorker, KinderMinerHandler, MemoryJobStore, WorkerConfig};
//!
//! let index = Arc::new(TermIndex::new());
//! let store = Arc::new(MemoryJobStore::new());
//!
//! let worker = JobWorker::new(store.clone(), WorkerConfig::from_env());
//! worker.register_handler(KinderMinerHandler::new(index.clone())).await;
//! let handle = worker.start();
//!
//! let job_id = store.submit(params, JobPriority::High)?;
//! // poll store.get(job_id) until a terminal state
//!
//! handle.shutdown().await?;
//! ```

pub mod handler;
pub mod handlers;
pub mod store;
pub mod worker;

// Re-export core types
pub use litmine_core::*;

pub use handler::{JobContext, JobHandler, JobResult, NoOpHandler};
pub use handlers::{HypothesisEvalHandler, IndexHandler, KinderMinerHandler, SkimHandler};
pub use store::MemoryJobStore;
pub use worker::{JobWorker, WorkerConfig, WorkerEvent, WorkerHandle};

/// Default polling interval for job processing (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = litmine_core::defaults::JOB_POLL_INTERVAL_MS;
