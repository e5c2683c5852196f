//! # litmine-core
//!
//! Core types, traits, and abstractions shared by the litmine crates.
//!
//! This crate provides the foundational data structures the rest of the
//! workspace depends on: documents, jobs and their parameter payloads,
//! result records, the error type, cancellation tokens, and the
//! centralized default constants.

pub mod cancel;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;

// Re-export commonly used types at crate root
pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use models::*;
