//! # litmine-index
//!
//! Document store and positional inverted index over the abstract corpus.
//!
//! This crate provides:
//! - A biomedical-text tokenizer (lowercase alphanumeric and Greek runs)
//! - Query-term sanitization, including `&&`/`||` term expressions
//! - A positional inverted index supporting phrase lookup, year censoring,
//!   and deterministic top-N article selection
//! - Idempotent document insertion and citation-count backfill
//!
//! The index is a shared, read-heavy resource: lookups take a read lock and
//! may run concurrently; a document insert takes the write lock once, so
//! readers never observe a half-applied insert.

pub mod document;
pub mod index;
pub mod tokenizer;

pub use document::DocumentStore;
pub use index::TermIndex;
pub use tokenizer::{sanitize_term, tokenize, LOGICAL_AND, LOGICAL_OR};
