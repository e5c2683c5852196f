//! # litmine-engine
//!
//! The statistical core: exact co-occurrence significance over the term
//! index, and the drivers that apply it across term sets.
//!
//! This crate provides:
//! - 2x2 contingency tables and a one-sided Fisher's exact test evaluated
//!   in log space (stable for corpus sizes in the millions)
//! - The sort-ratio and prediction-score ranking functions
//! - `pairwise` — the KinderMiner cross-product driver
//! - `chain` — the SKiM two-hop driver (two pairwise legs joined on the
//!   shared middle term)
//!
//! Results are a pure function of (terms, corpus snapshot, parameters):
//! recomputing against an unchanged index yields bit-identical counts and
//! p-values.

pub mod kinderminer;
pub mod skim;
pub mod stats;

pub use kinderminer::{pairwise, PairwiseOptions};
pub use skim::{chain, ChainOptions};
pub use stats::{fisher_exact_greater, prediction_score, sort_ratio, ContingencyTable};
