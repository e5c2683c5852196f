//! One handler per job type.
//!
//! The worker dispatches on the closed [`JobType`](litmine_core::JobType)
//! tag; each handler unpacks its own parameter struct and runs the
//! corresponding engine against the shared term index.

mod hypothesis;
mod index;
mod kinderminer;
mod skim;

pub use hypothesis::HypothesisEvalHandler;
pub use index::IndexHandler;
pub use kinderminer::KinderMinerHandler;
pub use skim::SkimHandler;
