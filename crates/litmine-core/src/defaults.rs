//! Centralized default constants for the litmine system.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers. When adding new constants, place them in the appropriate
//! section and document the rationale for the chosen value.

// =============================================================================
// CENSORING
// =============================================================================

/// Lowest accepted publication year for censored queries.
pub const MIN_CENSOR_YEAR: i32 = 1000;

/// Highest accepted publication year for censored queries.
pub const MAX_CENSOR_YEAR: i32 = 2100;

// =============================================================================
// QUERY LIMITS
// =============================================================================

/// Maximum number of A-terms accepted in one job submission.
pub const MAX_A_TERMS: usize = 100;

/// Maximum tokens in a single (phrase) term.
pub const MAX_TERM_TOKENS: usize = 10;

// =============================================================================
// SCORING
// =============================================================================

/// Cap on -log10(p). f64 p-values underflow to 0 below ~1e-323, so both
/// score components saturate here.
pub const FET_SCORE_CAP: f64 = 323.0;

/// Weight applied to -log10(1 - sort_ratio) so the ratio discriminates
/// up to roughly 0.25-0.3 before saturating.
pub const SORT_RATIO_MULTIPLIER: f64 = 2500.0;

/// Default p-value cutoff for AB pairs.
pub const AB_FET_THRESHOLD: f64 = 1e-5;

/// Default p-value cutoff for BC pairs (near-unfiltered).
pub const BC_FET_THRESHOLD: f64 = 0.9999;

/// Default number of top AB pairs kept for the BC leg of a chain query.
pub const TOP_N_AB: usize = 50;

/// Default number of most recent articles reported in pmid payloads.
pub const TOP_N_ARTICLES_MOST_RECENT: usize = 10;

/// Default number of most cited articles reported in pmid payloads.
pub const TOP_N_ARTICLES_MOST_CITED: usize = 0;

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Highest progress a running job may report; exactly 1.0 is reserved for
/// the finished transition.
pub const RUNNING_PROGRESS_CAP: f64 = 0.9999;

/// Default worker slots for the high priority tier.
pub const WORKERS_HIGH: usize = 1;

/// Default worker slots for the medium priority tier.
pub const WORKERS_MEDIUM: usize = 2;

/// Default worker slots for the low priority tier.
pub const WORKERS_LOW: usize = 1;

/// Polling interval when all queues are empty (milliseconds).
pub const JOB_POLL_INTERVAL_MS: u64 = 500;

/// Per-job execution timeout (12 hours, matching long chain queries).
pub const JOB_TIMEOUT_SECS: u64 = 12 * 60 * 60;

/// Default maximum retry count for failed jobs. Retries are opt-in.
pub const JOB_MAX_RETRIES: u32 = 0;

/// Worker event broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// HYPOTHESIS EVALUATION
// =============================================================================

/// Interval between batch-cluster status polls (seconds).
pub const CLUSTER_POLL_INTERVAL_SECS: u64 = 30;

/// Overall deadline for a batch-cluster evaluation (6 hours).
pub const CLUSTER_TIMEOUT_SECS: u64 = 6 * 60 * 60;

/// Default model requested for hypothesis evaluation.
pub const EVAL_MODEL: &str = "o3-mini";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_censor_year_bounds_ordered() {
        assert!(MIN_CENSOR_YEAR < MAX_CENSOR_YEAR);
    }

    #[test]
    fn test_running_progress_cap_below_one() {
        assert!(RUNNING_PROGRESS_CAP < 1.0);
        assert!(RUNNING_PROGRESS_CAP > 0.99);
    }

    #[test]
    fn test_thresholds_are_probabilities() {
        assert!((0.0..=1.0).contains(&AB_FET_THRESHOLD));
        assert!((0.0..=1.0).contains(&BC_FET_THRESHOLD));
    }

    #[test]
    fn test_default_pool_is_nonempty() {
        assert!(WORKERS_HIGH + WORKERS_MEDIUM + WORKERS_LOW > 0);
    }
}
