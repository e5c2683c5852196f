//! Structured logging schema and field name constants for litmine.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), job completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (term pairs, postings) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "index", "engine", "jobs", "dispatch"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "pairwise", "chain", "claim_next", "submit_evaluation"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Job type enum variant.
pub const JOB_TYPE: &str = "job_type";

/// Job priority tier.
pub const PRIORITY: &str = "priority";

/// Query term text (sanitized form).
pub const TERM: &str = "term";

/// Batch-cluster job handle.
pub const CLUSTER_HANDLE: &str = "cluster_handle";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of term pairs evaluated by a query.
pub const PAIR_COUNT: &str = "pair_count";

/// Number of documents touched by an indexing batch.
pub const DOC_COUNT: &str = "doc_count";

/// Number of result records produced.
pub const RESULT_COUNT: &str = "result_count";

/// Job progress fraction in [0, 1].
pub const PROGRESS: &str = "progress";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
