//! Core data model: documents, jobs, job parameters, and result records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};

/// Stable document identifier (PubMed-style numeric id).
pub type DocId = u64;

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// A document as supplied to the indexing job type.
///
/// Documents are immutable once indexed; only the citation count may be
/// backfilled later via [`CitationUpdate`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentInput {
    pub id: DocId,
    /// Publication year, when known.
    #[serde(default)]
    pub year: Option<i32>,
    /// Citation count from an external citation dataset, when known.
    #[serde(default)]
    pub citation_count: Option<u32>,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

impl DocumentInput {
    /// The text that gets tokenized and indexed: title plus abstract.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }
}

/// Citation-count backfill record, applied by document id without
/// re-tokenizing the document text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CitationUpdate {
    pub id: DocId,
    pub citation_count: u32,
}

/// Inclusive publication-year bounds for censored queries.
///
/// The public `censor_year` parameter is the upper bound; an optional lower
/// bound is accepted as well. An unbounded range matches every document,
/// including documents with no recorded year; a bounded range excludes
/// documents without a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub lower: i32,
    pub upper: i32,
}

impl YearRange {
    /// The range matching the whole corpus.
    pub fn unbounded() -> Self {
        Self {
            lower: defaults::MIN_CENSOR_YEAR,
            upper: defaults::MAX_CENSOR_YEAR,
        }
    }

    /// Build a range from optional job parameters, clamping to the accepted
    /// censor-year limits.
    pub fn from_params(lower: Option<i32>, upper: Option<i32>) -> Self {
        Self {
            lower: lower
                .unwrap_or(defaults::MIN_CENSOR_YEAR)
                .max(defaults::MIN_CENSOR_YEAR),
            upper: upper
                .unwrap_or(defaults::MAX_CENSOR_YEAR)
                .min(defaults::MAX_CENSOR_YEAR),
        }
    }

    /// Whether this range matches the whole corpus.
    pub fn is_unbounded(&self) -> bool {
        self.lower <= defaults::MIN_CENSOR_YEAR && self.upper >= defaults::MAX_CENSOR_YEAR
    }

    /// Whether a document with the given publication year falls inside the
    /// range.
    pub fn contains(&self, year: Option<i32>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        match year {
            Some(y) => y >= self.lower && y <= self.upper,
            None => false,
        }
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::unbounded()
    }
}

// ---------------------------------------------------------------------------
// Job metadata
// ---------------------------------------------------------------------------

/// Status of a job in the queue.
///
/// `queued → running → {finished | failed}` with `queued → cancelled` and
/// `running → cancelled` as externally triggered edges. Terminal states
/// never transition further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Finished,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether the status is terminal (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Finished | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Finished => "finished",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of job to process. A small closed set; the scheduler dispatches on
/// this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Pairwise co-occurrence significance query (A-terms x B-terms)
    Kinderminer,
    /// Chained two-hop query (A-B joined with B-C on the shared B-term)
    Skim,
    /// Corpus indexing batch (exclusive writer over the term index)
    Index,
    /// LLM plausibility scoring of discovered triples on the batch cluster
    HypothesisEval,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Kinderminer => "kinderminer",
            JobType::Skim => "skim",
            JobType::Index => "index",
            JobType::HypothesisEval => "hypothesis_eval",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority tier for job dispatch. High is always preferred over medium,
/// medium over low; FIFO within a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    High,
    Medium,
    Low,
}

impl JobPriority {
    /// All tiers in dispatch preference order.
    pub const ALL: [JobPriority; 3] = [JobPriority::High, JobPriority::Medium, JobPriority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobPriority::High => "high",
            JobPriority::Medium => "medium",
            JobPriority::Low => "low",
        }
    }
}

impl std::fmt::Display for JobPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Job parameters
// ---------------------------------------------------------------------------

fn default_top_n_ab() -> usize {
    defaults::TOP_N_AB
}

fn default_ab_fet_threshold() -> f64 {
    defaults::AB_FET_THRESHOLD
}

fn default_bc_fet_threshold() -> f64 {
    defaults::BC_FET_THRESHOLD
}

fn default_eval_model() -> String {
    defaults::EVAL_MODEL.to_string()
}

fn validate_threshold(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        return Err(Error::InvalidInput(format!(
            "{name} must be within [0, 1], got {value}"
        )));
    }
    Ok(())
}

fn validate_terms(name: &str, terms: &[String]) -> Result<()> {
    if terms.is_empty() {
        return Err(Error::InvalidInput(format!(
            "{name} is required and must be a non-empty list"
        )));
    }
    if terms.iter().any(|t| t.trim().is_empty()) {
        return Err(Error::InvalidInput(format!(
            "{name} must not contain empty terms"
        )));
    }
    Ok(())
}

fn validate_censor(lower: Option<i32>, upper: Option<i32>) -> Result<()> {
    let range = YearRange::from_params(lower, upper);
    if range.lower > range.upper {
        return Err(Error::InvalidInput(format!(
            "censor_year_lower ({}) cannot be greater than censor_year ({})",
            range.lower, range.upper
        )));
    }
    Ok(())
}

/// Parameters for a pairwise co-occurrence (KinderMiner) job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KinderMinerParams {
    pub a_terms: Vec<String>,
    pub b_terms: Vec<String>,
    /// Inclusive upper bound on publication year.
    #[serde(default)]
    pub censor_year: Option<i32>,
    /// Inclusive lower bound on publication year.
    #[serde(default)]
    pub censor_year_lower: Option<i32>,
    /// Whether to return the intersecting document ids per pair.
    #[serde(default)]
    pub return_pmids: bool,
    /// Keep only pairs whose p-value is at or below this cutoff.
    #[serde(default)]
    pub ab_fet_threshold: Option<f64>,
    /// Number of most cited articles reported in the pmid payload.
    #[serde(default, alias = "top_n")]
    pub top_n_articles_most_cited: Option<usize>,
    /// Number of most recent articles reported in the pmid payload.
    #[serde(default)]
    pub top_n_articles_most_recent: Option<usize>,
}

impl KinderMinerParams {
    /// Validate at submission. Invalid parameter sets never enter the queue.
    pub fn validate(&self) -> Result<()> {
        validate_terms("a_terms", &self.a_terms)?;
        validate_terms("b_terms", &self.b_terms)?;
        if self.a_terms.len() > defaults::MAX_A_TERMS {
            return Err(Error::InvalidInput(format!(
                "a_terms cannot contain more than {} terms",
                defaults::MAX_A_TERMS
            )));
        }
        if let Some(t) = self.ab_fet_threshold {
            validate_threshold("ab_fet_threshold", t)?;
        }
        validate_censor(self.censor_year_lower, self.censor_year)
    }

    /// The effective censoring range for this query.
    pub fn censor(&self) -> YearRange {
        YearRange::from_params(self.censor_year_lower, self.censor_year)
    }
}

/// Parameters for a chained two-hop (SKiM) job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkimParams {
    pub a_terms: Vec<String>,
    pub b_terms: Vec<String>,
    pub c_terms: Vec<String>,
    /// Number of top AB pairs (by prediction score) kept for the BC leg.
    #[serde(default = "default_top_n_ab")]
    pub top_n: usize,
    /// Maximum AB p-value to consider a hit.
    #[serde(default = "default_ab_fet_threshold")]
    pub ab_fet_threshold: f64,
    /// Maximum BC p-value to consider a hit.
    #[serde(default = "default_bc_fet_threshold")]
    pub bc_fet_threshold: f64,
    /// Inclusive upper bound on publication year.
    #[serde(default)]
    pub censor_year: Option<i32>,
    /// Inclusive lower bound on publication year.
    #[serde(default)]
    pub censor_year_lower: Option<i32>,
    /// Whether to return the intersecting document ids per leg.
    #[serde(default)]
    pub return_pmids: bool,
}

impl SkimParams {
    /// Validate at submission. Invalid parameter sets never enter the queue.
    pub fn validate(&self) -> Result<()> {
        validate_terms("a_terms", &self.a_terms)?;
        validate_terms("b_terms", &self.b_terms)?;
        validate_terms("c_terms", &self.c_terms)?;
        if self.a_terms.len() > defaults::MAX_A_TERMS {
            return Err(Error::InvalidInput(format!(
                "a_terms cannot contain more than {} terms",
                defaults::MAX_A_TERMS
            )));
        }
        if self.top_n == 0 {
            return Err(Error::InvalidInput(
                "top_n must be a positive integer".to_string(),
            ));
        }
        validate_threshold("ab_fet_threshold", self.ab_fet_threshold)?;
        validate_threshold("bc_fet_threshold", self.bc_fet_threshold)?;
        validate_censor(self.censor_year_lower, self.censor_year)
    }

    /// The effective censoring range for this query.
    pub fn censor(&self) -> YearRange {
        YearRange::from_params(self.censor_year_lower, self.censor_year)
    }
}

/// Parameters for a corpus indexing job: a document batch and/or citation
/// backfill records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexParams {
    #[serde(default)]
    pub documents: Vec<DocumentInput>,
    #[serde(default)]
    pub citation_updates: Vec<CitationUpdate>,
}

impl IndexParams {
    /// Validate at submission. Invalid parameter sets never enter the queue.
    pub fn validate(&self) -> Result<()> {
        if self.documents.is_empty() && self.citation_updates.is_empty() {
            return Err(Error::InvalidInput(
                "indexing job requires documents or citation_updates".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters for a hypothesis-evaluation job. Cluster credentials come
/// from process configuration, never from the payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HypothesisEvalParams {
    /// Discovered triples to score for plausibility.
    pub triples: Vec<TripleResult>,
    /// LLM requested for the evaluation.
    #[serde(default = "default_eval_model")]
    pub model: String,
}

impl HypothesisEvalParams {
    /// Validate at submission. Invalid parameter sets never enter the queue.
    pub fn validate(&self) -> Result<()> {
        if self.triples.is_empty() {
            return Err(Error::InvalidInput(
                "triples is required and must be a non-empty list".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(Error::InvalidInput("model must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Validated, type-specific job parameters. The scheduler dispatches on
/// this closed tag; there is no open-ended job registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobParams {
    Kinderminer(KinderMinerParams),
    Skim(SkimParams),
    Index(IndexParams),
    HypothesisEval(HypothesisEvalParams),
}

impl JobParams {
    /// The job type tag carried by this payload.
    pub fn job_type(&self) -> JobType {
        match self {
            JobParams::Kinderminer(_) => JobType::Kinderminer,
            JobParams::Skim(_) => JobType::Skim,
            JobParams::Index(_) => JobType::Index,
            JobParams::HypothesisEval(_) => JobType::HypothesisEval,
        }
    }

    /// Validate the payload for submission.
    pub fn validate(&self) -> Result<()> {
        match self {
            JobParams::Kinderminer(p) => p.validate(),
            JobParams::Skim(p) => p.validate(),
            JobParams::Index(p) => p.validate(),
            JobParams::HypothesisEval(p) => p.validate(),
        }
    }
}

// ---------------------------------------------------------------------------
// Job record
// ---------------------------------------------------------------------------

/// A job record as stored in the job store and returned to status pollers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub job_type: JobType,
    pub priority: JobPriority,
    pub params: JobParams,
    pub status: JobStatus,
    /// Fraction of the workload completed, in [0, 1], monotonically
    /// non-decreasing; exactly 1.0 only once finished.
    pub progress: f64,
    /// Present only when finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    /// Present only when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a freshly submitted job with a time-ordered id.
    pub fn new(params: JobParams, priority: JobPriority, max_retries: u32) -> Self {
        Self {
            id: Uuid::now_v7(),
            job_type: params.job_type(),
            priority,
            params,
            status: JobStatus::Queued,
            progress: 0.0,
            result: None,
            error: None,
            retry_count: 0,
            max_retries,
            submitted_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }
}

/// Per-status counts over the whole job store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueStats {
    pub queued: usize,
    pub running: usize,
    pub finished: usize,
    pub failed: usize,
    pub cancelled: usize,
}

// ---------------------------------------------------------------------------
// Result records
// ---------------------------------------------------------------------------

/// One pairwise co-occurrence result.
///
/// Every count is reproducible by re-querying the term index at the same
/// corpus snapshot; results are a pure function of (terms, corpus state,
/// parameters).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PairResult {
    pub a_term: String,
    pub b_term: String,
    pub a_count: u64,
    pub b_count: u64,
    pub ab_count: u64,
    /// Corpus size at the query's censoring range.
    pub total_count: u64,
    pub pvalue: f64,
    /// Fraction of b's documents that also mention a.
    pub sort_ratio: f64,
    pub prediction_score: f64,
    /// Selected intersecting document ids, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ab_pmids: Option<Vec<DocId>>,
}

/// One chained A→B→C result carrying both legs' statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripleResult {
    pub a_term: String,
    pub b_term: String,
    pub c_term: String,
    pub a_count: u64,
    pub b_count: u64,
    pub c_count: u64,
    pub ab_count: u64,
    pub bc_count: u64,
    pub total_count: u64,
    pub ab_pvalue: f64,
    pub ab_sort_ratio: f64,
    pub ab_prediction_score: f64,
    pub bc_pvalue: f64,
    pub bc_sort_ratio: f64,
    pub bc_prediction_score: f64,
    /// Product of the two legs' prediction scores; the chain ranking key.
    pub combined_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ab_pmids: Option<Vec<DocId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bc_pmids: Option<Vec<DocId>>,
}

/// Plausibility verdict for one triple, as returned by the batch cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlausibilityScore {
    pub a_term: String,
    pub b_term: String,
    pub c_term: String,
    /// Plausibility in [0, 1] as judged by the evaluation model.
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// A triple result with its merged plausibility verdict, when the cluster
/// returned one for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredTriple {
    #[serde(flatten)]
    pub triple: TripleResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plausibility: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}
