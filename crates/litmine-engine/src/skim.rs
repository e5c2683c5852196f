//! Chained two-hop driver (SKiM).
//!
//! A chain query is KinderMiner run twice and joined: every A-B pair is
//! scored, the top-K AB pairs by prediction score survive, and each
//! surviving b-term is scored against every c-term. Both legs go through
//! the same pair computation as a plain pairwise query, so a triple's
//! sub-results always match a direct pairwise call on the same snapshot.
//! The prune bounds the fan-out near |A|x|B| + K x |C| instead of the full
//! |A|x|B|x|C| product.

use tracing::debug;

use litmine_core::{defaults, CancelToken, Result, SkimParams, TripleResult, YearRange};
use litmine_index::TermIndex;

use crate::kinderminer::{sort_pairs, test_pair, PairwiseOptions, TermCache};

/// Options for one chain query.
#[derive(Debug, Clone)]
pub struct ChainOptions {
    /// Publication-year censoring shared by both legs.
    pub censor: YearRange,
    /// Number of top AB pairs (by prediction score) kept for the BC leg.
    pub top_n_ab: usize,
    /// Maximum AB p-value to consider a hit.
    pub ab_fet_threshold: f64,
    /// Maximum BC p-value to consider a hit.
    pub bc_fet_threshold: f64,
    /// Whether result records carry intersecting document ids per leg.
    pub return_pmids: bool,
    /// Most cited articles reported per leg (0 disables that selector).
    pub top_n_most_cited: usize,
    /// Most recent articles reported per leg (0 disables that selector).
    pub top_n_most_recent: usize,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            censor: YearRange::unbounded(),
            top_n_ab: defaults::TOP_N_AB,
            ab_fet_threshold: defaults::AB_FET_THRESHOLD,
            bc_fet_threshold: defaults::BC_FET_THRESHOLD,
            return_pmids: false,
            top_n_most_cited: defaults::TOP_N_ARTICLES_MOST_CITED,
            top_n_most_recent: defaults::TOP_N_ARTICLES_MOST_RECENT,
        }
    }
}

impl From<&SkimParams> for ChainOptions {
    fn from(params: &SkimParams) -> Self {
        Self {
            censor: params.censor(),
            top_n_ab: params.top_n,
            ab_fet_threshold: params.ab_fet_threshold,
            bc_fet_threshold: params.bc_fet_threshold,
            return_pmids: params.return_pmids,
            top_n_most_cited: defaults::TOP_N_ARTICLES_MOST_CITED,
            top_n_most_recent: defaults::TOP_N_ARTICLES_MOST_RECENT,
        }
    }
}

impl ChainOptions {
    fn pair_options(&self) -> PairwiseOptions {
        PairwiseOptions {
            censor: self.censor,
            return_pmids: self.return_pmids,
            // chain filtering is per leg, not inside the pair computation
            ab_fet_threshold: None,
            top_n_most_cited: self.top_n_most_cited,
            top_n_most_recent: self.top_n_most_recent,
        }
    }
}

/// Run the chained query: AB leg, prune, BC leg, join.
///
/// Progress covers the combined AB + BC workload. Output is ranked by the
/// combined score (product of both legs' prediction scores) descending,
/// ties by (a, b, c) term order, so rankings are reproducible against the
/// same index snapshot.
pub fn chain(
    index: &TermIndex,
    a_terms: &[String],
    b_terms: &[String],
    c_terms: &[String],
    options: &ChainOptions,
    progress: &(dyn Fn(f64) + Send + Sync),
    cancel: &CancelToken,
) -> Result<Vec<TripleResult>> {
    let total = index.document_count_in(&options.censor);
    let pair_options = options.pair_options();
    let mut cache = TermCache::new(index, options.censor);

    let ab_total = a_terms.len() * b_terms.len();
    // planned BC workload; recomputed after the prune
    let planned_bc = options.top_n_ab.min(ab_total) * c_terms.len();

    // AB leg
    let mut ab_results = Vec::new();
    let mut ab_done = 0usize;
    for b_term in b_terms {
        for a_term in a_terms {
            cancel.checkpoint()?;
            let pair = test_pair(&mut cache, a_term, b_term, total, &pair_options)?;
            if pair.pvalue <= options.ab_fet_threshold {
                ab_results.push(pair);
            }
            ab_done += 1;
            report(progress, ab_done, ab_total + planned_bc);
        }
    }

    // keep the top-K AB pairs by prediction score
    sort_pairs(&mut ab_results);
    ab_results.truncate(options.top_n_ab);

    let bc_total = ab_results.len() * c_terms.len();
    let workload = ab_total + bc_total;

    // BC leg, joined on the shared b-term
    let mut triples = Vec::new();
    let mut bc_done = 0usize;
    for c_term in c_terms {
        for ab in &ab_results {
            cancel.checkpoint()?;
            let bc = test_pair(&mut cache, &ab.b_term, c_term, total, &pair_options)?;
            bc_done += 1;
            report(progress, ab_total + bc_done, workload);

            if bc.pvalue > options.bc_fet_threshold {
                continue;
            }
            triples.push(TripleResult {
                a_term: ab.a_term.clone(),
                b_term: ab.b_term.clone(),
                c_term: c_term.clone(),
                a_count: ab.a_count,
                b_count: ab.b_count,
                c_count: bc.b_count,
                ab_count: ab.ab_count,
                bc_count: bc.ab_count,
                total_count: total,
                ab_pvalue: ab.pvalue,
                ab_sort_ratio: ab.sort_ratio,
                ab_prediction_score: ab.prediction_score,
                bc_pvalue: bc.pvalue,
                bc_sort_ratio: bc.sort_ratio,
                bc_prediction_score: bc.prediction_score,
                combined_score: ab.prediction_score * bc.prediction_score,
                ab_pmids: ab.ab_pmids.clone(),
                bc_pmids: bc.ab_pmids,
            });
        }
    }

    triples.sort_by(|x, y| {
        y.combined_score
            .total_cmp(&x.combined_score)
            .then_with(|| x.a_term.cmp(&y.a_term))
            .then_with(|| x.b_term.cmp(&y.b_term))
            .then_with(|| x.c_term.cmp(&y.c_term))
    });

    debug!(
        subsystem = "engine",
        op = "chain",
        pair_count = ab_total + bc_total,
        result_count = triples.len(),
        "Chain query complete"
    );
    Ok(triples)
}

fn report(progress: &(dyn Fn(f64) + Send + Sync), done: usize, total: usize) {
    if total == 0 {
        return;
    }
    progress((done as f64 / total as f64).min(defaults::RUNNING_PROGRESS_CAP));
}
