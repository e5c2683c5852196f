//! Pairwise co-occurrence driver (KinderMiner).
//!
//! For every (a, b) pair in the cross product the driver pulls both posting
//! sets from the index (censored by year before intersecting, when
//! requested), builds the contingency table, and scores the pair. Term
//! sets are cached per call so repeated terms hit the index once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use litmine_core::{defaults, CancelToken, DocId, KinderMinerParams, PairResult, Result, YearRange};
use litmine_index::{sanitize_term, TermIndex};

use crate::stats::{fisher_exact_greater, prediction_score, sort_ratio, ContingencyTable};

/// Options for one pairwise query.
#[derive(Debug, Clone)]
pub struct PairwiseOptions {
    /// Publication-year censoring applied to posting sets and the corpus
    /// total alike.
    pub censor: YearRange,
    /// Whether result records carry intersecting document ids.
    pub return_pmids: bool,
    /// Keep only pairs with p-value at or below this cutoff. Filtering
    /// happens after scoring, never before the counts are computed.
    pub ab_fet_threshold: Option<f64>,
    /// Most cited articles reported per pair (0 disables that selector).
    pub top_n_most_cited: usize,
    /// Most recent articles reported per pair (0 disables that selector).
    pub top_n_most_recent: usize,
}

impl Default for PairwiseOptions {
    fn default() -> Self {
        Self {
            censor: YearRange::unbounded(),
            return_pmids: false,
            ab_fet_threshold: None,
            top_n_most_cited: defaults::TOP_N_ARTICLES_MOST_CITED,
            top_n_most_recent: defaults::TOP_N_ARTICLES_MOST_RECENT,
        }
    }
}

impl From<&KinderMinerParams> for PairwiseOptions {
    fn from(params: &KinderMinerParams) -> Self {
        Self {
            censor: params.censor(),
            return_pmids: params.return_pmids,
            ab_fet_threshold: params.ab_fet_threshold,
            top_n_most_cited: params
                .top_n_articles_most_cited
                .unwrap_or(defaults::TOP_N_ARTICLES_MOST_CITED),
            top_n_most_recent: params
                .top_n_articles_most_recent
                .unwrap_or(defaults::TOP_N_ARTICLES_MOST_RECENT),
        }
    }
}

/// Per-query cache of censored posting sets, keyed by sanitized term.
pub(crate) struct TermCache<'a> {
    index: &'a TermIndex,
    censor: YearRange,
    sets: HashMap<String, Arc<HashSet<DocId>>>,
}

impl<'a> TermCache<'a> {
    pub(crate) fn new(index: &'a TermIndex, censor: YearRange) -> Self {
        Self {
            index,
            censor,
            sets: HashMap::new(),
        }
    }

    fn get(&mut self, raw_term: &str) -> Result<Arc<HashSet<DocId>>> {
        let key = sanitize_term(raw_term);
        if let Some(set) = self.sets.get(&key) {
            return Ok(Arc::clone(set));
        }
        let set = Arc::new(self.index.lookup_censored(&key, &self.censor)?);
        self.sets.insert(key, Arc::clone(&set));
        Ok(set)
    }
}

/// Compute one scored pair against a fixed corpus total.
///
/// This is the single source of pair statistics: the chaining engine runs
/// both of its legs through it, so a chain's sub-results always equal what
/// a direct pairwise call would produce on the same snapshot.
pub(crate) fn test_pair(
    cache: &mut TermCache<'_>,
    a_term: &str,
    b_term: &str,
    total: u64,
    options: &PairwiseOptions,
) -> Result<PairResult> {
    let a_docs = cache.get(a_term)?;
    let b_docs = cache.get(b_term)?;

    let ab = a_docs.intersection(&b_docs).count() as u64;
    let table =
        ContingencyTable::from_counts(ab, a_docs.len() as u64, b_docs.len() as u64, total);
    let pvalue = fisher_exact_greater(&table);
    let ratio = sort_ratio(&table);

    let ab_pmids = if options.return_pmids {
        let intersection: HashSet<DocId> = a_docs.intersection(&b_docs).copied().collect();
        Some(select_articles(cache.index, &intersection, options))
    } else {
        None
    };

    Ok(PairResult {
        a_term: a_term.to_string(),
        b_term: b_term.to_string(),
        a_count: a_docs.len() as u64,
        b_count: b_docs.len() as u64,
        ab_count: ab,
        total_count: total,
        pvalue,
        sort_ratio: ratio,
        prediction_score: prediction_score(pvalue, ratio),
        ab_pmids,
    })
}

/// Select the article ids reported for a pair: the union of the top-N most
/// cited and top-N most recent (all of them when both selectors are
/// disabled), in ascending id order for determinism.
fn select_articles(
    index: &TermIndex,
    intersection: &HashSet<DocId>,
    options: &PairwiseOptions,
) -> Vec<DocId> {
    let mut ids: Vec<DocId> =
        if options.top_n_most_cited == 0 && options.top_n_most_recent == 0 {
            intersection.iter().copied().collect()
        } else {
            let mut selected: HashSet<DocId> = HashSet::new();
            selected.extend(index.top_n_by_citations(intersection, options.top_n_most_cited));
            selected.extend(index.top_n_by_recency(intersection, options.top_n_most_recent));
            selected.into_iter().collect()
        };
    ids.sort_unstable();
    ids
}

/// Run the full cross product of a-terms and b-terms.
///
/// Progress is reported as the fraction of pairs completed (capped below
/// 1.0; the job store owns the final tick). Cancellation is honored
/// between pairs. Output is ordered by prediction score descending (ties
/// by term order); the p-value cutoff, when set, filters after scoring.
pub fn pairwise(
    index: &TermIndex,
    a_terms: &[String],
    b_terms: &[String],
    options: &PairwiseOptions,
    progress: &(dyn Fn(f64) + Send + Sync),
    cancel: &CancelToken,
) -> Result<Vec<PairResult>> {
    let total = index.document_count_in(&options.censor);
    let total_pairs = (a_terms.len() * b_terms.len()) as f64;
    let mut cache = TermCache::new(index, options.censor);
    let mut results = Vec::with_capacity(a_terms.len() * b_terms.len());

    let mut done = 0usize;
    for b_term in b_terms {
        for a_term in a_terms {
            cancel.checkpoint()?;
            results.push(test_pair(&mut cache, a_term, b_term, total, options)?);
            done += 1;
            progress((done as f64 / total_pairs).min(defaults::RUNNING_PROGRESS_CAP));
        }
    }

    sort_pairs(&mut results);
    if let Some(threshold) = options.ab_fet_threshold {
        results.retain(|r| r.pvalue <= threshold);
    }

    debug!(
        subsystem = "engine",
        op = "pairwise",
        pair_count = done,
        result_count = results.len(),
        "Pairwise query complete"
    );
    Ok(results)
}

/// Prediction score descending, ties by (a_term, b_term) ascending.
pub(crate) fn sort_pairs(results: &mut [PairResult]) {
    results.sort_by(|x, y| {
        y.prediction_score
            .total_cmp(&x.prediction_score)
            .then_with(|| x.a_term.cmp(&y.a_term))
            .then_with(|| x.b_term.cmp(&y.b_term))
    });
}
