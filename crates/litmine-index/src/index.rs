//! Positional inverted index over the document corpus.
//!
//! Postings map each token to the documents containing it and the token
//! positions inside each document. Positions make phrase terms exact: the
//! multi-token term `"breast cancer"` only matches documents where the two
//! tokens are adjacent and in order.
//!
//! Every public method takes the inner lock exactly once, so concurrent
//! readers always observe a consistent snapshot and never a half-applied
//! document insert.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::{debug, info};

use litmine_core::{defaults, CitationUpdate, DocId, DocumentInput, Error, Result, YearRange};

use crate::document::DocumentStore;
use crate::tokenizer::{tokenize, LOGICAL_AND, LOGICAL_OR};

/// Token positions per document, ascending.
type Postings = HashMap<DocId, Vec<u32>>;

#[derive(Default)]
struct IndexInner {
    postings: HashMap<String, Postings>,
    documents: DocumentStore,
}

/// Shared inverted index plus document metadata.
///
/// The index is multiple-reader/single-writer: queries run under a read
/// lock, document inserts and citation backfill under the write lock. The
/// indexing job type is the only writer by scheduler contract.
#[derive(Default)]
pub struct TermIndex {
    inner: RwLock<IndexInner>,
}

impl TermIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed documents.
    pub fn document_count(&self) -> u64 {
        self.inner.read().documents.len() as u64
    }

    /// Number of indexed documents within a publication-year range.
    ///
    /// With an unbounded range this agrees exactly with
    /// [`document_count`](Self::document_count).
    pub fn document_count_in(&self, range: &YearRange) -> u64 {
        self.inner.read().documents.count_in(range) as u64
    }

    /// Number of distinct tokens in the index.
    pub fn token_count(&self) -> usize {
        self.inner.read().postings.len()
    }

    /// Tokenize and insert one document. Idempotent: re-adding an already
    /// indexed id changes nothing and returns `false`.
    ///
    /// The write lock is held for the whole insert, so no reader can see a
    /// document's postings partially applied.
    pub fn add_document(&self, doc: &DocumentInput) -> bool {
        let tokens = tokenize(&doc.text());

        let mut inner = self.inner.write();
        if !inner
            .documents
            .insert(doc.id, doc.year, doc.citation_count)
        {
            return false;
        }
        for (position, token) in tokens.into_iter().enumerate() {
            inner
                .postings
                .entry(token)
                .or_default()
                .entry(doc.id)
                .or_default()
                .push(position as u32);
        }
        true
    }

    /// Insert a batch of documents, returning how many were new.
    pub fn add_documents(&self, docs: &[DocumentInput]) -> usize {
        let added = docs.iter().filter(|d| self.add_document(d)).count();
        info!(
            subsystem = "index",
            op = "add_documents",
            doc_count = docs.len(),
            added,
            "Indexed document batch"
        );
        added
    }

    /// Apply citation-count backfill records, returning how many matched a
    /// known document. Idempotent; postings are untouched.
    pub fn merge_citation_counts(&self, updates: &[CitationUpdate]) -> usize {
        let mut inner = self.inner.write();
        let applied = updates
            .iter()
            .filter(|u| inner.documents.merge_citation(u.id, u.citation_count))
            .count();
        debug!(
            subsystem = "index",
            op = "merge_citation_counts",
            applied,
            total = updates.len(),
            "Merged citation backfill"
        );
        applied
    }

    /// Resolve a term expression to the set of matching document ids.
    ///
    /// A term never seen in the corpus resolves to the empty set, not an
    /// error. `||` unions its alternatives, `&&` intersects its conjuncts,
    /// and multi-token phrases require positional adjacency.
    pub fn lookup(&self, term: &str) -> Result<HashSet<DocId>> {
        let inner = self.inner.read();
        Self::lookup_inner(&inner, term)
    }

    /// [`lookup`](Self::lookup) restricted to documents published inside
    /// the year range. Filtering happens on the posting sets, before any
    /// intersection counts are taken from them.
    pub fn lookup_censored(&self, term: &str, range: &YearRange) -> Result<HashSet<DocId>> {
        let inner = self.inner.read();
        let docs = Self::lookup_inner(&inner, term)?;
        if range.is_unbounded() {
            return Ok(docs);
        }
        Ok(docs
            .into_iter()
            .filter(|id| range.contains(inner.documents.year(*id)))
            .collect())
    }

    /// Select up to `n` document ids by recency: publication year
    /// descending, ties by ascending id, documents without a year last.
    pub fn top_n_by_recency(&self, docs: &HashSet<DocId>, n: usize) -> Vec<DocId> {
        if n == 0 {
            return Vec::new();
        }
        let inner = self.inner.read();
        let mut ranked: Vec<(i64, DocId)> = docs
            .iter()
            .map(|&id| {
                let year = inner
                    .documents
                    .year(id)
                    .map(i64::from)
                    .unwrap_or(i64::MIN);
                (year, id)
            })
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        ranked.truncate(n);
        ranked.into_iter().map(|(_, id)| id).collect()
    }

    /// Select up to `n` document ids by citation count descending, ties by
    /// ascending id, documents without a count last.
    pub fn top_n_by_citations(&self, docs: &HashSet<DocId>, n: usize) -> Vec<DocId> {
        if n == 0 {
            return Vec::new();
        }
        let inner = self.inner.read();
        let mut ranked: Vec<(i64, DocId)> = docs
            .iter()
            .map(|&id| {
                let citations = inner
                    .documents
                    .citation_count(id)
                    .map(i64::from)
                    .unwrap_or(i64::MIN);
                (citations, id)
            })
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        ranked.truncate(n);
        ranked.into_iter().map(|(_, id)| id).collect()
    }

    fn lookup_inner(inner: &IndexInner, term: &str) -> Result<HashSet<DocId>> {
        let mut result = HashSet::new();
        for alternative in term.split(LOGICAL_OR) {
            let mut conjunction: Option<HashSet<DocId>> = None;
            for phrase in alternative.split(LOGICAL_AND) {
                let docs = Self::phrase_docs(inner, phrase)?;
                conjunction = Some(match conjunction {
                    Some(acc) => acc.intersection(&docs).copied().collect(),
                    None => docs,
                });
                if conjunction.as_ref().is_some_and(HashSet::is_empty) {
                    break;
                }
            }
            if let Some(docs) = conjunction {
                result.extend(docs);
            }
        }
        Ok(result)
    }

    fn phrase_docs(inner: &IndexInner, phrase: &str) -> Result<HashSet<DocId>> {
        let tokens = tokenize(phrase);
        if tokens.is_empty() {
            return Ok(HashSet::new());
        }
        if tokens.len() > defaults::MAX_TERM_TOKENS {
            return Err(Error::InvalidInput(format!(
                "term must have at most {} words",
                defaults::MAX_TERM_TOKENS
            )));
        }

        let Some(first) = inner.postings.get(&tokens[0]) else {
            return Ok(HashSet::new());
        };

        if tokens.len() == 1 {
            return Ok(first.keys().copied().collect());
        }

        let rest: Vec<&Postings> = match tokens[1..]
            .iter()
            .map(|t| inner.postings.get(t))
            .collect::<Option<Vec<_>>>()
        {
            Some(rest) => rest,
            // some token never occurs anywhere
            None => return Ok(HashSet::new()),
        };

        let mut result = HashSet::new();
        'docs: for (&doc, positions) in first {
            for follower in &rest {
                if !follower.contains_key(&doc) {
                    continue 'docs;
                }
            }
            for &start in positions {
                let adjacent = rest.iter().enumerate().all(|(i, follower)| {
                    let wanted = start + 1 + i as u32;
                    follower
                        .get(&doc)
                        .is_some_and(|ps| ps.binary_search(&wanted).is_ok())
                });
                if adjacent {
                    result.insert(doc);
                    continue 'docs;
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: DocId, year: Option<i32>, citations: Option<u32>, text: &str) -> DocumentInput {
        DocumentInput {
            id,
            year,
            citation_count: citations,
            title: text.to_string(),
            abstract_text: String::new(),
        }
    }

    fn sample_index() -> TermIndex {
        let index = TermIndex::new();
        index.add_document(&doc(
            1,
            Some(2021),
            Some(12),
            "breast cancer abemaciclib trial",
        ));
        index.add_document(&doc(2, Some(2019), Some(3), "breast cancer background"));
        index.add_document(&doc(3, Some(2020), None, "lung tissue carcinoma study"));
        index
    }

    #[test]
    fn test_unseen_term_resolves_to_empty_set() {
        let index = sample_index();
        assert!(index.lookup("zebrafish").unwrap().is_empty());
    }

    #[test]
    fn test_every_token_maps_to_the_document() {
        let index = TermIndex::new();
        let d = doc(7, None, None, "Somatostatin and insulin secretion.");
        index.add_document(&d);

        for token in tokenize(&d.text()) {
            assert!(
                index.lookup(&token).unwrap().contains(&7),
                "token {token} missing doc 7"
            );
        }
    }

    #[test]
    fn test_add_document_is_idempotent() {
        let index = TermIndex::new();
        let d = doc(7, Some(2020), None, "insulin insulin secretion");
        assert!(index.add_document(&d));
        let before = index.lookup("insulin").unwrap();

        assert!(!index.add_document(&d));
        assert_eq!(index.lookup("insulin").unwrap(), before);
        assert_eq!(index.document_count(), 1);
    }

    #[test]
    fn test_phrase_requires_adjacency() {
        let index = TermIndex::new();
        index.add_document(&doc(1, None, None, "breast cancer screening"));
        index.add_document(&doc(2, None, None, "cancer of the breast"));

        let hits = index.lookup("breast cancer").unwrap();
        assert_eq!(hits, HashSet::from([1]));
    }

    #[test]
    fn test_phrase_matches_later_occurrence() {
        let index = TermIndex::new();
        index.add_document(&doc(1, None, None, "cancer study of breast cancer cases"));
        assert_eq!(index.lookup("breast cancer").unwrap(), HashSet::from([1]));
    }

    #[test]
    fn test_three_token_phrase() {
        let index = TermIndex::new();
        index.add_document(&doc(1, None, None, "estrogen receptor positive tumors"));
        index.add_document(&doc(2, None, None, "receptor positive estrogen tumors"));
        assert_eq!(
            index.lookup("estrogen receptor positive").unwrap(),
            HashSet::from([1])
        );
    }

    #[test]
    fn test_logical_or_unions_synonyms() {
        let index = sample_index();
        let hits = index.lookup("abemaciclib||carcinoma").unwrap();
        assert_eq!(hits, HashSet::from([1, 3]));
    }

    #[test]
    fn test_logical_and_intersects() {
        let index = sample_index();
        let hits = index.lookup("breast cancer&&trial").unwrap();
        assert_eq!(hits, HashSet::from([1]));
    }

    #[test]
    fn test_overlong_phrase_is_rejected() {
        let index = sample_index();
        let long_term = vec!["word"; defaults::MAX_TERM_TOKENS + 1].join(" ");
        assert!(matches!(
            index.lookup(&long_term),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_censoring_filters_posting_sets() {
        let index = sample_index();
        let range = YearRange::from_params(None, Some(2019));

        let all = index.lookup("breast cancer").unwrap();
        assert_eq!(all, HashSet::from([1, 2]));

        let censored = index.lookup_censored("breast cancer", &range).unwrap();
        assert_eq!(censored, HashSet::from([2]));

        assert_eq!(index.document_count_in(&range), 1);
        // uncensored counts agree with the plain query
        assert_eq!(
            index.document_count_in(&YearRange::unbounded()),
            index.document_count()
        );
    }

    #[test]
    fn test_censoring_excludes_documents_without_year() {
        let index = TermIndex::new();
        index.add_document(&doc(1, None, None, "carcinoma"));
        index.add_document(&doc(2, Some(2018), None, "carcinoma"));

        let range = YearRange::from_params(None, Some(2020));
        assert_eq!(
            index.lookup_censored("carcinoma", &range).unwrap(),
            HashSet::from([2])
        );
        assert_eq!(index.document_count_in(&range), 1);
    }

    #[test]
    fn test_top_n_by_recency_is_deterministic() {
        let index = TermIndex::new();
        index.add_document(&doc(5, Some(2020), None, "x"));
        index.add_document(&doc(3, Some(2020), None, "x"));
        index.add_document(&doc(9, Some(2021), None, "x"));
        index.add_document(&doc(4, None, None, "x"));

        let docs = HashSet::from([3, 4, 5, 9]);
        // year descending, ties by ascending id, missing years last
        assert_eq!(index.top_n_by_recency(&docs, 4), vec![9, 3, 5, 4]);
        assert_eq!(index.top_n_by_recency(&docs, 2), vec![9, 3]);
        assert!(index.top_n_by_recency(&docs, 0).is_empty());
    }

    #[test]
    fn test_top_n_by_citations_is_deterministic() {
        let index = sample_index();
        let docs = HashSet::from([1, 2, 3]);
        assert_eq!(index.top_n_by_citations(&docs, 3), vec![1, 2, 3]);
        assert_eq!(index.top_n_by_citations(&docs, 1), vec![1]);
    }

    #[test]
    fn test_citation_backfill_leaves_postings_alone() {
        let index = sample_index();
        let before = index.lookup("breast cancer").unwrap();

        let applied = index.merge_citation_counts(&[
            CitationUpdate {
                id: 2,
                citation_count: 50,
            },
            CitationUpdate {
                id: 999,
                citation_count: 1,
            },
        ]);
        assert_eq!(applied, 1);
        assert_eq!(index.lookup("breast cancer").unwrap(), before);

        // ranking reflects the backfill
        let docs = HashSet::from([1, 2]);
        assert_eq!(index.top_n_by_citations(&docs, 2), vec![2, 1]);

        // reapplying changes nothing further
        assert_eq!(
            index.merge_citation_counts(&[CitationUpdate {
                id: 2,
                citation_count: 50,
            }]),
            1
        );
        assert_eq!(index.top_n_by_citations(&docs, 2), vec![2, 1]);
    }

    #[test]
    fn test_concurrent_lookups_during_inserts() {
        use std::sync::Arc;
        use std::thread;

        let index = Arc::new(TermIndex::new());
        index.add_document(&doc(0, Some(2000), None, "anchor carcinoma"));

        let writer = {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for id in 1..200u64 {
                    index.add_document(&doc(id, Some(2020), None, "carcinoma cohort"));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let hits = index.lookup("carcinoma").unwrap();
                        // the anchor document is always visible
                        assert!(hits.contains(&0));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(index.document_count(), 200);
    }
}
