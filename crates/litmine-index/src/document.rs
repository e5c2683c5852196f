//! Document metadata store: publication years and citation counts.
//!
//! Documents are append-only. The only mutation after insert is the
//! citation-count backfill, an idempotent merge keyed by document id that
//! never touches the tokenized text.

use std::collections::HashMap;

use litmine_core::{DocId, YearRange};

#[derive(Debug, Clone, Copy, Default)]
struct DocumentRecord {
    year: Option<i32>,
    citation_count: Option<u32>,
}

/// Metadata for every indexed document.
#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: HashMap<DocId, DocumentRecord>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in the store.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn contains(&self, id: DocId) -> bool {
        self.docs.contains_key(&id)
    }

    /// Record a new document. Returns `false` (and changes nothing) if the
    /// id is already present.
    pub fn insert(&mut self, id: DocId, year: Option<i32>, citation_count: Option<u32>) -> bool {
        if self.docs.contains_key(&id) {
            return false;
        }
        self.docs.insert(
            id,
            DocumentRecord {
                year,
                citation_count,
            },
        );
        true
    }

    /// Backfill the citation count for a known document. Returns `false`
    /// for unknown ids. Applying the same update twice leaves the store in
    /// the same state as applying it once.
    pub fn merge_citation(&mut self, id: DocId, citation_count: u32) -> bool {
        match self.docs.get_mut(&id) {
            Some(record) => {
                record.citation_count = Some(citation_count);
                true
            }
            None => false,
        }
    }

    pub fn year(&self, id: DocId) -> Option<i32> {
        self.docs.get(&id).and_then(|r| r.year)
    }

    pub fn citation_count(&self, id: DocId) -> Option<u32> {
        self.docs.get(&id).and_then(|r| r.citation_count)
    }

    /// Number of documents whose publication year falls inside the range.
    ///
    /// An unbounded range counts every document, including those without a
    /// recorded year.
    pub fn count_in(&self, range: &YearRange) -> usize {
        if range.is_unbounded() {
            return self.docs.len();
        }
        self.docs
            .values()
            .filter(|r| range.contains(r.year))
            .count()
    }
}
