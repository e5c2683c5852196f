//! Handler for corpus indexing jobs.
//!
//! The scheduler guarantees an indexing job runs alone, so this handler is
//! the only writer the term index ever sees.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use litmine_core::{defaults, JobParams, JobType};
use litmine_index::TermIndex;

use crate::handler::{JobContext, JobHandler, JobResult};

/// Applies document batches and citation backfill to the term index.
pub struct IndexHandler {
    index: Arc<TermIndex>,
}

impl IndexHandler {
    pub fn new(index: Arc<TermIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl JobHandler for IndexHandler {
    fn job_type(&self) -> JobType {
        JobType::Index
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let JobParams::Index(params) = ctx.job.params.clone() else {
            return JobResult::Failed(format!(
                "index handler received a {} payload",
                ctx.job.job_type
            ));
        };

        let index = Arc::clone(&self.index);
        let outcome = tokio::task::spawn_blocking(move || {
            let total_units = params.documents.len() + 1;
            let mut added = 0usize;
            for (i, doc) in params.documents.iter().enumerate() {
                // checkpoint between documents; each insert is atomic
                if ctx.is_cancelled() {
                    return None;
                }
                if index.add_document(doc) {
                    added += 1;
                }
                ctx.report_progress(
                    ((i + 1) as f64 / total_units as f64)
                        .min(defaults::RUNNING_PROGRESS_CAP),
                );
            }
            let applied = index.merge_citation_counts(&params.citation_updates);
            Some((added, applied, index.document_count()))
        })
        .await;

        match outcome {
            Ok(Some((added, citation_updates_applied, document_count))) => {
                info!(
                    subsystem = "jobs",
                    op = "index",
                    doc_count = added,
                    citation_updates_applied,
                    document_count,
                    "Indexing batch applied"
                );
                JobResult::Success(json!({
                    "documents_added": added,
                    "citation_updates_applied": citation_updates_applied,
                    "document_count": document_count,
                }))
            }
            Ok(None) => JobResult::Cancelled,
            Err(e) => JobResult::Failed(format!("indexing task panicked: {e}")),
        }
    }
}
