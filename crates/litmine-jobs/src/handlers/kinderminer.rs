//! Handler for pairwise co-occurrence jobs.

use std::sync::Arc;

use async_trait::async_trait;

use litmine_core::{Error, JobParams, JobType};
use litmine_engine::{pairwise, PairwiseOptions};
use litmine_index::TermIndex;

use crate::handler::{JobContext, JobHandler, JobResult};

/// Runs KinderMiner queries against the shared term index.
pub struct KinderMinerHandler {
    index: Arc<TermIndex>,
}

impl KinderMinerHandler {
    pub fn new(index: Arc<TermIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl JobHandler for KinderMinerHandler {
    fn job_type(&self) -> JobType {
        JobType::Kinderminer
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let JobParams::Kinderminer(params) = ctx.job.params.clone() else {
            return JobResult::Failed(format!(
                "kinderminer handler received a {} payload",
                ctx.job.job_type
            ));
        };

        let index = Arc::clone(&self.index);
        // the statistics are CPU-bound; keep them off the async runtime
        let outcome = tokio::task::spawn_blocking(move || {
            let options = PairwiseOptions::from(&params);
            let cancel = ctx.cancel_token();
            pairwise(
                &index,
                &params.a_terms,
                &params.b_terms,
                &options,
                &|p| ctx.report_progress(p),
                &cancel,
            )
        })
        .await;

        match outcome {
            Ok(Ok(pairs)) => match serde_json::to_value(&pairs) {
                Ok(value) => JobResult::Success(value),
                Err(e) => JobResult::Failed(e.to_string()),
            },
            Ok(Err(Error::Cancelled)) => JobResult::Cancelled,
            Ok(Err(e)) => JobResult::Failed(e.to_string()),
            Err(e) => JobResult::Failed(format!("pairwise task panicked: {e}")),
        }
    }
}
