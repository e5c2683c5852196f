//! Handler for chained two-hop (SKiM) jobs.

use std::sync::Arc;

use async_trait::async_trait;

use litmine_core::{Error, JobParams, JobType};
use litmine_engine::{chain, ChainOptions};
use litmine_index::TermIndex;

use crate::handler::{JobContext, JobHandler, JobResult};

/// Runs SKiM queries against the shared term index.
pub struct SkimHandler {
    index: Arc<TermIndex>,
}

impl SkimHandler {
    pub fn new(index: Arc<TermIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl JobHandler for SkimHandler {
    fn job_type(&self) -> JobType {
        JobType::Skim
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let JobParams::Skim(params) = ctx.job.params.clone() else {
            return JobResult::Failed(format!(
                "skim handler received a {} payload",
                ctx.job.job_type
            ));
        };

        let index = Arc::clone(&self.index);
        let outcome = tokio::task::spawn_blocking(move || {
            let options = ChainOptions::from(&params);
            let cancel = ctx.cancel_token();
            chain(
                &index,
                &params.a_terms,
                &params.b_terms,
                &params.c_terms,
                &options,
                &|p| ctx.report_progress(p),
                &cancel,
            )
        })
        .await;

        match outcome {
            Ok(Ok(triples)) => match serde_json::to_value(&triples) {
                Ok(value) => JobResult::Success(value),
                Err(e) => JobResult::Failed(e.to_string()),
            },
            Ok(Err(Error::Cancelled)) => JobResult::Cancelled,
            Ok(Err(e)) => JobResult::Failed(e.to_string()),
            Err(e) => JobResult::Failed(format!("chain task panicked: {e}")),
        }
    }
}
