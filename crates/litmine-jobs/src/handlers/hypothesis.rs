//! Handler for hypothesis-evaluation jobs.
//!
//! All the work happens on the external batch cluster; this handler only
//! drives the dispatcher's submit/poll state machine and stores the merged
//! verdicts.

use std::sync::Arc;

use async_trait::async_trait;

use litmine_core::{Error, JobParams, JobType};
use litmine_dispatch::HypothesisDispatcher;

use crate::handler::{JobContext, JobHandler, JobResult};

/// Ships triples to the batch cluster for LLM plausibility scoring.
pub struct HypothesisEvalHandler {
    dispatcher: Arc<HypothesisDispatcher>,
}

impl HypothesisEvalHandler {
    pub fn new(dispatcher: Arc<HypothesisDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl JobHandler for HypothesisEvalHandler {
    fn job_type(&self) -> JobType {
        JobType::HypothesisEval
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let JobParams::HypothesisEval(params) = ctx.job.params.clone() else {
            return JobResult::Failed(format!(
                "hypothesis handler received a {} payload",
                ctx.job.job_type
            ));
        };

        let cancel = ctx.cancel_token();
        let outcome = self
            .dispatcher
            .evaluate(
                params.triples,
                &params.model,
                &|p| ctx.report_progress(p),
                &cancel,
            )
            .await;

        match outcome {
            Ok(scored) => match serde_json::to_value(&scored) {
                Ok(value) => JobResult::Success(value),
                Err(e) => JobResult::Failed(e.to_string()),
            },
            Err(Error::Cancelled) => JobResult::Cancelled,
            Err(e) => JobResult::Failed(e.to_string()),
        }
    }
}
