//! Job handlers for each job type.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use litmine_core::{CancelToken, Job, JobParams, JobType};

/// Progress callback type for job handlers. Receives the fraction of the
/// workload completed, in [0, 1].
pub type ProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

/// Context provided to job handlers.
pub struct JobContext {
    /// The job being processed.
    pub job: Job,
    /// Progress callback for updating job progress.
    progress_callback: Option<ProgressCallback>,
    /// Cancellation flag checked between units of work.
    cancel: CancelToken,
}

impl JobContext {
    /// Create a new job context.
    pub fn new(job: Job, cancel: CancelToken) -> Self {
        Self {
            job,
            progress_callback: None,
            cancel,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Report progress to the callback.
    pub fn report_progress(&self, progress: f64) {
        if let Some(ref callback) = self.progress_callback {
            callback(progress);
        }
    }

    /// A clone of the job's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Whether cancellation has been requested for this job.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The typed job payload.
    pub fn params(&self) -> &JobParams {
        &self.job.params
    }
}

/// Result of job execution.
#[derive(Debug)]
pub enum JobResult {
    /// Job completed successfully with its result data.
    Success(JsonValue),
    /// Job failed with an error message.
    Failed(String),
    /// Job hit a transient failure and may be retried if configured.
    Retry(String),
    /// Job observed a cancellation request at a checkpoint and stopped.
    Cancelled,
}

/// Trait for job handlers.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The job type this handler processes.
    fn job_type(&self) -> JobType;

    /// Execute the job.
    async fn execute(&self, ctx: JobContext) -> JobResult;

    /// Check if this handler can process the given job type.
    fn can_handle(&self, job_type: JobType) -> bool {
        self.job_type() == job_type
    }
}

/// No-op handler for testing.
pub struct NoOpHandler {
    job_type: JobType,
}

impl NoOpHandler {
    /// Create a new no-op handler for the given job type.
    pub fn new(job_type: JobType) -> Self {
        Self { job_type }
    }
}

#[async_trait]
impl JobHandler for NoOpHandler {
    fn job_type(&self) -> JobType {
        self.job_type
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        if ctx.is_cancelled() {
            return JobResult::Cancelled;
        }
        ctx.report_progress(0.5);
        JobResult::Success(JsonValue::Null)
    }
}
