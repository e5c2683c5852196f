//! In-memory job store: the single source of truth for job state.
//!
//! Three FIFO queues, one per priority tier, plus the job table and the
//! cancellation flags of running jobs, all guarded by one mutex so every
//! status transition is an atomic read-modify-write. The critical sections
//! are bounded (no I/O, no computation), so status readers never block a
//! worker for long.
//!
//! Claim rules: high before medium before low, FIFO within a tier; at most
//! one worker ever claims a given job. An indexing job (the exclusive
//! index writer) is claimed only when nothing else is running, and while
//! one runs nothing else is claimed.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use uuid::Uuid;

use litmine_core::{
    defaults, CancelToken, Error, Job, JobParams, JobPriority, JobStatus, JobType, QueueStats,
    Result,
};

#[derive(Default)]
struct StoreInner {
    jobs: HashMap<Uuid, Job>,
    /// One FIFO per tier, indexed by [`tier_index`]. Queues hold only
    /// queued jobs: cancellation removes the id atomically.
    queues: [VecDeque<Uuid>; 3],
    /// Cancellation flags of currently running jobs.
    cancel_flags: HashMap<Uuid, CancelToken>,
}

fn tier_index(priority: JobPriority) -> usize {
    match priority {
        JobPriority::High => 0,
        JobPriority::Medium => 1,
        JobPriority::Low => 2,
    }
}

impl StoreInner {
    fn running_jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs
            .values()
            .filter(|j| j.status == JobStatus::Running)
    }

    fn index_job_running(&self) -> bool {
        self.running_jobs().any(|j| j.job_type == JobType::Index)
    }

    fn any_job_running(&self) -> bool {
        self.running_jobs().next().is_some()
    }
}

/// In-memory job store with priority queues and atomic transitions.
pub struct MemoryJobStore {
    inner: Mutex<StoreInner>,
    notify: Arc<Notify>,
    max_retries: u32,
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::with_max_retries(defaults::JOB_MAX_RETRIES)
    }

    /// Create a store whose jobs may be retried up to `max_retries` times
    /// when a handler reports a retryable failure.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            notify: Arc::new(Notify::new()),
            max_retries,
        }
    }

    /// Notification handle for event-driven worker wake.
    pub fn job_notify(&self) -> Arc<Notify> {
        self.notify.clone()
    }

    /// Validate and enqueue a job. Invalid parameters are rejected here and
    /// never enter a queue.
    pub fn submit(&self, params: JobParams, priority: JobPriority) -> Result<Uuid> {
        params.validate()?;
        let job = Job::new(params, priority, self.max_retries);
        let job_id = job.id;
        let job_type = job.job_type;

        {
            let mut inner = self.inner.lock();
            inner.queues[tier_index(priority)].push_back(job_id);
            inner.jobs.insert(job_id, job);
        }
        self.notify.notify_waiters();

        info!(
            subsystem = "jobs",
            op = "submit",
            job_id = %job_id,
            job_type = %job_type,
            priority = %priority,
            "Job submitted"
        );
        Ok(job_id)
    }

    /// Snapshot of a job record for status polling. Failed jobs stay
    /// queryable; their terminal state and error cause persist.
    pub fn get(&self, job_id: Uuid) -> Result<Job> {
        self.inner
            .lock()
            .jobs
            .get(&job_id)
            .cloned()
            .ok_or(Error::JobNotFound(job_id))
    }

    /// Claim the next dispatchable job, transitioning it queued → running
    /// atomically. At most one worker can ever claim a given job: the
    /// transition happens under the store lock.
    pub fn claim_next(&self) -> Option<Job> {
        let mut inner = self.inner.lock();

        // the index writer is exclusive both ways
        if inner.index_job_running() {
            return None;
        }

        let mut claim: Option<(usize, Uuid)> = None;
        for tier in 0..inner.queues.len() {
            let Some(&head) = inner.queues[tier].front() else {
                continue;
            };
            let is_index = inner
                .jobs
                .get(&head)
                .map(|j| j.job_type == JobType::Index)
                .unwrap_or(false);
            if is_index {
                if inner.any_job_running() {
                    // gate dispatch until the pool drains so the writer is
                    // not starved by a steady stream of readers
                    return None;
                }
                claim = Some((tier, head));
                break;
            }
            claim = Some((tier, head));
            break;
        }

        let (tier, job_id) = claim?;
        inner.queues[tier].pop_front();
        let token = CancelToken::new();
        inner.cancel_flags.insert(job_id, token);

        let job = inner.jobs.get_mut(&job_id)?;
        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
        Some(job.clone())
    }

    /// Cancellation token of a running job.
    pub fn cancel_token(&self, job_id: Uuid) -> Option<CancelToken> {
        self.inner.lock().cancel_flags.get(&job_id).cloned()
    }

    /// Record progress for a running job. Progress is clamped below 1.0
    /// and never decreases; updates on non-running jobs are ignored.
    pub fn update_progress(&self, job_id: Uuid, progress: f64) -> Result<()> {
        let mut inner = self.inner.lock();
        let job = inner
            .jobs
            .get_mut(&job_id)
            .ok_or(Error::JobNotFound(job_id))?;
        if job.status != JobStatus::Running {
            return Ok(());
        }
        let clamped = progress.clamp(0.0, defaults::RUNNING_PROGRESS_CAP);
        if clamped > job.progress {
            job.progress = clamped;
        }
        Ok(())
    }

    /// Transition running → finished, storing the result and setting
    /// progress to exactly 1.0. A finished job can never retroactively
    /// become cancelled: whichever terminal transition lands first wins.
    pub fn complete(&self, job_id: Uuid, result: JsonValue) -> Result<()> {
        self.finish(job_id, JobStatus::Finished, Some(result), None)
    }

    /// Transition running → failed with a human-readable cause.
    pub fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        self.finish(job_id, JobStatus::Failed, None, Some(error))
    }

    /// Transition running → cancelled, acknowledging a cancellation the
    /// worker observed at a checkpoint.
    pub fn mark_cancelled(&self, job_id: Uuid) -> Result<()> {
        self.finish(job_id, JobStatus::Cancelled, None, None)
    }

    /// Re-queue a retryable failure, or fail it once the bounded retry
    /// budget is spent. Returns the resulting status.
    pub fn retry_or_fail(&self, job_id: Uuid, error: &str) -> Result<JobStatus> {
        let requeued = {
            let mut inner = self.inner.lock();
            let job = inner
                .jobs
                .get_mut(&job_id)
                .ok_or(Error::JobNotFound(job_id))?;
            if job.status != JobStatus::Running {
                return Err(Error::Job(format!(
                    "cannot retry job in state {}",
                    job.status
                )));
            }
            if job.retry_count < job.max_retries {
                job.retry_count += 1;
                job.status = JobStatus::Queued;
                job.progress = 0.0;
                job.started_at = None;
                let priority = job.priority;
                let retry_count = job.retry_count;
                inner.cancel_flags.remove(&job_id);
                inner.queues[tier_index(priority)].push_back(job_id);
                Some(retry_count)
            } else {
                None
            }
        };

        match requeued {
            Some(retry_count) => {
                self.notify.notify_waiters();
                warn!(
                    subsystem = "jobs",
                    op = "retry",
                    job_id = %job_id,
                    retry_count,
                    error,
                    "Job re-queued after retryable failure"
                );
                Ok(JobStatus::Queued)
            }
            None => {
                self.fail(job_id, error)?;
                Ok(JobStatus::Failed)
            }
        }
    }

    /// Cancel a job.
    ///
    /// Queued jobs are removed from their queue atomically and become
    /// cancelled immediately; running jobs get their flag set and reach
    /// cancelled when the worker acknowledges the next checkpoint; jobs
    /// already terminal are left untouched. Returns the status after the
    /// call.
    pub fn cancel(&self, job_id: Uuid) -> Result<JobStatus> {
        let mut inner = self.inner.lock();
        let job = inner
            .jobs
            .get_mut(&job_id)
            .ok_or(Error::JobNotFound(job_id))?;

        match job.status {
            JobStatus::Queued => {
                job.status = JobStatus::Cancelled;
                job.finished_at = Some(Utc::now());
                let priority = job.priority;
                inner.queues[tier_index(priority)].retain(|id| *id != job_id);
                debug!(subsystem = "jobs", op = "cancel", job_id = %job_id, "Cancelled queued job");
                Ok(JobStatus::Cancelled)
            }
            JobStatus::Running => {
                if let Some(token) = inner.cancel_flags.get(&job_id) {
                    token.cancel();
                }
                debug!(
                    subsystem = "jobs",
                    op = "cancel",
                    job_id = %job_id,
                    "Cancellation requested for running job"
                );
                Ok(JobStatus::Running)
            }
            terminal => Ok(terminal),
        }
    }

    /// Number of queued jobs across all tiers.
    pub fn pending_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.queues.iter().map(VecDeque::len).sum()
    }

    /// Per-status counts over the whole store.
    pub fn stats(&self) -> QueueStats {
        let inner = self.inner.lock();
        let mut stats = QueueStats::default();
        for job in inner.jobs.values() {
            match job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Finished => stats.finished += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    fn finish(
        &self,
        job_id: Uuid,
        status: JobStatus,
        result: Option<JsonValue>,
        error: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        let job = inner
            .jobs
            .get_mut(&job_id)
            .ok_or(Error::JobNotFound(job_id))?;
        if job.status != JobStatus::Running {
            return Err(Error::Job(format!(
                "cannot transition job from {} to {}",
                job.status, status
            )));
        }
        job.status = status;
        job.finished_at = Some(Utc::now());
        if status == JobStatus::Finished {
            job.progress = 1.0;
            job.result = result;
        }
        job.error = error.map(String::from);
        inner.cancel_flags.remove(&job_id);
        Ok(())
    }
}
