//! Job worker: claims jobs from the store and runs them on a bounded pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use litmine_core::{defaults, Error, Job, JobType, Result};

use crate::handler::{JobContext, JobHandler, JobResult};
use crate::store::MemoryJobStore;

/// Configuration for the job worker, read once at process start.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds when every queue is empty.
    pub poll_interval_ms: u64,
    /// Worker slots contributed by the high priority tier.
    pub workers_high: usize,
    /// Worker slots contributed by the medium priority tier.
    pub workers_medium: usize,
    /// Worker slots contributed by the low priority tier.
    pub workers_low: usize,
    /// Per-job execution timeout in seconds.
    pub job_timeout_secs: u64,
    /// Whether to enable job processing.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::JOB_POLL_INTERVAL_MS,
            workers_high: defaults::WORKERS_HIGH,
            workers_medium: defaults::WORKERS_MEDIUM,
            workers_low: defaults::WORKERS_LOW,
            job_timeout_secs: defaults::JOB_TIMEOUT_SECS,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `LITMINE_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `LITMINE_WORKERS_HIGH` | `1` | High-tier worker slots |
    /// | `LITMINE_WORKERS_MEDIUM` | `2` | Medium-tier worker slots |
    /// | `LITMINE_WORKERS_LOW` | `1` | Low-tier worker slots |
    /// | `LITMINE_POLL_INTERVAL_MS` | `500` | Polling interval when idle |
    /// | `LITMINE_JOB_TIMEOUT_SECS` | `43200` | Per-job timeout |
    pub fn from_env() -> Self {
        let enabled = std::env::var("LITMINE_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let env_usize = |name: &str, default: usize| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(default)
        };
        let env_u64 = |name: &str, default: u64| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        Self {
            poll_interval_ms: env_u64("LITMINE_POLL_INTERVAL_MS", defaults::JOB_POLL_INTERVAL_MS),
            workers_high: env_usize("LITMINE_WORKERS_HIGH", defaults::WORKERS_HIGH),
            workers_medium: env_usize("LITMINE_WORKERS_MEDIUM", defaults::WORKERS_MEDIUM),
            workers_low: env_usize("LITMINE_WORKERS_LOW", defaults::WORKERS_LOW),
            job_timeout_secs: env_u64("LITMINE_JOB_TIMEOUT_SECS", defaults::JOB_TIMEOUT_SECS),
            enabled,
        }
    }

    /// The shared pool bound: the per-tier slots added together, at least
    /// one.
    pub fn pool_size(&self) -> usize {
        (self.workers_high + self.workers_medium + self.workers_low).max(1)
    }

    /// Set the polling interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the per-tier worker slots.
    pub fn with_workers(mut self, high: usize, medium: usize, low: usize) -> Self {
        self.workers_high = high;
        self.workers_medium = medium;
        self.workers_low = low;
        self
    }

    /// Set the per-job timeout.
    pub fn with_job_timeout(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the job worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A job was started.
    JobStarted { job_id: Uuid, job_type: JobType },
    /// Job progress was updated.
    JobProgress { job_id: Uuid, progress: f64 },
    /// A job completed successfully.
    JobCompleted { job_id: Uuid, job_type: JobType },
    /// A job failed.
    JobFailed {
        job_id: Uuid,
        job_type: JobType,
        error: String,
    },
    /// A job acknowledged cancellation and stopped.
    JobCancelled { job_id: Uuid, job_type: JobType },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Job worker that processes jobs from the store.
pub struct JobWorker {
    store: Arc<MemoryJobStore>,
    config: WorkerConfig,
    handlers: Arc<RwLock<HashMap<JobType, Arc<dyn JobHandler>>>>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorker {
    /// Create a new job worker.
    pub fn new(store: Arc<MemoryJobStore>, config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            store,
            config,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
        }
    }

    /// Register a handler for a job type.
    pub async fn register_handler<H: JobHandler + 'static>(&self, handler: H) {
        let job_type = handler.job_type();
        let mut handlers = self.handlers.write().await;
        handlers.insert(job_type, Arc::new(handler));
        debug!(?job_type, "Registered job handler");
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Run the worker loop with concurrent job processing.
    ///
    /// Claims up to the pool size at a time and processes the batch
    /// concurrently. Sleeps only when every queue is empty, waking early
    /// when a submission arrives.
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Job worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            pool_size = self.config.pool_size(),
            "Job worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let pool_size = self.config.pool_size();
        let notify = self.store.job_notify();

        loop {
            // Check for shutdown before claiming jobs
            if shutdown_rx.try_recv().is_ok() {
                info!("Job worker received shutdown signal");
                break;
            }

            // Claim up to pool_size jobs
            let mut claimed = 0;
            let mut tasks = tokio::task::JoinSet::new();

            for _ in 0..pool_size {
                match self.store.claim_next() {
                    Some(job) => {
                        claimed += 1;
                        let worker = self.clone_refs();
                        tasks.spawn(async move {
                            worker.execute_job(job).await;
                        });
                    }
                    None => break,
                }
            }

            if claimed == 0 {
                // Queue empty; sleep until a submission or the next poll
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Job worker received shutdown signal");
                        break;
                    }
                    _ = notify.notified() => {}
                    _ = sleep(poll_interval) => {}
                }
            } else {
                debug!(claimed, "Processing concurrent job batch");
                while let Some(result) = tasks.join_next().await {
                    if let Err(e) = result {
                        error!(error = ?e, "Job task panicked");
                    }
                }
                // No sleep; immediately try to claim more jobs
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Job worker stopped");
    }

    /// Clone references needed for spawned job tasks.
    fn clone_refs(&self) -> JobWorkerRef {
        JobWorkerRef {
            store: self.store.clone(),
            handlers: self.handlers.clone(),
            event_tx: self.event_tx.clone(),
            job_timeout: Duration::from_secs(self.config.job_timeout_secs),
        }
    }
}

/// Lightweight reference bundle for executing a single job in a spawned
/// task.
struct JobWorkerRef {
    store: Arc<MemoryJobStore>,
    handlers: Arc<RwLock<HashMap<JobType, Arc<dyn JobHandler>>>>,
    event_tx: broadcast::Sender<WorkerEvent>,
    job_timeout: Duration,
}

impl JobWorkerRef {
    /// Execute a single claimed job end-to-end: run the handler, then
    /// write the terminal transition back to the store.
    async fn execute_job(self, job: Job) {
        let start = Instant::now();
        let job_id = job.id;
        let job_type = job.job_type;

        info!(job_id = %job_id, job_type = %job_type, "Processing job");
        let _ = self
            .event_tx
            .send(WorkerEvent::JobStarted { job_id, job_type });

        let handler = {
            let handlers = self.handlers.read().await;
            handlers.get(&job_type).cloned()
        };

        let result = match handler {
            Some(handler) => {
                let cancel = self.store.cancel_token(job_id).unwrap_or_default();
                let store = self.store.clone();
                let event_tx = self.event_tx.clone();
                let ctx =
                    JobContext::new(job, cancel).with_progress_callback(move |progress| {
                        if store.update_progress(job_id, progress).is_ok() {
                            let _ = event_tx.send(WorkerEvent::JobProgress { job_id, progress });
                        }
                    });

                match tokio::time::timeout(self.job_timeout, handler.execute(ctx)).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            job_id = %job_id,
                            job_type = %job_type,
                            "Job exceeded timeout of {}s",
                            self.job_timeout.as_secs()
                        );
                        JobResult::Failed(format!(
                            "Job exceeded timeout of {}s",
                            self.job_timeout.as_secs()
                        ))
                    }
                }
            }
            None => {
                warn!(job_type = %job_type, "No handler registered for job type");
                JobResult::Failed(format!("No handler for job type: {job_type}"))
            }
        };

        match result {
            JobResult::Success(result_data) => {
                if let Err(e) = self.store.complete(job_id, result_data) {
                    error!(error = %e, job_id = %job_id, "Failed to mark job as finished");
                } else {
                    info!(
                        job_id = %job_id,
                        job_type = %job_type,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Job finished"
                    );
                    let _ = self
                        .event_tx
                        .send(WorkerEvent::JobCompleted { job_id, job_type });
                }
            }
            JobResult::Failed(error) => {
                if let Err(e) = self.store.fail(job_id, &error) {
                    error!(error = %e, job_id = %job_id, "Failed to mark job as failed");
                } else {
                    warn!(
                        job_id = %job_id,
                        job_type = %job_type,
                        %error,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Job failed"
                    );
                    let _ = self.event_tx.send(WorkerEvent::JobFailed {
                        job_id,
                        job_type,
                        error,
                    });
                }
            }
            JobResult::Retry(error) => match self.store.retry_or_fail(job_id, &error) {
                Ok(litmine_core::JobStatus::Queued) => {
                    debug!(job_id = %job_id, "Job re-queued for retry");
                }
                Ok(_) => {
                    let _ = self.event_tx.send(WorkerEvent::JobFailed {
                        job_id,
                        job_type,
                        error,
                    });
                }
                Err(e) => {
                    error!(error = %e, job_id = %job_id, "Failed to retry job");
                }
            },
            JobResult::Cancelled => {
                if let Err(e) = self.store.mark_cancelled(job_id) {
                    error!(error = %e, job_id = %job_id, "Failed to mark job as cancelled");
                } else {
                    info!(job_id = %job_id, job_type = %job_type, "Job cancelled");
                    let _ = self
                        .event_tx
                        .send(WorkerEvent::JobCancelled { job_id, job_type });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval_ms, defaults::JOB_POLL_INTERVAL_MS);
        assert_eq!(config.workers_high, defaults::WORKERS_HIGH);
        assert_eq!(config.workers_medium, defaults::WORKERS_MEDIUM);
        assert_eq!(config.workers_low, defaults::WORKERS_LOW);
        assert!(config.enabled);
    }

    #[test]
    fn test_worker_config_pool_size_sums_tiers() {
        let config = WorkerConfig::default().with_workers(2, 3, 1);
        assert_eq!(config.pool_size(), 6);
    }

    #[test]
    fn test_worker_config_pool_size_is_at_least_one() {
        let config = WorkerConfig::default().with_workers(0, 0, 0);
        assert_eq!(config.pool_size(), 1);
    }

    #[test]
    fn test_worker_config_builders() {
        let config = WorkerConfig::default()
            .with_poll_interval(1000)
            .with_workers(1, 1, 1)
            .with_job_timeout(60)
            .with_enabled(false);

        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.pool_size(), 3);
        assert_eq!(config.job_timeout_secs, 60);
        assert!(!config.enabled);
    }

    #[test]
    fn test_worker_event_variants_clone() {
        let job_id = Uuid::new_v4();
        let event = WorkerEvent::JobStarted {
            job_id,
            job_type: JobType::Kinderminer,
        };
        let cloned = event.clone();
        match (event, cloned) {
            (
                WorkerEvent::JobStarted { job_id: a, .. },
                WorkerEvent::JobStarted { job_id: b, .. },
            ) => assert_eq!(a, b),
            _ => panic!("clone changed the variant"),
        }
    }
}
