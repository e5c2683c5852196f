//! End-to-end tests: submit → claim → execute → terminal state, driven
//! through the real worker loop against an in-process index.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::broadcast;

use litmine_core::{
    DocumentInput, HypothesisEvalParams, JobParams, JobPriority, JobStatus, JobType,
    KinderMinerParams, PlausibilityScore, SkimParams, TripleResult,
};
use litmine_dispatch::mock::MockCluster;
use litmine_dispatch::{DispatchConfig, HypothesisDispatcher};
use litmine_index::TermIndex;
use litmine_jobs::{
    HypothesisEvalHandler, IndexHandler, Job, JobContext, JobHandler, JobResult, JobWorker,
    KinderMinerHandler, MemoryJobStore, SkimHandler, WorkerConfig, WorkerEvent,
};

fn km_params(a: &str, b: &str) -> JobParams {
    JobParams::Kinderminer(KinderMinerParams {
        a_terms: vec![a.to_string()],
        b_terms: vec![b.to_string()],
        censor_year: None,
        censor_year_lower: None,
        return_pmids: false,
        ab_fet_threshold: None,
        top_n_articles_most_cited: None,
        top_n_articles_most_recent: None,
    })
}

fn sample_index() -> Arc<TermIndex> {
    let index = Arc::new(TermIndex::new());
    index.add_document(&DocumentInput {
        id: 1,
        year: Some(2021),
        citation_count: Some(4),
        title: "breast cancer abemaciclib trial".to_string(),
        abstract_text: String::new(),
    });
    index.add_document(&DocumentInput {
        id: 2,
        year: Some(2019),
        citation_count: None,
        title: "breast cancer background".to_string(),
        abstract_text: String::new(),
    });
    index
}

fn test_config() -> WorkerConfig {
    WorkerConfig::default()
        .with_poll_interval(10)
        .with_workers(1, 0, 0)
}

async fn wait_until_terminal(store: &MemoryJobStore, id: uuid::Uuid) -> Job {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let job = store.get(id).expect("job must stay queryable");
        if job.status.is_terminal() {
            return job;
        }
        assert!(
            Instant::now() < deadline,
            "job never reached a terminal state"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

async fn next_matching<F>(rx: &mut broadcast::Receiver<WorkerEvent>, mut pred: F) -> WorkerEvent
where
    F: FnMut(&WorkerEvent) -> bool,
{
    let deadline = Duration::from_secs(10);
    loop {
        let event = tokio::time::timeout(deadline, rx.recv())
            .await
            .expect("timed out waiting for worker event")
            .expect("event channel closed");
        if pred(&event) {
            return event;
        }
    }
}

/// Handler that runs until cancelled (or for ~1s), reporting progress.
struct SlowHandler;

#[async_trait]
impl JobHandler for SlowHandler {
    fn job_type(&self) -> JobType {
        JobType::Kinderminer
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        for step in 0..100 {
            if ctx.is_cancelled() {
                return JobResult::Cancelled;
            }
            ctx.report_progress(step as f64 / 100.0);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        JobResult::Success(json!({"done": true}))
    }
}

/// Handler that always fails.
struct FailingHandler;

#[async_trait]
impl JobHandler for FailingHandler {
    fn job_type(&self) -> JobType {
        JobType::Kinderminer
    }

    async fn execute(&self, _ctx: JobContext) -> JobResult {
        JobResult::Failed("index unavailable".to_string())
    }
}

#[tokio::test]
async fn test_kinderminer_job_end_to_end() {
    let index = sample_index();
    let store = Arc::new(MemoryJobStore::new());
    let worker = JobWorker::new(store.clone(), test_config());
    worker.register_handler(KinderMinerHandler::new(index)).await;
    let handle = worker.start();

    let id = store
        .submit(km_params("breast cancer", "abemaciclib"), JobPriority::High)
        .unwrap();

    let job = wait_until_terminal(&store, id).await;
    assert_eq!(job.status, JobStatus::Finished);
    assert_eq!(job.progress, 1.0);
    assert!(job.started_at.is_some());
    assert!(job.finished_at.is_some());

    let result = job.result.expect("finished job carries a result");
    let pairs = result.as_array().expect("result is an array");
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0]["a_count"], 2);
    assert_eq!(pairs[0]["b_count"], 1);
    assert_eq!(pairs[0]["ab_count"], 1);
    assert_eq!(pairs[0]["total_count"], 2);
    assert_eq!(pairs[0]["pvalue"], 1.0);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_skim_job_end_to_end() {
    let index = Arc::new(TermIndex::new());
    let mut id = 0u64;
    let mut add = |count: usize, text: &str| {
        for _ in 0..count {
            index.add_document(&DocumentInput {
                id,
                year: None,
                citation_count: None,
                title: text.to_string(),
                abstract_text: String::new(),
            });
            id += 1;
        }
    };
    add(12, "migraine serotonin pathway");
    add(8, "serotonin sumatriptan response");
    add(150, "unrelated background record");

    let store = Arc::new(MemoryJobStore::new());
    let worker = JobWorker::new(store.clone(), test_config());
    worker.register_handler(SkimHandler::new(index.clone())).await;
    let handle = worker.start();

    let params = JobParams::Skim(SkimParams {
        a_terms: vec!["migraine".to_string()],
        b_terms: vec!["serotonin".to_string()],
        c_terms: vec!["sumatriptan".to_string()],
        top_n: 10,
        ab_fet_threshold: 1.0,
        bc_fet_threshold: 1.0,
        censor_year: None,
        censor_year_lower: None,
        return_pmids: false,
    });
    let job_id = store.submit(params, JobPriority::Medium).unwrap();

    let job = wait_until_terminal(&store, job_id).await;
    assert_eq!(job.status, JobStatus::Finished);

    let triples = job.result.unwrap();
    let triples = triples.as_array().unwrap();
    assert_eq!(triples.len(), 1);
    assert_eq!(triples[0]["a_term"], "migraine");
    assert_eq!(triples[0]["b_term"], "serotonin");
    assert_eq!(triples[0]["c_term"], "sumatriptan");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_high_priority_dispatched_before_low() {
    let index = sample_index();
    let store = Arc::new(MemoryJobStore::new());
    let worker = JobWorker::new(store.clone(), test_config());
    worker.register_handler(KinderMinerHandler::new(index)).await;
    let mut events = worker.events();

    // the low job is submitted first, while the pool (of one) is idle
    let low = store
        .submit(km_params("breast cancer", "trial"), JobPriority::Low)
        .unwrap();
    let high = store
        .submit(km_params("breast cancer", "background"), JobPriority::High)
        .unwrap();

    let handle = worker.start();

    let first_started = next_matching(&mut events, |e| {
        matches!(e, WorkerEvent::JobStarted { .. })
    })
    .await;
    match first_started {
        WorkerEvent::JobStarted { job_id, .. } => assert_eq!(job_id, high),
        _ => unreachable!(),
    }

    wait_until_terminal(&store, high).await;
    wait_until_terminal(&store, low).await;
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cancelled_queued_job_never_runs() {
    let index = sample_index();
    let store = Arc::new(MemoryJobStore::new());
    let worker = JobWorker::new(store.clone(), test_config());
    worker.register_handler(KinderMinerHandler::new(index)).await;
    let mut events = worker.events();

    let cancelled = store
        .submit(km_params("breast cancer", "trial"), JobPriority::High)
        .unwrap();
    assert_eq!(store.cancel(cancelled).unwrap(), JobStatus::Cancelled);

    let other = store
        .submit(km_params("breast cancer", "background"), JobPriority::High)
        .unwrap();

    let handle = worker.start();
    wait_until_terminal(&store, other).await;

    // the cancelled job is still cancelled and was never started
    assert_eq!(store.get(cancelled).unwrap().status, JobStatus::Cancelled);
    let started = next_matching(&mut events, |e| {
        matches!(e, WorkerEvent::JobStarted { .. })
    })
    .await;
    match started {
        WorkerEvent::JobStarted { job_id, .. } => assert_eq!(job_id, other),
        _ => unreachable!(),
    }

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cancel_running_job_reaches_cancelled() {
    let store = Arc::new(MemoryJobStore::new());
    let worker = JobWorker::new(store.clone(), test_config());
    worker.register_handler(SlowHandler).await;
    let mut events = worker.events();
    let handle = worker.start();

    let id = store
        .submit(km_params("a", "b"), JobPriority::High)
        .unwrap();

    next_matching(&mut events, |e| {
        matches!(e, WorkerEvent::JobStarted { job_id, .. } if *job_id == id)
    })
    .await;

    assert_eq!(store.cancel(id).unwrap(), JobStatus::Running);

    let job = wait_until_terminal(&store, id).await;
    assert_eq!(job.status, JobStatus::Cancelled);
    assert!(job.result.is_none());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_progress_observed_by_poller_is_monotonic() {
    let store = Arc::new(MemoryJobStore::new());
    let worker = JobWorker::new(store.clone(), test_config());
    worker.register_handler(SlowHandler).await;
    let handle = worker.start();

    let id = store
        .submit(km_params("a", "b"), JobPriority::High)
        .unwrap();

    let mut observed = Vec::new();
    let job = loop {
        let job = store.get(id).unwrap();
        observed.push(job.progress);
        if job.status.is_terminal() {
            break job;
        }
        tokio::time::sleep(Duration::from_millis(3)).await;
    };

    assert_eq!(job.status, JobStatus::Finished);
    for window in observed.windows(2) {
        assert!(window[1] >= window[0], "progress regressed: {observed:?}");
    }
    // exactly 1.0 only once finished
    assert_eq!(*observed.last().unwrap(), 1.0);
    assert!(observed[..observed.len() - 1].iter().all(|p| *p < 1.0));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failing_job_does_not_wedge_the_worker() {
    let store = Arc::new(MemoryJobStore::new());
    let worker = JobWorker::new(store.clone(), test_config());
    worker.register_handler(FailingHandler).await;
    let handle = worker.start();

    let first = store
        .submit(km_params("a", "b"), JobPriority::High)
        .unwrap();
    let job = wait_until_terminal(&store, first).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("index unavailable"));

    // the worker is free again and picks up the next job
    let second = store
        .submit(km_params("c", "d"), JobPriority::High)
        .unwrap();
    let job = wait_until_terminal(&store, second).await;
    assert_eq!(job.status, JobStatus::Failed);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unhandled_job_type_fails_cleanly() {
    let index = sample_index();
    let store = Arc::new(MemoryJobStore::new());
    let worker = JobWorker::new(store.clone(), test_config());
    // only the KM handler is registered
    worker.register_handler(KinderMinerHandler::new(index)).await;
    let handle = worker.start();

    let params = JobParams::Skim(SkimParams {
        a_terms: vec!["a".to_string()],
        b_terms: vec!["b".to_string()],
        c_terms: vec!["c".to_string()],
        top_n: 5,
        ab_fet_threshold: 1.0,
        bc_fet_threshold: 1.0,
        censor_year: None,
        censor_year_lower: None,
        return_pmids: false,
    });
    let id = store.submit(params, JobPriority::High).unwrap();

    let job = wait_until_terminal(&store, id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("No handler"));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_index_job_end_to_end_enables_queries() {
    let index = Arc::new(TermIndex::new());
    let store = Arc::new(MemoryJobStore::new());
    let worker = JobWorker::new(store.clone(), test_config());
    worker.register_handler(IndexHandler::new(index.clone())).await;
    worker
        .register_handler(KinderMinerHandler::new(index.clone()))
        .await;
    let handle = worker.start();

    let index_params = JobParams::Index(litmine_core::IndexParams {
        documents: vec![
            DocumentInput {
                id: 1,
                year: Some(2021),
                citation_count: None,
                title: "breast cancer abemaciclib trial".to_string(),
                abstract_text: String::new(),
            },
            DocumentInput {
                id: 2,
                year: Some(2019),
                citation_count: None,
                title: "breast cancer background".to_string(),
                abstract_text: String::new(),
            },
        ],
        citation_updates: vec![],
    });
    let index_job = store.submit(index_params, JobPriority::Medium).unwrap();
    let km_job = store
        .submit(km_params("breast cancer", "abemaciclib"), JobPriority::Low)
        .unwrap();

    let job = wait_until_terminal(&store, index_job).await;
    assert_eq!(job.status, JobStatus::Finished);
    assert_eq!(job.result.unwrap()["documents_added"], 2);

    // the query job ran against the freshly indexed corpus
    let job = wait_until_terminal(&store, km_job).await;
    assert_eq!(job.status, JobStatus::Finished);
    let pairs = job.result.unwrap();
    assert_eq!(pairs[0]["a_count"], 2);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_hypothesis_eval_job_end_to_end() {
    fn triple() -> TripleResult {
        TripleResult {
            a_term: "migraine".to_string(),
            b_term: "serotonin".to_string(),
            c_term: "sumatriptan".to_string(),
            a_count: 12,
            b_count: 20,
            c_count: 8,
            ab_count: 12,
            bc_count: 8,
            total_count: 170,
            ab_pvalue: 1e-9,
            ab_sort_ratio: 0.6,
            ab_prediction_score: 0.9,
            bc_pvalue: 1e-7,
            bc_sort_ratio: 0.4,
            bc_prediction_score: 0.7,
            combined_score: 0.63,
            ab_pmids: None,
            bc_pmids: None,
        }
    }

    let cluster = Arc::new(MockCluster::completing_after(
        2,
        vec![PlausibilityScore {
            a_term: "migraine".to_string(),
            b_term: "serotonin".to_string(),
            c_term: "sumatriptan".to_string(),
            score: 0.85,
            rationale: None,
        }],
    ));
    let dispatcher = Arc::new(HypothesisDispatcher::new(
        cluster.clone(),
        DispatchConfig::default()
            .with_poll_interval(Duration::from_millis(1))
            .with_timeout(Duration::from_secs(5)),
        litmine_dispatch::Credentials::default(),
    ));

    let store = Arc::new(MemoryJobStore::new());
    let worker = JobWorker::new(store.clone(), test_config());
    worker
        .register_handler(HypothesisEvalHandler::new(dispatcher))
        .await;
    let handle = worker.start();

    let params = JobParams::HypothesisEval(HypothesisEvalParams {
        triples: vec![triple()],
        model: "o3-mini".to_string(),
    });
    let id = store.submit(params, JobPriority::Low).unwrap();

    let job = wait_until_terminal(&store, id).await;
    assert_eq!(job.status, JobStatus::Finished);

    let scored = job.result.unwrap();
    assert_eq!(scored[0]["plausibility"], 0.85);
    assert_eq!(cluster.submissions().len(), 1);

    handle.shutdown().await.unwrap();
}
