//! litmine worker process: wires the index, job store, handlers, and the
//! dispatcher together from environment configuration and runs the pool
//! until interrupted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use litmine_core::DocumentInput;
use litmine_dispatch::{Credentials, DispatchConfig, HttpBatchCluster, HypothesisDispatcher};
use litmine_index::TermIndex;
use litmine_jobs::{
    HypothesisEvalHandler, IndexHandler, JobWorker, KinderMinerHandler, MemoryJobStore,
    SkimHandler, WorkerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("litmine=info")),
        )
        .init();

    let config = WorkerConfig::from_env();
    let index = Arc::new(TermIndex::new());
    let store = Arc::new(MemoryJobStore::new());

    if let Ok(dir) = std::env::var("LITMINE_INDEX_DIR") {
        let loaded = load_corpus(&index, Path::new(&dir))?;
        info!(doc_count = loaded, dir = %dir, "Loaded corpus snapshot");
    }

    let worker = JobWorker::new(store.clone(), config);
    worker
        .register_handler(KinderMinerHandler::new(index.clone()))
        .await;
    worker.register_handler(SkimHandler::new(index.clone())).await;
    worker.register_handler(IndexHandler::new(index.clone())).await;

    match std::env::var("LITMINE_CLUSTER_URL") {
        Ok(cluster_url) => {
            let credentials = Credentials::from_env();
            let cluster = HttpBatchCluster::new(cluster_url, credentials.cluster_token.clone())
                .context("building batch-cluster client")?;
            let dispatcher = Arc::new(HypothesisDispatcher::new(
                Arc::new(cluster),
                DispatchConfig::from_env(),
                credentials,
            ));
            worker
                .register_handler(HypothesisEvalHandler::new(dispatcher))
                .await;
        }
        Err(_) => {
            warn!("LITMINE_CLUSTER_URL not set, hypothesis evaluation disabled");
        }
    }

    let handle = worker.start();

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("Shutting down");
    handle.shutdown().await?;
    Ok(())
}

/// Load a line-delimited JSON corpus snapshot (`documents.jsonl`) from the
/// index directory, if one exists.
fn load_corpus(index: &TermIndex, dir: &Path) -> anyhow::Result<usize> {
    let path: PathBuf = dir.join("documents.jsonl");
    if !path.exists() {
        return Ok(0);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;

    let mut loaded = 0usize;
    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc: DocumentInput = serde_json::from_str(line)
            .with_context(|| format!("parsing {} line {}", path.display(), line_no + 1))?;
        if index.add_document(&doc) {
            loaded += 1;
        }
    }
    Ok(loaded)
}
