//! Resumable submit/poll state machine for hypothesis evaluation.
//!
//! `submitted → polling → done/failed/timed-out`, driven by periodic
//! non-blocking checks. The worker task suspends between polls; it never
//! parks a thread for the remote duration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::time::sleep;
use tracing::{info, warn};

use litmine_core::{
    CancelToken, Error, PlausibilityScore, Result, ScoredTriple, TripleResult,
};

use crate::cluster::{BatchCluster, ClusterStatus, EvalRequest};
use crate::config::{Credentials, DispatchConfig};

/// Transient poll failures tolerated in a row before the evaluation is
/// surfaced as failed.
const MAX_CONSECUTIVE_POLL_FAILURES: u32 = 3;

/// Drives one evaluation through the external cluster and merges the
/// verdicts back onto the triples.
pub struct HypothesisDispatcher {
    cluster: Arc<dyn BatchCluster>,
    config: DispatchConfig,
    credentials: Credentials,
}

impl HypothesisDispatcher {
    pub fn new(
        cluster: Arc<dyn BatchCluster>,
        config: DispatchConfig,
        credentials: Credentials,
    ) -> Self {
        Self {
            cluster,
            config,
            credentials,
        }
    }

    /// Submit `triples` for evaluation and poll until a terminal state.
    ///
    /// Progress reflects wall-clock against the configured deadline (the
    /// cluster reports no finer granularity). Cancellation is honored
    /// between polls and forwarded to the cluster best-effort. A deadline
    /// overrun fails with a distinguishable timeout cause.
    pub async fn evaluate(
        &self,
        triples: Vec<TripleResult>,
        model: &str,
        progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancelToken,
    ) -> Result<Vec<ScoredTriple>> {
        cancel.checkpoint()?;

        let request = EvalRequest {
            model: model.to_string(),
            credentials: self.credentials.clone(),
            triples: triples.clone(),
        };
        let handle = self.cluster.submit(&request).await?;
        info!(
            subsystem = "dispatch",
            op = "evaluate",
            cluster_handle = %handle,
            triple_count = triples.len(),
            "Evaluation submitted, polling"
        );

        let started = Instant::now();
        let mut poll_failures = 0u32;
        loop {
            if cancel.is_cancelled() {
                let _ = self.cluster.cancel(&handle).await;
                return Err(Error::Cancelled);
            }

            match self.cluster.status(&handle).await {
                Ok(ClusterStatus::Done(scores)) => {
                    info!(
                        subsystem = "dispatch",
                        op = "evaluate",
                        cluster_handle = %handle,
                        result_count = scores.len(),
                        duration_ms = started.elapsed().as_millis() as u64,
                        "Evaluation finished"
                    );
                    return Ok(merge_scores(triples, scores));
                }
                Ok(ClusterStatus::Failed(reason)) => {
                    return Err(Error::Request(format!(
                        "cluster evaluation failed: {reason}"
                    )));
                }
                Ok(ClusterStatus::Pending) => {
                    poll_failures = 0;
                }
                Err(e) => {
                    poll_failures += 1;
                    if poll_failures > MAX_CONSECUTIVE_POLL_FAILURES {
                        return Err(e);
                    }
                    warn!(
                        subsystem = "dispatch",
                        cluster_handle = %handle,
                        poll_failures,
                        error = %e,
                        "Cluster poll failed, will retry"
                    );
                }
            }

            if started.elapsed() >= self.config.timeout {
                let _ = self.cluster.cancel(&handle).await;
                return Err(Error::Timeout(format!(
                    "cluster evaluation did not finish within {}s",
                    self.config.timeout.as_secs()
                )));
            }

            let elapsed = started.elapsed().as_secs_f64();
            let deadline = self.config.timeout.as_secs_f64();
            progress((elapsed / deadline).min(0.95));

            sleep(self.config.poll_interval).await;
        }
    }
}

/// Attach plausibility verdicts to the triples they were issued for,
/// keyed by (a, b, c). Triples the cluster did not score stay in the
/// output unscored.
pub fn merge_scores(
    triples: Vec<TripleResult>,
    scores: Vec<PlausibilityScore>,
) -> Vec<ScoredTriple> {
    let mut by_key: HashMap<(String, String, String), PlausibilityScore> = scores
        .into_iter()
        .map(|s| ((s.a_term.clone(), s.b_term.clone(), s.c_term.clone()), s))
        .collect();

    triples
        .into_iter()
        .map(|triple| {
            let key = (
                triple.a_term.clone(),
                triple.b_term.clone(),
                triple.c_term.clone(),
            );
            match by_key.remove(&key) {
                Some(score) => ScoredTriple {
                    triple,
                    plausibility: Some(score.score),
                    rationale: score.rationale,
                },
                None => ScoredTriple {
                    triple,
                    plausibility: None,
                    rationale: None,
                },
            }
        })
        .collect()
}
