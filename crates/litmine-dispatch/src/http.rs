//! HTTP implementation of the batch-cluster client.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use async_trait::async_trait;

use litmine_core::{Error, PlausibilityScore, Result};

use crate::cluster::{BatchCluster, ClusterHandle, ClusterStatus, EvalRequest};

/// Timeout for individual HTTP calls (submit, poll, cancel). The overall
/// evaluation deadline lives in the dispatcher, not here.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    scores: Option<Vec<PlausibilityScore>>,
    #[serde(default)]
    error: Option<String>,
}

/// Batch-cluster client speaking JSON over HTTP with bearer-token auth.
pub struct HttpBatchCluster {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBatchCluster {
    /// Create a client for the cluster at `base_url`, authenticating with
    /// `token` when present.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn jobs_url(&self) -> String {
        format!("{}/jobs", self.base_url)
    }

    fn job_url(&self, handle: &ClusterHandle) -> String {
        format!("{}/jobs/{}", self.base_url, handle)
    }
}

#[async_trait]
impl BatchCluster for HttpBatchCluster {
    async fn submit(&self, request: &EvalRequest) -> Result<ClusterHandle> {
        let response = self
            .authed(self.client.post(self.jobs_url()))
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        let submitted: SubmitResponse = response.json().await?;
        debug!(
            subsystem = "dispatch",
            op = "submit",
            cluster_handle = %submitted.id,
            triple_count = request.triples.len(),
            "Submitted evaluation to cluster"
        );
        Ok(ClusterHandle(submitted.id))
    }

    async fn status(&self, handle: &ClusterHandle) -> Result<ClusterStatus> {
        let response = self
            .authed(self.client.get(self.job_url(handle)))
            .send()
            .await?
            .error_for_status()?;

        let status: StatusResponse = response.json().await?;
        match status.status.as_str() {
            "pending" | "running" => Ok(ClusterStatus::Pending),
            "done" => Ok(ClusterStatus::Done(status.scores.unwrap_or_default())),
            "failed" => Ok(ClusterStatus::Failed(
                status
                    .error
                    .unwrap_or_else(|| "no failure reason reported".to_string()),
            )),
            other => Err(Error::Request(format!(
                "cluster reported unknown status: {other}"
            ))),
        }
    }

    async fn cancel(&self, handle: &ClusterHandle) -> Result<()> {
        self.authed(self.client.delete(self.job_url(handle)))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
