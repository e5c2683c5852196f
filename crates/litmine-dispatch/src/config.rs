//! Environment-driven dispatcher configuration.
//!
//! All values are read once at process start and stay immutable for the
//! process lifetime.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use litmine_core::defaults;

/// Externally supplied credentials for the dispatcher and its
/// collaborators. Serialized only into the cluster payload; never logged
/// (the Debug impl redacts every field).
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Search-provider API key (forwarded to the cluster payload
    /// environment by the operator, unused locally).
    pub search_api_key: Option<String>,
    /// LLM API key for the evaluation model.
    pub llm_api_key: Option<String>,
    /// Token authenticating against the batch cluster.
    pub cluster_token: Option<String>,
}

impl Credentials {
    /// Read credentials from the environment.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `LITMINE_SEARCH_API_KEY` | Search-provider API key |
    /// | `LITMINE_LLM_API_KEY` | LLM API key |
    /// | `LITMINE_CLUSTER_TOKEN` | Batch-cluster token |
    pub fn from_env() -> Self {
        Self {
            search_api_key: read_secret("LITMINE_SEARCH_API_KEY"),
            llm_api_key: read_secret("LITMINE_LLM_API_KEY"),
            cluster_token: read_secret("LITMINE_CLUSTER_TOKEN"),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("search_api_key", &redact(&self.search_api_key))
            .field("llm_api_key", &redact(&self.llm_api_key))
            .field("cluster_token", &redact(&self.cluster_token))
            .finish()
    }
}

fn read_secret(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn redact(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "***",
        None => "<unset>",
    }
}

/// Polling cadence and overall deadline for cluster evaluations.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Interval between status polls.
    pub poll_interval: Duration,
    /// Overall deadline before the owning job fails with a timeout cause.
    pub timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(defaults::CLUSTER_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(defaults::CLUSTER_TIMEOUT_SECS),
        }
    }
}

impl DispatchConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `LITMINE_CLUSTER_POLL_INTERVAL_SECS` | `30` | Seconds between polls |
    /// | `LITMINE_CLUSTER_TIMEOUT_SECS` | `21600` | Overall deadline |
    pub fn from_env() -> Self {
        let poll_interval = std::env::var("LITMINE_CLUSTER_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::CLUSTER_POLL_INTERVAL_SECS);

        let timeout = std::env::var("LITMINE_CLUSTER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::CLUSTER_TIMEOUT_SECS);

        Self {
            poll_interval: Duration::from_secs(poll_interval.max(1)),
            timeout: Duration::from_secs(timeout.max(1)),
        }
    }

    /// Set the polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the overall deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
