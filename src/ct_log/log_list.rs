// src/ct_log/log_list.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::client::{HttpLogClient, LogClient};
use super::types::{LogInfo, LogListV3, Operator, ShardDescriptor};

/// A shard ready to be polled
#[derive(Clone)]
pub struct DiscoveredShard {
    pub descriptor: ShardDescriptor,
    pub client: Arc<dyn LogClient>,
}

impl std::fmt::Debug for DiscoveredShard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveredShard")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Source of log shards for polling mode
#[async_trait]
pub trait ShardProvider: Send + Sync {
    async fn discover(&self) -> Result<Vec<DiscoveredShard>>;
}

/// Decides whether a log from the list should be polled
pub trait LogFilter: Send + Sync {
    fn accept(&self, operator: &Operator, log: &LogInfo, now: DateTime<Utc>) -> bool;
}

/// Logs that currently accept certificates.
///
/// A log must be usable (or readonly/pending when enabled), its temporal
/// interval must contain now, and if `operators` is non-empty its URL must
/// contain one of them (e.g. "googleapis.com", "letsencrypt.org").
#[derive(Debug, Clone, Default)]
pub struct UsableLogFilter {
    pub include_readonly: bool,
    pub include_pending: bool,
    pub operators: Vec<String>,
}

impl LogFilter for UsableLogFilter {
    fn accept(&self, _operator: &Operator, log: &LogInfo, now: DateTime<Utc>) -> bool {
        if log.url.is_empty() {
            return false;
        }

        let state_ok = log
            .state
            .as_ref()
            .is_some_and(|s| s.is_acceptable(self.include_readonly, self.include_pending));
        if !state_ok {
            return false;
        }

        if let Some(interval) = &log.temporal_interval {
            if !interval.contains(now) {
                return false;
            }
        }

        self.operators.is_empty()
            || self
                .operators
                .iter()
                .any(|op| log.url.to_ascii_lowercase().contains(&op.to_ascii_lowercase()))
    }
}

/// Pick the first `max_shards` logs accepted by `filter`, in list order
pub fn select_shards(
    list: &LogListV3,
    filter: &dyn LogFilter,
    max_shards: usize,
    now: DateTime<Utc>,
) -> Vec<ShardDescriptor> {
    list.operators
        .iter()
        .flat_map(|op| op.logs.iter().map(move |log| (op, log)))
        .filter(|(op, log)| filter.accept(op, log, now))
        .map(|(op, log)| {
            let name = if log.description.is_empty() {
                log.url.clone()
            } else {
                log.description.clone()
            };
            debug!("Selected log {} from operator {}", name, op.name);
            ShardDescriptor::new(name, &log.url)
        })
        .take(max_shards)
        .collect()
}

/// Fetches a CT log list and turns the selected logs into HTTP shards
pub struct LogListDiscovery {
    list_url: String,
    http_client: reqwest::Client,
    filter: Box<dyn LogFilter>,
    max_shards: usize,
}

impl LogListDiscovery {
    pub fn new(
        list_url: impl Into<String>,
        filter: Box<dyn LogFilter>,
        max_shards: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            list_url: list_url.into(),
            http_client,
            filter,
            max_shards,
        })
    }

    pub async fn fetch_list(&self) -> Result<LogListV3> {
        info!("Fetching CT log list from {}", self.list_url);

        let response = self
            .http_client
            .get(&self.list_url)
            .send()
            .await
            .context("Failed to fetch CT log list")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch log list: HTTP {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse log list JSON")
    }
}

#[async_trait]
impl ShardProvider for LogListDiscovery {
    async fn discover(&self) -> Result<Vec<DiscoveredShard>> {
        let list = self.fetch_list().await?;
        let selected = select_shards(&list, self.filter.as_ref(), self.max_shards, Utc::now());

        info!(
            "Selected {} CT logs (limit {})",
            selected.len(),
            self.max_shards
        );

        Ok(selected
            .into_iter()
            .map(|descriptor| DiscoveredShard {
                client: Arc::new(HttpLogClient::with_client(
                    &descriptor.endpoint,
                    self.http_client.clone(),
                )),
                descriptor,
            })
            .collect())
    }
}

/// Fixed list of log endpoints, bypassing the log list
pub struct StaticShards {
    endpoints: Vec<String>,
    timeout: Duration,
}

impl StaticShards {
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Self {
        Self { endpoints, timeout }
    }
}

#[async_trait]
impl ShardProvider for StaticShards {
    async fn discover(&self) -> Result<Vec<DiscoveredShard>> {
        let mut shards = Vec::new();

        for endpoint in self.endpoints.iter().filter(|e| !e.trim().is_empty()) {
            let descriptor = ShardDescriptor::new(endpoint.trim(), endpoint);
            match HttpLogClient::new(&descriptor.endpoint, self.timeout) {
                Ok(client) => shards.push(DiscoveredShard {
                    descriptor,
                    client: Arc::new(client),
                }),
                Err(e) => warn!("Failed to create CT client for {}: {:#}", endpoint, e),
            }
        }

        info!("Using {} custom CT logs", shards.len());
        Ok(shards)
    }
}
