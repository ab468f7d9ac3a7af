// src/ct_log/client.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{GetEntriesResponse, LogEntry, SignedTreeHead};

/// Read access to one CT log shard
#[async_trait]
pub trait LogClient: Send + Sync {
    /// Current number of entries in the log
    async fn get_tree_size(&self) -> Result<u64>;

    /// Entries in the half-open range `[start, end)`.
    ///
    /// Logs may return fewer entries than requested.
    async fn get_entries(&self, start: u64, end: u64) -> Result<Vec<LogEntry>>;
}

/// HTTP client for Certificate Transparency log RFC 6962 API
pub struct HttpLogClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpLogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::with_client(base_url, http_client))
    }

    /// Share an existing connection pool
    pub fn with_client(base_url: &str, http_client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get Signed Tree Head (current log size and timestamp)
    /// Endpoint: GET {base_url}/ct/v1/get-sth
    pub async fn get_sth(&self) -> Result<SignedTreeHead> {
        let url = format!("{}/ct/v1/get-sth", self.base_url);

        debug!("Fetching STH from {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch STH")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "STH request failed with status {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        let sth: SignedTreeHead = response
            .json()
            .await
            .context("Failed to parse STH JSON")?;

        debug!(
            "STH received: tree_size={}, timestamp={}",
            sth.tree_size, sth.timestamp
        );

        Ok(sth)
    }
}

#[async_trait]
impl LogClient for HttpLogClient {
    async fn get_tree_size(&self) -> Result<u64> {
        Ok(self.get_sth().await?.tree_size)
    }

    /// Endpoint: GET {base_url}/ct/v1/get-entries?start={start}&end={end - 1}
    async fn get_entries(&self, start: u64, end: u64) -> Result<Vec<LogEntry>> {
        if end <= start {
            return Ok(Vec::new());
        }

        // RFC 6962 end is inclusive
        let url = format!(
            "{}/ct/v1/get-entries?start={}&end={}",
            self.base_url,
            start,
            end - 1
        );

        debug!("Fetching entries {}-{} from {}", start, end - 1, self.base_url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch entries")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                warn!("Rate limited by CT log: {}", self.base_url);
                anyhow::bail!("Rate limited (429)");
            }

            anyhow::bail!(
                "Get entries request failed with status {}: {}",
                status,
                body
            );
        }

        let entries_response: GetEntriesResponse = response
            .json()
            .await
            .context("Failed to parse entries JSON")?;

        debug!(
            "Received {} entries from {}",
            entries_response.entries.len(),
            self.base_url
        );

        Ok(entries_response.entries)
    }
}
