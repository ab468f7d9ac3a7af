// src/monitor.rs
//! Lifecycle and mode selection for the certificate monitor

use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{error, info};

use crate::certstream::{LiveConfig, LiveManager, StreamClient};
use crate::ct_log::{PollingConfig, PollingManager, Shard, ShardProvider};
use crate::error::MonitorError;
use crate::output::{OutputHandler, OutputManager};
use crate::pipeline::EventPipeline;
use crate::stats::StatsCollector;
use crate::types::WatchEntry;
use crate::watchlist::Watchlist;

/// Where certificates come from
pub enum Source {
    /// Timer-driven pull from discovered CT log shards
    Polling {
        provider: Box<dyn ShardProvider>,
        config: PollingConfig,
    },
    /// Push feed of pre-parsed certificate updates
    Live {
        client: Arc<dyn StreamClient>,
        config: LiveConfig,
    },
}

impl Source {
    pub fn polling(provider: impl ShardProvider + 'static, config: PollingConfig) -> Self {
        Source::Polling {
            provider: Box::new(provider),
            config,
        }
    }

    pub fn live(client: impl StreamClient + 'static, config: LiveConfig) -> Self {
        Source::Live {
            client: Arc::new(client),
            config,
        }
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Polling { config, .. } => f
                .debug_struct("Polling")
                .field("config", config)
                .finish_non_exhaustive(),
            Source::Live { config, .. } => f
                .debug_struct("Live")
                .field("config", config)
                .finish_non_exhaustive(),
        }
    }
}

/// Owns the watch list, output handlers and shutdown signal.
///
/// Output handlers must be registered before [`Monitor::run`]; the handler
/// list is frozen when a run starts.
#[derive(Debug)]
pub struct Monitor {
    watchlist: Arc<Watchlist>,
    output: OutputManager,
    stats: StatsCollector,
    shutdown_token: CancellationToken,
    all_domains: bool,
}

impl Monitor {
    pub fn new() -> Self {
        Self {
            watchlist: Arc::new(Watchlist::new()),
            output: OutputManager::new(),
            stats: StatsCollector::new(),
            shutdown_token: CancellationToken::new(),
            all_domains: false,
        }
    }

    /// Report every certificate, bypassing the watch list
    pub fn with_all_domains(mut self, enabled: bool) -> Self {
        self.all_domains = enabled;
        self
    }

    pub fn all_domains(&self) -> bool {
        self.all_domains
    }

    pub async fn add_domain(&self, domain: &str, include_subdomains: bool) {
        self.watchlist.add(domain, include_subdomains).await;
    }

    pub async fn remove_domain(&self, domain: &str) {
        self.watchlist.remove(domain).await;
    }

    /// Copy of every watch entry keyed by domain
    pub async fn watched_domains(&self) -> HashMap<String, WatchEntry> {
        self.watchlist.snapshot().await
    }

    pub fn watchlist(&self) -> Arc<Watchlist> {
        Arc::clone(&self.watchlist)
    }

    pub fn add_handler(&mut self, handler: Arc<dyn OutputHandler>) {
        self.output.add_handler(handler);
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }

    /// Signal shutdown. Safe to call any number of times, before or after `run`.
    pub fn stop(&self) {
        if !self.shutdown_token.is_cancelled() {
            info!("Stopping monitor");
        }
        self.shutdown_token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Resolves once [`Monitor::stop`] has been called
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown_token.cancelled()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Run `source` until stopped.
    ///
    /// Only startup failures are returned; source and sink errors during
    /// the run are logged and retried.
    pub async fn run(&self, source: Source) -> Result<(), MonitorError> {
        if self.is_stopped() {
            return Ok(());
        }

        let pipeline = EventPipeline::new(
            Arc::clone(&self.watchlist),
            Arc::new(self.output.clone()),
            self.stats.clone(),
            self.all_domains,
        );

        if self.all_domains {
            info!("All-domains mode: every certificate will be reported");
        } else {
            info!("Watching {} domains", self.watchlist.len().await);
        }

        match source {
            Source::Polling { provider, config } => {
                let discovered = tokio::select! {
                    biased;
                    _ = self.shutdown_token.cancelled() => return Ok(()),
                    discovered = provider.discover() => discovered.map_err(|e| {
                        error!("CT log discovery failed: {:#}", e);
                        MonitorError::Discovery(e)
                    })?,
                };

                if discovered.is_empty() {
                    error!("No usable CT log shards found");
                    return Err(MonitorError::NoShards);
                }

                let shards = discovered.into_iter().map(Shard::from).collect();
                let mut manager = PollingManager::new(shards, config, pipeline);
                manager.run(self.shutdown_token.clone()).await;
            }
            Source::Live { client, config } => {
                LiveManager::new(client, config, pipeline)
                    .run(self.shutdown_token.clone())
                    .await;
            }
        }

        Ok(())
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_add_and_remove_domains() {
        let monitor = Monitor::new();
        monitor.add_domain("Example.com", true).await;

        let domains = monitor.watched_domains().await;
        assert_eq!(domains.len(), 1);
        let entry = &domains["example.com"];
        assert!(entry.active);
        assert!(entry.include_subdomains);
        assert!(entry.last_seen.is_none());

        monitor.remove_domain("example.com").await;
        assert!(monitor.watched_domains().await.is_empty());
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let monitor = Monitor::new();
        monitor.stop();
        monitor.stop();

        tokio::time::timeout(Duration::from_millis(100), monitor.cancelled())
            .await
            .expect("cancellation not observed");
        assert!(monitor.is_stopped());
    }

    #[tokio::test]
    async fn test_run_after_stop_returns_immediately() {
        let monitor = Monitor::new();
        monitor.stop();

        let source = Source::live(
            crate::certstream::StaticStream::default(),
            LiveConfig::default(),
        );
        tokio::time::timeout(Duration::from_millis(100), monitor.run(source))
            .await
            .expect("run did not return")
            .unwrap();
    }
}
