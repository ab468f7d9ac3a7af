// src/certstream/listener.rs
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::StreamClient;
use super::message::CertStreamMessage;
use crate::pipeline::EventPipeline;

#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Logical feed name used as the event source
    pub name: String,
    /// Fixed wait before resubscribing after an error or disconnect
    pub reconnect_delay: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            name: "certstream".to_string(),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// Consumes a live feed, resubscribing forever until cancelled
pub struct LiveManager {
    client: Arc<dyn StreamClient>,
    config: LiveConfig,
    pipeline: EventPipeline,
}

impl LiveManager {
    pub fn new(client: Arc<dyn StreamClient>, config: LiveConfig, pipeline: EventPipeline) -> Self {
        Self {
            client,
            config,
            pipeline,
        }
    }

    pub async fn run(&self, token: CancellationToken) {
        info!("Starting live monitoring of {}", self.config.name);

        let mut attempt: u64 = 0;
        while !token.is_cancelled() {
            attempt += 1;

            match self.consume(&token).await {
                Ok(()) if token.is_cancelled() => break,
                Ok(()) => warn!("{}: stream ended, reconnecting", self.config.name),
                Err(e) => warn!(
                    "{}: stream error (attempt {}): {:#}",
                    self.config.name, attempt, e
                ),
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }

        info!("Live monitoring of {} stopped", self.config.name);
    }

    /// Subscribe once and process messages until the stream fails or ends
    async fn consume(&self, token: &CancellationToken) -> anyhow::Result<()> {
        let mut messages = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(()),
            subscription = self.client.subscribe() => subscription?,
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                next = messages.next() => next,
            };

            let message = match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(e),
                None => return Ok(()),
            };

            match CertStreamMessage::from_value(&message) {
                Some(cert) => {
                    self.pipeline.process(&cert, &self.config.name, 0).await;
                }
                None => debug!("{}: ignoring non-certificate message", self.config.name),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certstream::client::StaticStream;
    use crate::output::OutputManager;
    use crate::stats::StatsCollector;
    use crate::watchlist::Watchlist;
    use anyhow::Result;
    use async_trait::async_trait;
    use futures_util::stream::BoxStream;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Unreachable(AtomicUsize);

    #[async_trait]
    impl StreamClient for Unreachable {
        async fn subscribe(&self) -> Result<BoxStream<'static, Result<Value>>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("connection refused")
        }
    }

    async fn pipeline() -> (EventPipeline, Arc<Watchlist>) {
        let watchlist = Arc::new(Watchlist::new());
        watchlist.add("example.com", true).await;
        let pipeline = EventPipeline::new(
            watchlist.clone(),
            Arc::new(OutputManager::new()),
            StatsCollector::new(),
            false,
        );
        (pipeline, watchlist)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_cancelled() {
        let client = Arc::new(Unreachable(AtomicUsize::new(0)));
        let (pipeline, _) = pipeline().await;
        let manager = LiveManager::new(client.clone(), LiveConfig::default(), pipeline);
        let token = CancellationToken::new();

        let handle = {
            let token = token.clone();
            tokio::spawn(async move { manager.run(token).await })
        };

        // Three attempts: t=0, t=5s, t=10s
        tokio::time::sleep(Duration::from_secs(12)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(client.0.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_consume_processes_nothing() {
        let client = Arc::new(StaticStream::new(vec![json!({
            "message_type": "certificate_update",
            "data": {"leaf_cert": {"subject": {"CN": "www.example.com"}}}
        })]));
        let (pipeline, _) = pipeline().await;
        let stats = pipeline.stats().clone();
        let manager = LiveManager::new(client, LiveConfig::default(), pipeline);
        let token = CancellationToken::new();
        token.cancel();

        for _ in 0..100 {
            manager.consume(&token).await.unwrap();
        }
        manager.run(token).await;

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_processed, 0);
        assert_eq!(snapshot.matches_found, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_processes_messages_and_skips_noise() {
        let client = Arc::new(StaticStream::new(vec![
            json!({"message_type": "heartbeat"}),
            json!({
                "message_type": "certificate_update",
                "data": {"leaf_cert": {
                    "subject": {"CN": "www.example.com"},
                    "extensions": {"subjectAltName": ["www.example.com"]}
                }}
            }),
            json!({
                "message_type": "certificate_update",
                "data": {"leaf_cert": {"subject": {"CN": "unrelated.org"}}}
            }),
        ]));
        let (pipeline, watchlist) = pipeline().await;
        let stats = pipeline.stats().clone();
        let manager = LiveManager::new(client, LiveConfig::default(), pipeline);
        let token = CancellationToken::new();

        let handle = {
            let token = token.clone();
            tokio::spawn(async move { manager.run(token).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
        handle.await.unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_processed, 2);
        assert_eq!(snapshot.matches_found, 1);
        assert!(watchlist.snapshot().await["example.com"].last_seen.is_some());
    }
}
