// src/ct_log/poller.rs
use anyhow::{Context, Result};
use futures_util::FutureExt;
use std::ops::Range;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::client::LogClient;
use super::cursor::LogCursor;
use super::log_list::DiscoveredShard;
use super::types::ShardDescriptor;
use crate::cert_parser::CertificateParser;
use crate::pipeline::EventPipeline;

/// Settings shared by every shard worker
#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub poll_interval: Duration,
    pub batch_size: u64,
    pub lookback: u64,
    pub parse_precerts: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            batch_size: 50,
            lookback: 100,
            parse_precerts: true,
        }
    }
}

/// Result of one worker pass over a shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Cursor placed behind the head; nothing fetched yet
    Initialized { position: u64 },
    /// Tree has not grown past the cursor
    UpToDate,
    /// Entries in `range` were handed to the pipeline
    Processed { range: Range<u64>, matches: usize },
    /// Shutdown arrived while a request was in flight
    Cancelled,
}

/// One log shard with its client and read position
pub struct Shard {
    descriptor: ShardDescriptor,
    client: Arc<dyn LogClient>,
    cursor: LogCursor,
}

impl Shard {
    pub fn new(descriptor: ShardDescriptor, client: Arc<dyn LogClient>) -> Self {
        let cursor = LogCursor::new(&descriptor.name, &descriptor.endpoint);
        Self {
            descriptor,
            client,
            cursor,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn cursor(&self) -> &LogCursor {
        &self.cursor
    }

    /// Run one fetch-and-match pass.
    ///
    /// An uninitialized shard only fetches its size this pass. Transport
    /// errors leave the cursor where it was. Once entries arrive the cursor
    /// moves to the end of the requested batch, whatever each entry yields.
    pub async fn poll_once(
        &mut self,
        config: &PollingConfig,
        pipeline: &EventPipeline,
        token: &CancellationToken,
    ) -> Result<PollOutcome> {
        let tree_size = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(PollOutcome::Cancelled),
            size = self.client.get_tree_size() => size.context("Failed to fetch tree size")?,
        };

        if !self.cursor.is_initialized() {
            let position = self.cursor.initialize(tree_size, config.lookback);
            info!(
                "{}: starting at index {} (tree_size={})",
                self.name(),
                position,
                tree_size
            );
            return Ok(PollOutcome::Initialized { position });
        }

        let Some(range) = self.cursor.next_batch(tree_size, config.batch_size) else {
            debug!(
                "{}: up to date (next={:?}, tree_size={})",
                self.name(),
                self.cursor.position(),
                tree_size
            );
            return Ok(PollOutcome::UpToDate);
        };

        debug!(
            "{}: fetching entries {}..{} (tree_size={})",
            self.name(),
            range.start,
            range.end,
            tree_size
        );

        let entries = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(PollOutcome::Cancelled),
            entries = self.client.get_entries(range.start, range.end) => {
                entries.context("Failed to fetch entries")?
            }
        };

        // Logs may cap the response; the cursor still moves to the batch end
        let requested = range.end - range.start;
        if (entries.len() as u64) < requested {
            warn!(
                "{}: log returned {} of {} entries for {}..{}, skipping the rest",
                self.name(),
                entries.len(),
                requested,
                range.start,
                range.end
            );
        }

        let mut matches = 0;
        for (index, entry) in range.clone().zip(entries.iter()) {
            let cert = match CertificateParser::parse_log_entry(entry, config.parse_precerts) {
                Ok(cert) => cert,
                Err(e) => {
                    debug!("{}: skipping entry {}: {:#}", self.name(), index, e);
                    pipeline.skip();
                    continue;
                }
            };

            if pipeline.process(&cert, &self.descriptor.name, index).await.is_some() {
                matches += 1;
            }
        }

        self.cursor.advance_to(range.end);

        Ok(PollOutcome::Processed { range, matches })
    }
}

impl From<DiscoveredShard> for Shard {
    fn from(shard: DiscoveredShard) -> Self {
        Shard::new(shard.descriptor, shard.client)
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("descriptor", &self.descriptor)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

/// Polls a fixed set of shards on a shared timer.
///
/// Every tick runs one worker per shard concurrently and waits for all of
/// them. Each worker owns its shard for the duration of the cycle.
pub struct PollingManager {
    shards: Vec<Shard>,
    config: PollingConfig,
    pipeline: EventPipeline,
}

impl PollingManager {
    pub fn new(shards: Vec<Shard>, config: PollingConfig, pipeline: EventPipeline) -> Self {
        Self {
            shards,
            config,
            pipeline,
        }
    }

    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    /// Initialize every shard, then poll on each tick until cancelled
    pub async fn run(&mut self, token: CancellationToken) {
        info!(
            "Polling {} CT logs every {:?} (batch {}, lookback {})",
            self.shards.len(),
            self.config.poll_interval,
            self.config.batch_size,
            self.config.lookback
        );

        self.run_cycle(&token).await;

        let period = self.config.poll_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.run_cycle(&token).await,
            }
        }

        info!("Polling stopped");
    }

    /// Run one concurrent pass over all shards and wait for every worker
    pub async fn run_cycle(&mut self, token: &CancellationToken) {
        if token.is_cancelled() {
            return;
        }

        let mut workers = JoinSet::new();
        for (slot, mut shard) in std::mem::take(&mut self.shards).into_iter().enumerate() {
            let config = self.config.clone();
            let pipeline = self.pipeline.clone();
            let token = token.clone();

            workers.spawn(async move {
                // A panicking sink or client must not cost us the shard
                let polled = AssertUnwindSafe(shard.poll_once(&config, &pipeline, &token))
                    .catch_unwind()
                    .await;

                match polled {
                    Ok(Ok(PollOutcome::Processed { range, matches })) => debug!(
                        "{}: processed {}..{} ({} matches)",
                        shard.name(),
                        range.start,
                        range.end,
                        matches
                    ),
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => {
                        warn!("{}: poll failed, retrying next tick: {:#}", shard.name(), e)
                    }
                    Err(_) => error!(
                        "{}: worker panicked, retrying from {:?} next tick",
                        shard.name(),
                        shard.cursor().position()
                    ),
                }
                (slot, shard)
            });
        }

        let mut returned = Vec::with_capacity(workers.len());
        while let Some(result) = workers.join_next().await {
            match result {
                Ok(pair) => returned.push(pair),
                Err(e) => error!("Shard worker did not complete, shard dropped: {}", e),
            }
        }

        returned.sort_by_key(|(slot, _)| *slot);
        self.shards = returned.into_iter().map(|(_, shard)| shard).collect();

        if self.shards.is_empty() {
            error!("No CT log shards left to poll");
        }
    }
}
