// src/pipeline.rs
//! Matching and dispatch shared by the polling and live sources

use std::sync::Arc;
use tracing::{debug, info};

use crate::output::OutputManager;
use crate::stats::StatsCollector;
use crate::types::{CertificateDetails, CertificateEvent, WatchEntry};
use crate::watchlist::Watchlist;

/// A certificate that produced an event, with the watch entry that caught it
#[derive(Debug, Clone)]
pub struct Matched {
    pub event: CertificateEvent,
    /// Registry entry after `last_seen` was stamped, or an ephemeral
    /// entry in all-domains mode
    pub entry: WatchEntry,
}

/// Turns parsed certificates into dispatched events.
///
/// Cheap to clone; every source worker holds one.
#[derive(Debug, Clone)]
pub struct EventPipeline {
    watchlist: Arc<Watchlist>,
    output: Arc<OutputManager>,
    stats: StatsCollector,
    all_domains: bool,
}

impl EventPipeline {
    pub fn new(
        watchlist: Arc<Watchlist>,
        output: Arc<OutputManager>,
        stats: StatsCollector,
        all_domains: bool,
    ) -> Self {
        Self {
            watchlist,
            output,
            stats,
            all_domains,
        }
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }

    /// Record a source entry that could not be decoded
    pub fn skip(&self) {
        self.stats.increment_skipped();
    }

    /// Match one certificate and, on a hit, dispatch it to every output handler
    pub async fn process(
        &self,
        cert: &CertificateDetails,
        source: &str,
        index: u64,
    ) -> Option<Matched> {
        self.stats.increment_processed();

        let domains = cert.candidate_domains();
        if domains.is_empty() {
            debug!("{}: no domains in certificate at index {}", source, index);
            return None;
        }

        let (matched_domain, entry) = if self.all_domains {
            let first = domains[0].clone();
            let mut entry = WatchEntry::new(first.clone(), false);
            entry.last_seen = Some(entry.created_at);
            (first, entry)
        } else {
            self.watchlist.record_match(&domains).await?
        };

        self.stats.increment_matches();

        let event = CertificateEvent::new(matched_domain, domains, cert, source, index);
        info!(
            "Found matching certificate for {} from {} (index {})",
            event.matched_domain, source, index
        );

        let failures = self.output.dispatch(&event).await;
        self.stats.add_sink_failures(failures as u64);

        Some(Matched { event, entry })
    }
}
