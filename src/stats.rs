// src/stats.rs
//! Counters for certificates seen by all source workers

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Thread-safe statistics collector. Clones share the same counters.
#[derive(Debug, Clone)]
pub struct StatsCollector {
    inner: Arc<Counters>,
    start_time: Instant,
}

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    skipped: AtomicU64,
    matches: AtomicU64,
    sink_failures: AtomicU64,
}

/// Snapshot of statistics at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    /// Certificates that reached the matcher
    pub total_processed: u64,
    /// Entries dropped as malformed or unsupported
    pub skipped: u64,
    pub matches_found: u64,
    pub sink_failures: u64,
    pub certs_per_minute: f64,
    pub uptime_secs: u64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Counters::default()),
            start_time: Instant::now(),
        }
    }

    pub fn increment_processed(&self) {
        self.inner.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_skipped(&self) {
        self.inner.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_matches(&self) {
        self.inner.matches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_sink_failures(&self, count: u64) {
        if count > 0 {
            self.inner.sink_failures.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let elapsed = self.start_time.elapsed();
        let processed = self.inner.processed.load(Ordering::Relaxed);

        let rate = if elapsed.as_secs() > 0 {
            (processed as f64 / elapsed.as_secs() as f64) * 60.0
        } else {
            0.0
        };

        StatsSnapshot {
            total_processed: processed,
            skipped: self.inner.skipped.load(Ordering::Relaxed),
            matches_found: self.inner.matches.load(Ordering::Relaxed),
            sink_failures: self.inner.sink_failures.load(Ordering::Relaxed),
            certs_per_minute: rate,
            uptime_secs: elapsed.as_secs(),
        }
    }

    /// One-line summary for periodic logging
    pub fn format_stats(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            "{} processed | {} skipped | {} matches | {:.1} certs/min | uptime: {}",
            snapshot.total_processed,
            snapshot.skipped,
            snapshot.matches_found,
            snapshot.certs_per_minute,
            Self::format_uptime(snapshot.uptime_secs)
        )
    }

    pub fn format_uptime(secs: u64) -> String {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_collector_new() {
        let snapshot = StatsCollector::new().snapshot();
        assert_eq!(snapshot.total_processed, 0);
        assert_eq!(snapshot.skipped, 0);
        assert_eq!(snapshot.matches_found, 0);
    }

    #[test]
    fn test_counters() {
        let stats = StatsCollector::new();
        stats.increment_processed();
        stats.increment_processed();
        stats.increment_skipped();
        stats.increment_matches();
        stats.add_sink_failures(0);
        stats.add_sink_failures(2);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_processed, 2);
        assert_eq!(snapshot.skipped, 1);
        assert_eq!(snapshot.matches_found, 1);
        assert_eq!(snapshot.sink_failures, 2);
    }

    #[test]
    fn test_clone_shares_state() {
        let stats1 = StatsCollector::new();
        let stats2 = stats1.clone();

        stats1.increment_processed();
        stats2.increment_processed();

        assert_eq!(stats1.snapshot().total_processed, 2);
        assert_eq!(stats2.snapshot().total_processed, 2);
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(StatsCollector::format_uptime(30), "30s");
        assert_eq!(StatsCollector::format_uptime(90), "1m 30s");
        assert_eq!(StatsCollector::format_uptime(3661), "1h 1m 1s");
    }
}
