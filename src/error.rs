// src/error.rs
use thiserror::Error;

/// Startup failures surfaced by [`crate::monitor::Monitor::run`].
///
/// Steady-state source and sink errors are logged and retried, never
/// returned.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("no usable CT log shards discovered")]
    NoShards,

    #[error("CT log discovery failed: {0:#}")]
    Discovery(anyhow::Error),
}
