// src/ct_log/mod.rs
pub mod client;
pub mod cursor;
pub mod log_list;
pub mod poller;
pub mod types;

pub use client::{HttpLogClient, LogClient};
pub use cursor::LogCursor;
pub use log_list::{
    DiscoveredShard, LogFilter, LogListDiscovery, ShardProvider, StaticShards, UsableLogFilter,
};
pub use poller::{PollOutcome, PollingConfig, PollingManager, Shard};
pub use types::{LogEntry, LogInfo, LogListV3, ShardDescriptor, SignedTreeHead};
