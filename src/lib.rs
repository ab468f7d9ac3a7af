// src/lib.rs
// Library interface for domain-watcher
pub mod cert_parser;
pub mod certstream;
pub mod cli;
pub mod config;
pub mod ct_log;
pub mod error;
pub mod monitor;
pub mod output;
pub mod pipeline;
pub mod stats;
pub mod types;
pub mod watchlist;
