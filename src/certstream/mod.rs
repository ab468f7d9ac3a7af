// src/certstream/mod.rs
//! Live certificate feed (certstream protocol over WebSocket)
pub mod client;
pub mod listener;
pub mod message;

pub use client::{StaticStream, StreamClient, WebSocketStreamClient};
pub use listener::{LiveConfig, LiveManager};
pub use message::CertStreamMessage;
