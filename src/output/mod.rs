// src/output/mod.rs
//! Output handling for domain-watcher
//!
//! Matched certificates are fanned out to every registered handler in
//! registration order. A failing handler is logged and skipped; it never
//! stops the remaining handlers or the source worker that produced the event.

use crate::types::CertificateEvent;
use async_trait::async_trait;
use std::sync::Arc;

pub mod directory;
pub mod event_log;
pub mod human;
pub mod json;

/// Trait for output handlers that receive matched certificates
#[async_trait]
pub trait OutputHandler: Send + Sync {
    /// Handle one matched certificate
    async fn handle(&self, event: &CertificateEvent) -> anyhow::Result<()>;

    /// Short label used in log messages
    fn name(&self) -> &str;
}

/// Ordered list of output handlers
#[derive(Clone, Default)]
pub struct OutputManager {
    handlers: Vec<Arc<dyn OutputHandler>>,
}

impl OutputManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output handler. Handlers are invoked in the order they were added.
    pub fn add_handler(&mut self, handler: Arc<dyn OutputHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Deliver an event to every handler.
    ///
    /// Returns the number of handlers that failed. Failures are logged here
    /// and go no further.
    pub async fn dispatch(&self, event: &CertificateEvent) -> usize {
        let mut failures = 0;

        for handler in &self.handlers {
            if let Err(e) = handler.handle(event).await {
                failures += 1;
                tracing::warn!(
                    "Output handler '{}' failed for {}: {:#}",
                    handler.name(),
                    event.matched_domain,
                    e
                );
            }
        }

        failures
    }
}

impl std::fmt::Debug for OutputManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.handlers.iter().map(|h| h.name()).collect();
        f.debug_struct("OutputManager").field("handlers", &names).finish()
    }
}

/// Replace anything that is not safe in a file name
pub(crate) fn sanitize_file_component(domain: &str) -> String {
    domain
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
