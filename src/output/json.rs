// src/output/json.rs
//! JSON Lines (JSONL) output handler

use crate::output::OutputHandler;
use crate::types::CertificateEvent;
use anyhow::Context;
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

/// JSON Lines output handler
///
/// Outputs one JSON object per line (JSONL/NDJSON format)
pub struct JsonOutput {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonOutput {
    /// Create a new JsonOutput that writes to stdout
    pub fn new() -> Self {
        Self {
            writer: Mutex::new(Box::new(io::stdout())),
        }
    }

    /// Create a new JsonOutput that appends to a file
    pub fn append_to(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        Ok(Self::with_writer(Box::new(file)))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputHandler for JsonOutput {
    async fn handle(&self, event: &CertificateEvent) -> anyhow::Result<()> {
        let json = serde_json::to_string(event)?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("JSON writer lock poisoned"))?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        Ok(())
    }

    fn name(&self) -> &str {
        "json"
    }
}
