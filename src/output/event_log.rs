// src/output/event_log.rs
//! Append-only event log: `<RFC3339 timestamp> <json>` per line

use crate::output::OutputHandler;
use crate::types::CertificateEvent;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub struct EventLogOutput {
    file: Mutex<File>,
}

impl EventLogOutput {
    /// Open (or create) the log file in append mode, creating parent directories
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create log directory")?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .context("Failed to open log file")?;

        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

#[async_trait]
impl OutputHandler for EventLogOutput {
    async fn handle(&self, event: &CertificateEvent) -> anyhow::Result<()> {
        let json = serde_json::to_string(event)?;
        let line = format!(
            "{} {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            json
        );

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .context("Failed to write to log file")?;
        file.sync_data().await.context("Failed to sync log file")?;
        Ok(())
    }

    fn name(&self) -> &str {
        "event-log"
    }
}
