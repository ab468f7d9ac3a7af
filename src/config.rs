// src/config.rs

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::certstream::LiveConfig;
use crate::cli::OutputFormat;
use crate::ct_log::PollingConfig;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    #[default]
    Polling,
    Live,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default)]
    pub mode: SourceMode,
    #[serde(default)]
    pub all_domains: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    #[serde(default = "default_lookback")]
    pub lookback: u64,
    #[serde(default = "default_max_shards")]
    pub max_shards: usize,
    #[serde(default = "default_log_list_url")]
    pub log_list_url: String,
    #[serde(default)]
    pub custom_logs: Option<Vec<String>>, // Replaces log list discovery
    #[serde(default)]
    pub operators: Vec<String>,
    #[serde(default)]
    pub include_readonly: bool,
    #[serde(default)]
    pub include_pending: bool,
    #[serde(default = "default_true")]
    pub parse_precerts: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_poll_interval() -> u64 { 60 }
fn default_batch_size() -> u64 { 50 }
fn default_lookback() -> u64 { 100 }
fn default_max_shards() -> usize { 5 }
fn default_log_list_url() -> String {
    "https://loglist.certspotter.org/monitor.json".to_string()
}
fn default_true() -> bool { true }
fn default_request_timeout() -> u64 { 30 }

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            all_domains: false,
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
            lookback: default_lookback(),
            max_shards: default_max_shards(),
            log_list_url: default_log_list_url(),
            custom_logs: None,
            operators: Vec::new(),
            include_readonly: false,
            include_pending: false,
            parse_precerts: true,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl MonitorConfig {
    pub fn polling_config(&self) -> PollingConfig {
        PollingConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            batch_size: self.batch_size,
            lookback: self.lookback,
            parse_precerts: self.parse_precerts,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LiveStreamConfig {
    #[serde(default = "default_live_url")]
    pub url: String,
    #[serde(default = "default_live_name")]
    pub name: String,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

fn default_live_url() -> String { "wss://certstream.calidog.io".to_string() }
fn default_live_name() -> String { "certstream".to_string() }
fn default_reconnect_delay() -> u64 { 5 }

impl Default for LiveStreamConfig {
    fn default() -> Self {
        Self {
            url: default_live_url(),
            name: default_live_name(),
            reconnect_delay_secs: default_reconnect_delay(),
        }
    }
}

impl LiveStreamConfig {
    pub fn live_config(&self) -> LiveConfig {
        LiveConfig {
            name: self.name.clone(),
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatchlistConfig {
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default = "default_true")]
    pub include_subdomains: bool,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            include_subdomains: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Directory receiving one JSON file per match
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Append-only event log
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub live: LiveStreamConfig,
    #[serde(default)]
    pub watchlist: WatchlistConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    /// Reject settings that would stall or misdirect the monitor
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.monitor.batch_size == 0 {
            anyhow::bail!("monitor.batch_size must be greater than 0");
        }

        if self.monitor.poll_interval_secs == 0 {
            anyhow::bail!("monitor.poll_interval_secs must be greater than 0");
        }

        if self.monitor.max_shards == 0 {
            anyhow::bail!("monitor.max_shards must be greater than 0");
        }

        let live_url = url::Url::parse(&self.live.url)
            .with_context(|| format!("Invalid live stream URL: {}", self.live.url))?;
        if !matches!(live_url.scheme(), "ws" | "wss") {
            anyhow::bail!(
                "Live stream URL must use ws:// or wss://, got {}://",
                live_url.scheme()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_config_from_valid_toml() {
        let temp_file = write_config(
            r#"
[monitor]
mode = "live"
all_domains = true
poll_interval_secs = 30
batch_size = 20
custom_logs = ["https://ct.example.com/log"]

[live]
url = "ws://127.0.0.1:9000"
reconnect_delay_secs = 1

[watchlist]
domains = ["example.com", "example.org"]
include_subdomains = false

[output]
format = "json"
path = "/tmp/matches"

[logging]
level = "debug"
        "#,
        );

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.monitor.mode, SourceMode::Live);
        assert!(config.monitor.all_domains);
        assert_eq!(config.monitor.poll_interval_secs, 30);
        assert_eq!(config.monitor.batch_size, 20);
        assert_eq!(config.monitor.lookback, 100);
        assert_eq!(
            config.monitor.custom_logs,
            Some(vec!["https://ct.example.com/log".to_string()])
        );
        assert_eq!(config.live.url, "ws://127.0.0.1:9000");
        assert_eq!(config.live.name, "certstream");
        assert_eq!(config.watchlist.domains.len(), 2);
        assert!(!config.watchlist.include_subdomains);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.path, Some(PathBuf::from("/tmp/matches")));
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());

        let live = config.live.live_config();
        assert_eq!(live.reconnect_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_config_empty_uses_defaults() {
        let temp_file = write_config("");
        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.monitor.mode, SourceMode::Polling);
        assert_eq!(config.monitor.max_shards, 5);
        assert_eq!(
            config.monitor.log_list_url,
            "https://loglist.certspotter.org/monitor.json"
        );
        assert!(config.monitor.parse_precerts);
        assert!(config.watchlist.include_subdomains);
        assert_eq!(config.output.format, OutputFormat::Human);
        assert_eq!(config.logging.level, "info");

        let polling = config.monitor.polling_config();
        assert_eq!(polling.poll_interval, Duration::from_secs(60));
        assert_eq!(polling.batch_size, 50);
        assert_eq!(polling.lookback, 100);
    }

    #[test]
    fn test_config_invalid_toml() {
        let temp_file = write_config("invalid toml content {{{");
        assert!(Config::from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_config_unknown_mode() {
        let temp_file = write_config("[monitor]\nmode = \"batch\"\n");
        assert!(Config::from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_config_nonexistent_file() {
        let result = Config::from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = Config::default();
        config.monitor.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.monitor.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_live_url_scheme() {
        let mut config = Config::default();
        config.live.url = "https://certstream.example.com".to_string();
        assert!(config.validate().is_err());

        config.live.url = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
