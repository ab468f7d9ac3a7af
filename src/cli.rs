// src/cli.rs
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, SourceMode};

/// domain-watcher: Certificate Transparency domain monitor
///
/// Reports newly logged TLS certificates whose names match your watch list,
/// either by polling CT logs or by following a certstream feed.
#[derive(Parser, Debug, Clone)]
#[command(name = "domain-watcher")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // ===== Watch List =====
    /// Domains to watch
    #[arg(value_name = "DOMAIN")]
    pub domains: Vec<String>,

    /// Comma-separated domains to watch
    #[arg(
        long = "domains",
        env = "DOMAIN_WATCHER_MONITOR_DOMAINS",
        value_delimiter = ','
    )]
    pub domain_list: Vec<String>,

    /// Match subdomains of watched domains (true/false)
    #[arg(long = "subdomains", value_name = "BOOL")]
    pub subdomains: Option<bool>,

    /// Report every certificate regardless of the watch list
    #[arg(long = "all-domains")]
    pub all_domains: bool,

    // ===== Source =====
    /// Path to TOML config file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Follow the live certstream feed instead of polling CT logs
    #[arg(long = "live")]
    pub live: bool,

    /// Poll interval such as "30s" or "2m"
    #[arg(long = "poll-interval", value_parser = humantime::parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Override the live stream WebSocket URL
    #[arg(long = "certstream-url", env = "DOMAIN_WATCHER_CERTSTREAM_URL")]
    pub certstream_url: Option<String>,

    // ===== Output =====
    /// Stdout output format
    #[arg(long = "output", value_enum)]
    pub output: Option<OutputFormat>,

    /// Write one JSON file per match into this directory
    #[arg(long = "output-path")]
    pub output_path: Option<PathBuf>,

    /// Append matches to this event log
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    // ===== Display & Statistics =====
    /// Log processing statistics periodically
    #[arg(long = "stats")]
    pub stats: bool,

    /// Stats update interval in seconds
    #[arg(long = "stats-interval", default_value = "60")]
    pub stats_interval: u64,

    // ===== Logging =====
    /// Verbose logging (set log level to debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet logging (set log level to warn)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Cli {
    /// Validate flag combinations and return errors for invalid usage
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stats && self.stats_interval == 0 {
            anyhow::bail!("--stats-interval must be greater than 0");
        }

        if self.verbose && self.quiet {
            anyhow::bail!("Cannot specify both --verbose and --quiet");
        }

        if self.poll_interval.is_some_and(|d| d.as_secs() == 0) {
            anyhow::bail!("--poll-interval must be at least one second");
        }

        Ok(())
    }

    /// Log level forced by flags, if any
    pub fn log_level(&self) -> Option<&str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("warn")
        } else {
            None
        }
    }

    /// Positional and `--domains` values, trimmed, empties dropped
    pub fn watch_domains(&self) -> Vec<String> {
        self.domains
            .iter()
            .chain(self.domain_list.iter())
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Overlay command-line values onto a loaded config
    pub fn apply_to(&self, config: &mut Config) {
        config.watchlist.domains.extend(self.watch_domains());

        if let Some(subdomains) = self.subdomains {
            config.watchlist.include_subdomains = subdomains;
        }
        if self.all_domains {
            config.monitor.all_domains = true;
        }
        if self.live {
            config.monitor.mode = SourceMode::Live;
        }
        if let Some(interval) = self.poll_interval {
            config.monitor.poll_interval_secs = interval.as_secs();
        }
        if let Some(url) = &self.certstream_url {
            config.live.url = url.clone();
        }
        if let Some(format) = self.output {
            config.output.format = format;
        }
        if let Some(path) = &self.output_path {
            config.output.path = Some(path.clone());
        }
        if let Some(path) = &self.log_file {
            config.output.log_file = Some(path.clone());
        }
        if let Some(level) = self.log_level() {
            config.logging.level = level.to_string();
        }
    }
}

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored text output (default)
    #[default]
    Human,
    /// JSON Lines format (one JSON object per line)
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_domains() {
        let cli = Cli::parse_from(["domain-watcher", "example.com", " example.org "]);
        assert_eq!(cli.watch_domains(), vec!["example.com", "example.org"]);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_domain_list_flag() {
        let cli = Cli::parse_from(["domain-watcher", "a.com", "--domains", "b.com,,c.com"]);
        assert_eq!(cli.watch_domains(), vec!["a.com", "b.com", "c.com"]);
    }

    #[test]
    fn test_subdomains_takes_value() {
        let cli = Cli::parse_from(["domain-watcher", "--subdomains", "false"]);
        assert_eq!(cli.subdomains, Some(false));

        let cli = Cli::parse_from(["domain-watcher"]);
        assert_eq!(cli.subdomains, None);
    }

    #[test]
    fn test_poll_interval_humantime() {
        let cli = Cli::parse_from(["domain-watcher", "--poll-interval", "2m"]);
        assert_eq!(cli.poll_interval, Some(Duration::from_secs(120)));

        assert!(Cli::try_parse_from(["domain-watcher", "--poll-interval", "soon"]).is_err());
    }

    #[test]
    fn test_output_format() {
        let cli = Cli::parse_from(["domain-watcher", "--output", "json"]);
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert!(Cli::try_parse_from(["domain-watcher", "--output", "csv"]).is_err());
    }

    #[test]
    fn test_verbose_and_quiet_invalid() {
        let cli = Cli::parse_from(["domain-watcher", "--verbose", "--quiet"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_zero_stats_interval_invalid() {
        let cli = Cli::parse_from(["domain-watcher", "--stats", "--stats-interval", "0"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(Cli::parse_from(["domain-watcher", "-v"]).log_level(), Some("debug"));
        assert_eq!(Cli::parse_from(["domain-watcher", "-q"]).log_level(), Some("warn"));
        assert_eq!(Cli::parse_from(["domain-watcher"]).log_level(), None);
    }

    #[test]
    fn test_apply_overrides_config() {
        let cli = Cli::parse_from([
            "domain-watcher",
            "example.com",
            "--live",
            "--all-domains",
            "--subdomains",
            "false",
            "--poll-interval",
            "30s",
            "--certstream-url",
            "ws://127.0.0.1:8080",
            "--output-path",
            "/tmp/out",
            "-v",
        ]);

        let mut config = Config::default();
        config.watchlist.domains.push("from-file.com".to_string());
        cli.apply_to(&mut config);

        assert_eq!(config.watchlist.domains, vec!["from-file.com", "example.com"]);
        assert!(!config.watchlist.include_subdomains);
        assert!(config.monitor.all_domains);
        assert_eq!(config.monitor.mode, SourceMode::Live);
        assert_eq!(config.monitor.poll_interval_secs, 30);
        assert_eq!(config.live.url, "ws://127.0.0.1:8080");
        assert_eq!(config.output.path, Some(PathBuf::from("/tmp/out")));
        assert_eq!(config.logging.level, "debug");
    }
}
