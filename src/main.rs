// src/main.rs
use anyhow::Context;
use clap::Parser;
use domain_watcher::certstream::WebSocketStreamClient;
use domain_watcher::cli::{Cli, OutputFormat};
use domain_watcher::config::{Config, SourceMode};
use domain_watcher::ct_log::{LogListDiscovery, StaticShards, UsableLogFilter};
use domain_watcher::monitor::{Monitor, Source};
use domain_watcher::output::directory::DirectoryOutput;
use domain_watcher::output::event_log::EventLogOutput;
use domain_watcher::output::human::HumanOutput;
use domain_watcher::output::json::JsonOutput;
use domain_watcher::stats::StatsCollector;
use domain_watcher::types::WatchEntry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    cli.validate()?;

    // Load config file, then apply CLI overrides
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    cli.apply_to(&mut config);

    // Initialize logging (stderr, so JSON on stdout stays clean)
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    config.validate()?;

    if config.watchlist.domains.is_empty() && !config.monitor.all_domains {
        anyhow::bail!(
            "No domains to watch. Pass domains as arguments or use --domains or --all-domains"
        );
    }

    tracing::info!("Starting domain-watcher...");

    let mut monitor = Monitor::new().with_all_domains(config.monitor.all_domains);
    for domain in &config.watchlist.domains {
        monitor
            .add_domain(domain, config.watchlist.include_subdomains)
            .await;
    }

    // Output handlers
    match config.output.format {
        OutputFormat::Json => monitor.add_handler(Arc::new(JsonOutput::new())),
        OutputFormat::Human => monitor.add_handler(Arc::new(HumanOutput::new())),
    }

    if let Some(dir) = &config.output.path {
        tracing::info!("Writing match files to {}", dir.display());
        monitor.add_handler(Arc::new(DirectoryOutput::new(dir)));
    }

    if let Some(path) = &config.output.log_file {
        let handler = EventLogOutput::open(path)
            .await
            .with_context(|| format!("Failed to open event log {}", path.display()))?;
        monitor.add_handler(Arc::new(handler));
    }

    let source = match config.monitor.mode {
        SourceMode::Live => {
            tracing::info!("Live mode: {}", config.live.url);
            Source::live(
                WebSocketStreamClient::new(&config.live.url),
                config.live.live_config(),
            )
        }
        SourceMode::Polling => {
            let polling = config.monitor.polling_config();
            match &config.monitor.custom_logs {
                Some(logs) if !logs.is_empty() => Source::polling(
                    StaticShards::new(logs.clone(), config.monitor.request_timeout()),
                    polling,
                ),
                _ => {
                    let filter = UsableLogFilter {
                        include_readonly: config.monitor.include_readonly,
                        include_pending: config.monitor.include_pending,
                        operators: config.monitor.operators.clone(),
                    };
                    let discovery = LogListDiscovery::new(
                        &config.monitor.log_list_url,
                        Box::new(filter),
                        config.monitor.max_shards,
                        config.monitor.request_timeout(),
                    )?;
                    Source::polling(discovery, polling)
                }
            }
        }
    };

    // Ctrl+C triggers a clean shutdown
    let shutdown = monitor.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, shutting down...");
            shutdown.cancel();
        }
    });

    if cli.stats {
        let stats = monitor.stats().clone();
        let shutdown = monitor.shutdown_token();
        let period = Duration::from_secs(cli.stats_interval);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(period) => tracing::info!("{}", stats.format_stats()),
                }
            }
        });
    }

    let result = monitor.run(source).await;

    monitor.stop();
    print_watchlist(&monitor.watched_domains().await, monitor.all_domains());

    if cli.stats {
        let snapshot = monitor.stats().snapshot();
        println!("\nFinal Statistics:");
        println!("  Total processed: {}", snapshot.total_processed);
        println!("  Skipped entries: {}", snapshot.skipped);
        println!("  Matches found: {}", snapshot.matches_found);
        println!("  Output failures: {}", snapshot.sink_failures);
        println!("  Rate: {:.1} certs/min", snapshot.certs_per_minute);
        println!("  Uptime: {}", StatsCollector::format_uptime(snapshot.uptime_secs));
    }

    result?;
    Ok(())
}

/// Print the watch list as a table on shutdown
fn print_watchlist(entries: &HashMap<String, WatchEntry>, all_domains: bool) {
    if entries.is_empty() {
        if all_domains {
            println!("\nAll-domains mode: no watch list");
        }
        return;
    }

    let mut rows: Vec<&WatchEntry> = entries.values().collect();
    rows.sort_by(|a, b| a.domain.cmp(&b.domain));

    let width = rows.iter().map(|e| e.domain.len()).max().unwrap_or(0).max(6);

    println!();
    println!(
        "{:<width$}  {:<10}  {:<19}  {:<19}  STATUS",
        "DOMAIN", "SUBDOMAINS", "CREATED", "LAST SEEN"
    );
    for entry in rows {
        let last_seen = entry
            .last_seen
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "Never".to_string());
        println!(
            "{:<width$}  {:<10}  {:<19}  {:<19}  {}",
            entry.domain,
            if entry.include_subdomains { "yes" } else { "no" },
            entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            last_seen,
            if entry.active { "active" } else { "inactive" },
        );
    }
}
