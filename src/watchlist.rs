// src/watchlist.rs
use crate::types::WatchEntry;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Lower-case, trimmed form used for every registry key and comparison
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().to_lowercase()
}

/// Check whether a certificate domain is covered by a watched domain.
///
/// - exact match always counts
/// - "sub.example.com" matches "example.com" only with `include_subdomains`
/// - "*.example.com" is treated as "example.com" (one level of wildcard only)
pub fn domain_matches(cert_domain: &str, watched_domain: &str, include_subdomains: bool) -> bool {
    let cert_domain = normalize_domain(cert_domain);
    let watched_domain = normalize_domain(watched_domain);

    if matches_base(&cert_domain, &watched_domain, include_subdomains) {
        return true;
    }

    match cert_domain.strip_prefix("*.") {
        Some(base) => matches_base(base, &watched_domain, include_subdomains),
        None => false,
    }
}

fn matches_base(host: &str, watched: &str, include_subdomains: bool) -> bool {
    if host == watched {
        return true;
    }

    // Explicit separator so "notexample.com" never matches "example.com"
    include_subdomains
        && host.len() > watched.len()
        && host.ends_with(watched)
        && host.as_bytes()[host.len() - watched.len() - 1] == b'.'
}

/// In-memory watch list shared by every source worker.
///
/// All access goes through one reader/writer lock; callers only ever see
/// copies of the stored entries.
#[derive(Debug, Default)]
pub struct Watchlist {
    entries: RwLock<HashMap<String, WatchEntry>>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a watched domain. Re-adding keeps `last_seen`.
    pub async fn add(&self, domain: &str, include_subdomains: bool) {
        let key = normalize_domain(domain);
        if key.is_empty() {
            debug!("Ignoring empty watch domain");
            return;
        }

        let mut entries = self.entries.write().await;
        let mut entry = WatchEntry::new(key.clone(), include_subdomains);
        if let Some(previous) = entries.get(&key) {
            entry.last_seen = previous.last_seen;
        }
        entries.insert(key.clone(), entry);

        info!(
            "Added domain to watch list: {} (include subdomains: {})",
            key, include_subdomains
        );
    }

    pub async fn remove(&self, domain: &str) {
        let key = normalize_domain(domain);
        let mut entries = self.entries.write().await;
        if entries.remove(&key).is_some() {
            info!("Removed domain from watch list: {}", key);
        }
    }

    /// Independent copy of every entry, keyed by domain
    pub async fn snapshot(&self) -> HashMap<String, WatchEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Find the first watched domain covering any of the candidates.
    ///
    /// Candidates are tried in order; for each one the watched domains are
    /// scanned in map order. Only the first hit is returned.
    pub async fn find_match(&self, candidates: &[String]) -> Option<(String, WatchEntry)> {
        let entries = self.entries.read().await;
        candidates.iter().find_map(|candidate| {
            entries
                .iter()
                .find(|(watched, entry)| {
                    entry.active && domain_matches(candidate, watched, entry.include_subdomains)
                })
                .map(|(watched, entry)| (watched.clone(), entry.clone()))
        })
    }

    /// Stamp `last_seen` for a watched domain. Never moves the timestamp backwards.
    ///
    /// Returns the updated entry, or `None` if the domain was removed meanwhile.
    pub async fn touch(&self, domain: &str) -> Option<WatchEntry> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(domain)?;
        if entry.last_seen.is_none_or(|seen| seen < now) {
            entry.last_seen = Some(now);
        }
        Some(entry.clone())
    }

    /// `find_match` followed by `touch` on the winning entry
    pub async fn record_match(&self, candidates: &[String]) -> Option<(String, WatchEntry)> {
        let (domain, entry) = self.find_match(candidates).await?;
        let updated = self.touch(&domain).await.unwrap_or(entry);
        Some((domain, updated))
    }
}
