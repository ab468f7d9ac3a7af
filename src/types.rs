// src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A domain on the watch list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub domain: String,
    pub include_subdomains: bool,
    pub created_at: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
    pub active: bool,
}

impl WatchEntry {
    pub fn new(domain: String, include_subdomains: bool) -> Self {
        Self {
            domain,
            include_subdomains,
            created_at: Utc::now(),
            last_seen: None,
            active: true,
        }
    }
}

/// Distinguished-name fields of a certificate subject
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub common_name: String,
    pub country: String,
    pub organization: String,
    pub organizational_unit: String,
    pub locality: String,
    pub province: String,
}

/// Certificate metadata as seen by the matching pipeline.
///
/// Both the polling path (parsed from DER) and the live path (decoded from
/// stream JSON) produce this type, so everything downstream is source-agnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateDetails {
    pub subject: Subject,
    pub subject_alt_names: Vec<String>,
    pub issuer: String,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub serial_number: String,
    pub fingerprint: String,
    pub is_precert: bool,
}

impl CertificateDetails {
    /// Subject CN followed by every SAN, in certificate order. Empty names are dropped.
    pub fn candidate_domains(&self) -> Vec<String> {
        std::iter::once(&self.subject.common_name)
            .chain(self.subject_alt_names.iter())
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A matched certificate, delivered to every output handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateEvent {
    /// Watched domain that matched (or the first certificate domain in all-domains mode)
    pub matched_domain: String,

    /// Every domain found in the certificate, CN first
    pub all_domains: Vec<String>,

    pub subject: Subject,

    pub issuer: String,

    pub not_before: Option<DateTime<Utc>>,

    pub not_after: Option<DateTime<Utc>>,

    pub serial_number: String,

    /// Lower-case hex SHA-256 of the DER (stream-provided value in live mode)
    pub fingerprint: String,

    pub is_precert: bool,

    /// Log shard name or stream name
    pub source: String,

    /// Absolute index in the log shard, 0 when unknown
    pub index: u64,

    pub observed_at: DateTime<Utc>,
}

impl CertificateEvent {
    pub fn new(
        matched_domain: String,
        all_domains: Vec<String>,
        cert: &CertificateDetails,
        source: &str,
        index: u64,
    ) -> Self {
        Self {
            matched_domain,
            all_domains,
            subject: cert.subject.clone(),
            issuer: cert.issuer.clone(),
            not_before: cert.not_before,
            not_after: cert.not_after,
            serial_number: cert.serial_number.clone(),
            fingerprint: cert.fingerprint.clone(),
            is_precert: cert.is_precert,
            source: source.to_string(),
            index,
            observed_at: Utc::now(),
        }
    }
}

impl fmt::Display for CertificateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[+] Match: {} ({}", self.matched_domain, self.source)?;
        if self.index > 0 {
            write!(f, " #{}", self.index)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> CertificateDetails {
        CertificateDetails {
            subject: Subject {
                common_name: "example.com".to_string(),
                ..Default::default()
            },
            subject_alt_names: vec![
                "example.com".to_string(),
                " ".to_string(),
                "www.example.com".to_string(),
            ],
            issuer: "Test CA".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_candidate_domains_cn_first() {
        let domains = details().candidate_domains();
        assert_eq!(domains, vec!["example.com", "example.com", "www.example.com"]);
    }

    #[test]
    fn test_candidate_domains_without_cn() {
        let mut cert = details();
        cert.subject.common_name.clear();
        assert_eq!(cert.candidate_domains(), vec!["example.com", "www.example.com"]);
    }

    #[test]
    fn test_event_serializes_fields() {
        let cert = details();
        let event = CertificateEvent::new(
            "example.com".to_string(),
            cert.candidate_domains(),
            &cert,
            "Test Log",
            42,
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["matched_domain"], "example.com");
        assert_eq!(json["source"], "Test Log");
        assert_eq!(json["index"], 42);
        assert_eq!(json["subject"]["common_name"], "example.com");
        assert_eq!(json["issuer"], "Test CA");
    }

    #[test]
    fn test_display() {
        let cert = details();
        let event = CertificateEvent::new("example.com".to_string(), vec![], &cert, "certstream", 0);
        assert_eq!(event.to_string(), "[+] Match: example.com (certstream)");
    }

    #[test]
    fn test_new_watch_entry_is_active() {
        let entry = WatchEntry::new("example.com".to_string(), true);
        assert!(entry.active);
        assert!(entry.last_seen.is_none());
    }
}
