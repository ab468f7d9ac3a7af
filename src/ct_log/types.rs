// src/ct_log/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response from CT log's get-sth endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTreeHead {
    pub tree_size: u64,
    pub timestamp: u64,
    #[serde(default)]
    pub sha256_root_hash: String,
    #[serde(default)]
    pub tree_head_signature: String,
}

/// Single entry from CT log's get-entries endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub leaf_input: String, // base64-encoded MerkleTreeLeaf
    #[serde(default)]
    pub extra_data: String, // base64-encoded chain (precert for type 1)
}

/// Response wrapper for get-entries endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct GetEntriesResponse {
    pub entries: Vec<LogEntry>,
}

/// A log shard chosen for polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardDescriptor {
    /// Display name (log description, or the URL when there is none)
    pub name: String,
    /// Base URL without trailing slash
    pub endpoint: String,
}

impl ShardDescriptor {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: normalize_endpoint(&endpoint.into()),
        }
    }
}

/// Log list endpoints are given with or without scheme and trailing slash
pub fn normalize_endpoint(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// CT log list V3 format (Google and certspotter lists share it)
#[derive(Debug, Serialize, Deserialize)]
pub struct LogListV3 {
    pub operators: Vec<Operator>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Operator {
    pub name: String,
    #[serde(default)]
    pub logs: Vec<LogInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogInfo {
    #[serde(default)]
    pub description: String,
    pub log_id: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub state: Option<StateWrapper>,
    pub temporal_interval: Option<TemporalInterval>,
}

/// State wrapper that can contain different state types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateWrapper {
    #[serde(default)]
    pub usable: Option<StateTimestamp>,
    #[serde(default)]
    pub readonly: Option<StateTimestamp>,
    #[serde(default)]
    pub retired: Option<StateTimestamp>,
    #[serde(default)]
    pub rejected: Option<StateTimestamp>,
    #[serde(default)]
    pub qualified: Option<StateTimestamp>,
    #[serde(default)]
    pub pending: Option<StateTimestamp>,
}

impl StateWrapper {
    /// Actively accepting new entries
    pub fn is_usable(&self) -> bool {
        self.usable.is_some() || self.qualified.is_some()
    }

    pub fn is_acceptable(&self, include_readonly: bool, include_pending: bool) -> bool {
        self.is_usable()
            || (include_readonly && self.readonly.is_some())
            || (include_pending && self.pending.is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTimestamp {
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalInterval {
    pub start_inclusive: Option<String>,
    pub end_exclusive: Option<String>,
}

impl TemporalInterval {
    /// Whether the log accepts certificates expiring at `now`.
    /// Unparseable bounds are treated as open.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let parse = |s: &Option<String>| {
            s.as_deref()
                .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
                .map(|t| t.with_timezone(&Utc))
        };

        let after_start = parse(&self.start_inclusive).is_none_or(|start| now >= start);
        let before_end = parse(&self.end_exclusive).is_none_or(|end| now < end);
        after_start && before_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("ct.googleapis.com/logs/argon2025h1/"),
            "https://ct.googleapis.com/logs/argon2025h1"
        );
        assert_eq!(normalize_endpoint("http://127.0.0.1:8080/"), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_temporal_interval() {
        let interval = TemporalInterval {
            start_inclusive: Some("2025-01-01T00:00:00Z".to_string()),
            end_exclusive: Some("2025-07-01T00:00:00Z".to_string()),
        };

        let inside = DateTime::parse_from_rfc3339("2025-03-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let after = DateTime::parse_from_rfc3339("2025-07-01T00:00:00Z").unwrap().with_timezone(&Utc);
        assert!(interval.contains(inside));
        assert!(!interval.contains(after));

        let open = TemporalInterval {
            start_inclusive: None,
            end_exclusive: None,
        };
        assert!(open.contains(after));
    }

    #[test]
    fn test_deserialize_log_list() {
        let json = r#"{
            "operators": [{
                "name": "Google",
                "email": ["ct@example.com"],
                "logs": [{
                    "description": "Google 'Argon2025h1' log",
                    "log_id": "abc",
                    "key": "xyz",
                    "url": "https://ct.googleapis.com/logs/us1/argon2025h1/",
                    "mmd": 86400,
                    "state": {"usable": {"timestamp": "2024-01-01T00:00:00Z"}},
                    "temporal_interval": {
                        "start_inclusive": "2025-01-01T00:00:00Z",
                        "end_exclusive": "2025-07-01T00:00:00Z"
                    }
                }]
            }]
        }"#;

        let list: LogListV3 = serde_json::from_str(json).unwrap();
        assert_eq!(list.operators.len(), 1);
        let log = &list.operators[0].logs[0];
        assert!(log.state.as_ref().unwrap().is_usable());
        assert!(log.temporal_interval.is_some());
    }

    #[test]
    fn test_state_acceptable() {
        let readonly = StateWrapper {
            readonly: Some(StateTimestamp {
                timestamp: "2024-01-01T00:00:00Z".to_string(),
            }),
            ..Default::default()
        };
        assert!(!readonly.is_acceptable(false, false));
        assert!(readonly.is_acceptable(true, false));
    }
}
