// src/certstream/message.rs
//! Lenient decoding of certstream-style JSON messages

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::{CertificateDetails, Subject};

const CERTIFICATE_UPDATE: &str = "certificate_update";

/// Decoder for live feed messages.
///
/// The payload is untyped; every field is optional and a missing or
/// mistyped one falls back to empty rather than rejecting the message.
pub struct CertStreamMessage;

impl CertStreamMessage {
    /// Extract certificate details from a `certificate_update` message.
    ///
    /// Returns `None` for other message types or when `data.leaf_cert`
    /// is absent.
    pub fn from_value(message: &Value) -> Option<CertificateDetails> {
        if message.get("message_type")?.as_str()? != CERTIFICATE_UPDATE {
            return None;
        }

        let leaf = message.get("data")?.get("leaf_cert")?;
        if !leaf.is_object() {
            return None;
        }

        let subject = leaf
            .get("subject")
            .map(|s| Subject {
                common_name: string_at(s, "CN"),
                country: string_at(s, "C"),
                organization: string_at(s, "O"),
                organizational_unit: string_at(s, "OU"),
                locality: string_at(s, "L"),
                province: string_at(s, "ST"),
            })
            .unwrap_or_default();

        let mut subject_alt_names = leaf
            .get("extensions")
            .and_then(|ext| ext.get("subjectAltName"))
            .map(san_list)
            .unwrap_or_default();

        // Some feeds only carry the flattened domain list
        if subject_alt_names.is_empty() {
            subject_alt_names = leaf
                .get("all_domains")
                .map(san_list)
                .unwrap_or_default();
        }

        let issuer = leaf
            .get("issuer")
            .map(|issuer| {
                let cn = string_at(issuer, "CN");
                if cn.is_empty() {
                    string_at(issuer, "aggregated")
                } else {
                    cn
                }
            })
            .unwrap_or_default();

        Some(CertificateDetails {
            subject,
            subject_alt_names,
            issuer,
            not_before: leaf.get("not_before").and_then(timestamp),
            not_after: leaf.get("not_after").and_then(timestamp),
            serial_number: string_at(leaf, "serial_number"),
            fingerprint: string_at(leaf, "fingerprint"),
            is_precert: message
                .get("data")
                .and_then(|d| d.get("update_type"))
                .and_then(Value::as_str)
                .is_some_and(|t| t.eq_ignore_ascii_case("PrecertLogEntry")),
        })
    }
}

fn string_at(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// SANs as a JSON array of strings or the `"DNS:a, DNS:b"` string form
fn san_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(strip_dns_prefix)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(joined) => joined
            .split(',')
            .map(strip_dns_prefix)
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn strip_dns_prefix(name: &str) -> String {
    let name = name.trim();
    name.strip_prefix("DNS:").unwrap_or(name).trim().to_string()
}

/// Unix seconds (integer or float) or an RFC 3339 string
fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => DateTime::<Utc>::from_timestamp(n.as_f64()? as i64, 0),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}
