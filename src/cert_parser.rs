// src/cert_parser.rs
use crate::ct_log::types::LogEntry;
use crate::types::{CertificateDetails, Subject};
use anyhow::{Context, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::*;

const X509_ENTRY: u16 = 0;
const PRECERT_ENTRY: u16 = 1;

/// Certificate parser for CT log entries
pub struct CertificateParser;

impl CertificateParser {
    /// Parse a CT log entry (handles both x509_entry and precert_entry types).
    ///
    /// The `MerkleTreeLeaf` in `leaf_input` is laid out as
    /// version(1) | leaf_type(1) | timestamp(8) | entry_type(2) | ...
    /// For x509 entries a 3-byte length and the DER certificate follow.
    /// For precerts the full precertificate is read from `extra_data`.
    pub fn parse_log_entry(entry: &LogEntry, parse_precerts: bool) -> Result<CertificateDetails> {
        let leaf_bytes = base64::engine::general_purpose::STANDARD
            .decode(&entry.leaf_input)
            .context("Failed to decode base64 leaf_input")?;

        if leaf_bytes.len() < 12 {
            anyhow::bail!("Leaf input too short: {} bytes", leaf_bytes.len());
        }

        let entry_type = u16::from_be_bytes([leaf_bytes[10], leaf_bytes[11]]);

        match entry_type {
            X509_ENTRY => {
                let cert_der = Self::length_prefixed(&leaf_bytes[12..])
                    .context("x509_entry truncated")?;
                Self::parse_der(cert_der, false)
            }
            PRECERT_ENTRY => {
                if !parse_precerts {
                    anyhow::bail!("Precertificate parsing disabled");
                }

                let extra_bytes = base64::engine::general_purpose::STANDARD
                    .decode(&entry.extra_data)
                    .context("Failed to decode base64 extra_data")?;

                // extra_data: 3-byte length + precertificate + chain
                let precert_der =
                    Self::length_prefixed(&extra_bytes).context("extra_data truncated")?;
                Self::parse_der(precert_der, true)
            }
            other => anyhow::bail!("Unknown entry type: {}", other),
        }
    }

    /// Read a 24-bit big-endian length followed by that many bytes
    fn length_prefixed(bytes: &[u8]) -> Result<&[u8]> {
        if bytes.len() < 3 {
            anyhow::bail!("missing length prefix");
        }
        let len = ((bytes[0] as usize) << 16) | ((bytes[1] as usize) << 8) | (bytes[2] as usize);
        bytes
            .get(3..3 + len)
            .ok_or_else(|| anyhow::anyhow!("expected {} bytes, have {}", len, bytes.len() - 3))
    }

    /// Parse a DER certificate into the metadata the pipeline works with
    pub fn parse_der(der_bytes: &[u8], is_precert: bool) -> Result<CertificateDetails> {
        let fingerprint = hex::encode(Sha256::digest(der_bytes));

        let (_, cert) = X509Certificate::from_der(der_bytes)
            .map_err(|e| anyhow::anyhow!("Failed to parse certificate from DER: {:?}", e))?;

        let mut subject_alt_names = Vec::new();
        for ext in cert.extensions() {
            if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
                for general_name in &san.general_names {
                    if let GeneralName::DNSName(dns_name) = general_name {
                        subject_alt_names.push(dns_name.to_string());
                    }
                }
            }
        }

        let validity = cert.validity();

        Ok(CertificateDetails {
            subject: Self::extract_subject(cert.subject()),
            subject_alt_names,
            issuer: Self::extract_issuer(cert.issuer()),
            not_before: DateTime::<Utc>::from_timestamp(validity.not_before.timestamp(), 0),
            not_after: DateTime::<Utc>::from_timestamp(validity.not_after.timestamp(), 0),
            serial_number: cert.tbs_certificate.serial.to_string(),
            fingerprint,
            is_precert,
        })
    }

    fn extract_subject(name: &X509Name) -> Subject {
        Subject {
            common_name: join_values(name.iter_common_name()),
            country: join_values(name.iter_country()),
            organization: join_values(name.iter_organization()),
            organizational_unit: join_values(name.iter_organizational_unit()),
            locality: join_values(name.iter_locality()),
            province: join_values(name.iter_state_or_province()),
        }
    }

    /// Issuer CN, falling back to the full issuer DN
    fn extract_issuer(name: &X509Name) -> String {
        let cn = join_values(name.iter_common_name());
        if cn.is_empty() { name.to_string() } else { cn }
    }
}

fn join_values<'a, 'b: 'a>(attrs: impl Iterator<Item = &'a AttributeTypeAndValue<'b>>) -> String {
    attrs
        .filter_map(|attr| attr.as_str().ok())
        .collect::<Vec<_>>()
        .join(", ")
}
