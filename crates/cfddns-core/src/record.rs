//! Address record model
//!
//! - [`AddressRecord`]: a detected address, fresh every cycle
//! - [`DesiredRecord`]: the target state for one (zone, subdomain, type)
//! - [`RemoteRecord`]: a record as the provider reports it

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// TTL written on every created or updated record (seconds)
pub const DEFAULT_TTL: u32 = 300;

/// Address record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    #[serde(rename = "A")]
    A,
    /// IPv6 address record
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Human-readable address family, used in operator messages
    pub fn family(&self) -> &'static str {
        match self {
            RecordType::A => "IPv4",
            RecordType::Aaaa => "IPv6",
        }
    }

    /// Record type carrying the given address
    pub fn for_ip(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected host address together with the record type that carries it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRecord {
    /// `A` for IPv4, `AAAA` for IPv6
    pub record_type: RecordType,
    /// The detected address
    pub ip: IpAddr,
}

impl AddressRecord {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            record_type: RecordType::for_ip(&ip),
            ip,
        }
    }

    /// Record content as sent to the provider
    pub fn content(&self) -> String {
        self.ip.to_string()
    }
}

/// Target state for one (zone, subdomain, type) tuple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRecord {
    /// Subdomain label(s); empty for the bare domain
    pub subdomain: String,
    pub record_type: RecordType,
    pub content: String,
    pub proxied: bool,
    pub ttl: u32,
}

impl DesiredRecord {
    pub fn new(address: &AddressRecord, subdomain: impl Into<String>, proxied: bool) -> Self {
        Self {
            subdomain: subdomain.into(),
            record_type: address.record_type,
            content: address.content(),
            proxied,
            ttl: DEFAULT_TTL,
        }
    }

    /// Fully-qualified name of this record under `base_domain`
    pub fn fqdn(&self, base_domain: &str) -> String {
        if self.subdomain.is_empty() {
            base_domain.to_string()
        } else {
            format!("{}.{}", self.subdomain, base_domain)
        }
    }

    /// Request body for a create or update call
    pub fn body(&self, base_domain: &str) -> RecordBody {
        RecordBody {
            record_type: self.record_type,
            name: self.fqdn(base_domain),
            content: self.content.clone(),
            proxied: self.proxied,
            ttl: self.ttl,
        }
    }
}

/// JSON body of a create/update request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordBody {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub name: String,
    pub content: String,
    pub proxied: bool,
    pub ttl: u32,
}

/// A DNS record as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    /// Fully-qualified record name
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default)]
    pub ttl: u32,
}

impl RemoteRecord {
    /// Whether the record content equals `desired` content
    pub fn content_matches(&self, desired: &str) -> bool {
        content_matches(&self.content, desired)
    }

    /// Content or proxied flag differs from the desired state. TTL is ignored.
    pub fn is_modified(&self, desired: &DesiredRecord) -> bool {
        !self.content_matches(&desired.content) || self.proxied != desired.proxied
    }
}

/// Compare record contents, as addresses when both sides parse as one
pub fn content_matches(remote: &str, desired: &str) -> bool {
    match (remote.parse::<IpAddr>(), desired.parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => remote == desired,
    }
}
