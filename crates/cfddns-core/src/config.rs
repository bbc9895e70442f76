//! Configuration types for the DDNS synchronizer
//!
//! The on-disk format is the `config.json` document:
//!
//! ```json
//! {
//!   "cloudflare": [{
//!     "authentication": { "api_token": "..." },
//!     "zone_id": "023e105f4ecef8ad9ca31a8372d0c353",
//!     "subdomains": ["", "home"],
//!     "proxied": false
//!   }],
//!   "a": true,
//!   "aaaa": true,
//!   "purgeUnknownRecords": false
//! }
//! ```

use crate::record::RecordType;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::Path;

/// Token value shipped in the sample configuration; treated as "not set"
pub const PLACEHOLDER_API_TOKEN: &str = "api_token_here";

/// Main configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CfddnsConfig {
    /// Managed zones
    #[serde(rename = "cloudflare", default)]
    pub zones: Vec<ZoneConfig>,

    /// Maintain `A` records
    #[serde(default = "default_enabled")]
    pub a: bool,

    /// Maintain `AAAA` records
    #[serde(default = "default_enabled")]
    pub aaaa: bool,

    /// Delete duplicate records, and every record of a family that is
    /// enabled but currently undetected
    #[serde(rename = "purgeUnknownRecords", default)]
    pub purge_unknown_records: bool,
}

impl CfddnsConfig {
    /// Parse a configuration document and validate it
    pub fn from_json_str(json: &str) -> Result<Self, crate::Error> {
        let config: CfddnsConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zones.is_empty() {
            return Err(crate::Error::config("No Cloudflare zones configured"));
        }

        if !self.a && !self.aaaa {
            return Err(crate::Error::config(
                "Both IPv4 (a) and IPv6 (aaaa) are disabled, nothing to update",
            ));
        }

        for zone in &self.zones {
            zone.validate()?;
        }

        Ok(())
    }

    /// Whether records of `record_type` are maintained
    pub fn is_enabled(&self, record_type: RecordType) -> bool {
        match record_type {
            RecordType::A => self.a,
            RecordType::Aaaa => self.aaaa,
        }
    }
}

/// A managed zone
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneConfig {
    /// Provider zone identifier
    pub zone_id: String,

    /// Subdomains to maintain; `""` is the bare domain.
    /// Trimmed and lower-cased on load.
    #[serde(default, deserialize_with = "normalized_subdomains")]
    pub subdomains: Vec<String>,

    /// Whether records are proxied by the provider
    #[serde(default)]
    pub proxied: bool,

    /// API credentials for this zone
    pub authentication: Authentication,
}

impl ZoneConfig {
    pub fn new(
        zone_id: impl Into<String>,
        subdomains: &[&str],
        proxied: bool,
        authentication: Authentication,
    ) -> Self {
        Self {
            zone_id: zone_id.into(),
            subdomains: subdomains.iter().map(|s| normalize_subdomain(s)).collect(),
            proxied,
            authentication,
        }
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.zone_id.trim().is_empty() {
            return Err(crate::Error::config("zone_id cannot be empty"));
        }
        self.authentication.credentials().map_err(|_| {
            crate::Error::config(format!(
                "Zone {} has neither an api_token nor a complete api_key",
                self.zone_id
            ))
        })?;
        Ok(())
    }

    /// Credentials to send with requests for this zone
    pub fn credentials(&self) -> Result<Credentials, crate::Error> {
        self.authentication.credentials()
    }
}

/// Authentication block of a zone
#[derive(Clone, Default, Deserialize)]
pub struct Authentication {
    /// Scoped API token
    #[serde(default)]
    pub api_token: Option<String>,

    /// Legacy global API key
    #[serde(default)]
    pub api_key: Option<ApiKey>,
}

impl Authentication {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            api_token: Some(token.into()),
            api_key: None,
        }
    }

    pub fn api_key(account_email: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_token: None,
            api_key: Some(ApiKey {
                account_email: account_email.into(),
                api_key: api_key.into(),
            }),
        }
    }

    /// Pick the credentials to use.
    ///
    /// A token wins unless it is empty or the sample placeholder; otherwise
    /// the email + key pair is used.
    pub fn credentials(&self) -> Result<Credentials, crate::Error> {
        if let Some(token) = self.api_token.as_deref().map(str::trim)
            && !token.is_empty()
            && token != PLACEHOLDER_API_TOKEN
        {
            return Ok(Credentials::Token(token.to_string()));
        }

        match &self.api_key {
            Some(key) if !key.account_email.is_empty() && !key.api_key.is_empty() => {
                Ok(Credentials::ApiKey {
                    email: key.account_email.clone(),
                    key: key.api_key.clone(),
                })
            }
            _ => Err(crate::Error::config("No usable credentials")),
        }
    }
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .field("api_key", &self.api_key)
            .finish()
    }
}

/// Email + global API key pair
#[derive(Clone, Deserialize)]
pub struct ApiKey {
    pub account_email: String,
    pub api_key: String,
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("account_email", &self.account_email)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

/// Resolved credentials for one request
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <token>`
    Token(String),
    /// `X-Auth-Email` / `X-Auth-Key`
    ApiKey { email: String, key: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(<REDACTED>)"),
            Credentials::ApiKey { email, .. } => f
                .debug_struct("ApiKey")
                .field("email", email)
                .field("key", &"<REDACTED>")
                .finish(),
        }
    }
}

/// Immutable per-run settings handed to the scheduler and engine
#[derive(Debug, Clone)]
pub struct RunContext {
    pub ipv4_enabled: bool,
    pub ipv6_enabled: bool,
    pub purge_unknown_records: bool,
    pub zones: Vec<ZoneConfig>,
}

impl RunContext {
    pub fn from_config(config: &CfddnsConfig) -> Self {
        Self {
            ipv4_enabled: config.is_enabled(RecordType::A),
            ipv6_enabled: config.is_enabled(RecordType::Aaaa),
            purge_unknown_records: config.purge_unknown_records,
            zones: config.zones.clone(),
        }
    }

    pub fn is_enabled(&self, record_type: RecordType) -> bool {
        match record_type {
            RecordType::A => self.ipv4_enabled,
            RecordType::Aaaa => self.ipv6_enabled,
        }
    }

    /// Enabled record types, `A` first
    pub fn enabled_types(&self) -> Vec<RecordType> {
        [RecordType::A, RecordType::Aaaa]
            .into_iter()
            .filter(|t| self.is_enabled(*t))
            .collect()
    }
}

fn default_enabled() -> bool {
    true
}

fn normalize_subdomain(subdomain: &str) -> String {
    subdomain.trim().to_lowercase()
}

fn normalized_subdomains<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw.iter().map(|s| normalize_subdomain(s)).collect())
}
