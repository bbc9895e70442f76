// # DNS Provider Trait
//
// Defines the interface the reconciliation engine uses to read and write
// address records at the provider.
//
// ## Implementations
//
// - Cloudflare API v4: `cfddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::DnsProvider;
//
// let base_domain = provider.zone_name(&zone).await?;
// let records = provider.list_records(&zone, RecordType::A).await?;
// ```

use async_trait::async_trait;

use crate::config::ZoneConfig;
use crate::record::{RecordBody, RecordType, RemoteRecord};

/// Trait for DNS provider implementations
///
/// Every method issues exactly one API request and returns its parsed result.
///
/// # Failure model
///
/// Each call either succeeds or returns an [`Error`](crate::Error) that
/// distinguishes a missing resource (`Error::NotFound`) from a transport
/// failure (`Error::Http` / `Error::Api`). Implementations log the failed
/// request themselves and never retry: the next scheduler cycle is the retry.
///
/// # Forbidden
///
/// - Spawning tasks or sleeping
/// - Caching records between calls
/// - Deciding whether a record needs to change (owned by the engine)
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Resolve the zone's base domain name (`GET zones/{id}`)
    async fn zone_name(&self, zone: &ZoneConfig) -> Result<String, crate::Error>;

    /// List the zone's records of one type, in provider order
    /// (`GET zones/{id}/dns_records?per_page=100&type=T`)
    async fn list_records(
        &self,
        zone: &ZoneConfig,
        record_type: RecordType,
    ) -> Result<Vec<RemoteRecord>, crate::Error>;

    /// Create a record (`POST zones/{id}/dns_records`)
    async fn create_record(
        &self,
        zone: &ZoneConfig,
        record: &RecordBody,
    ) -> Result<RemoteRecord, crate::Error>;

    /// Overwrite a record in place (`PUT zones/{id}/dns_records/{record_id}`)
    async fn update_record(
        &self,
        zone: &ZoneConfig,
        record_id: &str,
        record: &RecordBody,
    ) -> Result<RemoteRecord, crate::Error>;

    /// Delete a record (`DELETE zones/{id}/dns_records/{record_id}`)
    async fn delete_record(&self, zone: &ZoneConfig, record_id: &str) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
