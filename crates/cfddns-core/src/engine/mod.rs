//! Record reconciliation engine
//!
//! The [`ReconciliationEngine`] brings the provider's address records for one
//! zone in line with a detected address:
//!
//! ```text
//!             ┌────────────────┐   zone_name, list_records   ┌─────────────┐
//!  address ──▶│ Reconciliation │────────────────────────────▶│ DnsProvider │
//!             │     Engine     │   create / update / delete  │             │
//!             └────────────────┘────────────────────────────▶└─────────────┘
//! ```
//!
//! ## Per-record flow
//!
//! 1. Resolve the zone's base domain (failure aborts the zone)
//! 2. Build the fqdn from subdomain and base domain
//! 3. List the zone's records of the desired type
//! 4. Pick the identifier among same-name records, collect duplicates
//! 5. Create, update, or leave the identifier alone
//! 6. With purge enabled, delete every duplicate
//!
//! Every create/update/delete is a single provider call whose failure is
//! logged and skipped; sibling operations still run.

use crate::config::ZoneConfig;
use crate::error::{Error, Result};
use crate::record::{AddressRecord, DesiredRecord, RecordType, RemoteRecord};
use crate::traits::DnsProvider;
use tracing::{debug, error, info, warn};

/// What the engine decided for one desired record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordAction {
    /// The identifier record already matches
    Unchanged {
        record_id: String,
    },
    /// No record with the fqdn existed; one was created
    Create,
    /// The identifier record was overwritten in place
    Update {
        record_id: String,
    },
}

/// Result of reconciling one desired record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationOutcome {
    pub fqdn: String,
    pub record_type: RecordType,
    pub action: RecordAction,
    /// `false` when the create/update call failed at the provider
    pub applied: bool,
    /// Same-name records that lost the identifier selection, in scan order
    pub duplicate_ids: Vec<String>,
    /// Duplicates actually deleted (empty unless purging)
    pub deleted_ids: Vec<String>,
}

impl ReconciliationOutcome {
    /// No create or update call was needed
    pub fn is_noop(&self) -> bool {
        matches!(self.action, RecordAction::Unchanged { .. })
    }
}

/// Identifier selection over a record listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPlan {
    /// Record to keep and, if modified, update
    pub identifier: Option<String>,
    /// Whether the identifier's content or proxied flag differs
    pub modified: bool,
    pub duplicate_ids: Vec<String>,
}

impl RecordPlan {
    /// Scan `records` in listing order for entries named `fqdn`.
    ///
    /// The first match becomes the identifier. A later match whose content
    /// equals the desired content takes the identifier over and the previous
    /// identifier becomes a duplicate; a later match with other content is a
    /// duplicate outright. `modified` is judged against the final identifier.
    pub fn scan(records: &[RemoteRecord], fqdn: &str, desired: &DesiredRecord) -> Self {
        let mut identifier: Option<&RemoteRecord> = None;
        let mut duplicate_ids = Vec::new();

        for record in records.iter().filter(|r| r.name.eq_ignore_ascii_case(fqdn)) {
            match identifier {
                None => identifier = Some(record),
                Some(current) if record.content_matches(&desired.content) => {
                    duplicate_ids.push(current.id.clone());
                    identifier = Some(record);
                }
                Some(_) => duplicate_ids.push(record.id.clone()),
            }
        }

        Self {
            identifier: identifier.map(|r| r.id.clone()),
            modified: identifier.is_some_and(|r| r.is_modified(desired)),
            duplicate_ids,
        }
    }
}

/// Reconciliation engine
///
/// Stateless between calls: every decision is made from a fresh listing.
pub struct ReconciliationEngine {
    provider: Box<dyn DnsProvider>,
}

impl ReconciliationEngine {
    pub fn new(provider: Box<dyn DnsProvider>) -> Self {
        Self { provider }
    }

    /// Reconcile a single desired record in `zone`
    ///
    /// # Returns
    ///
    /// - `Ok(ReconciliationOutcome)`: the decision taken (individual calls may
    ///   still have failed, see [`ReconciliationOutcome::applied`])
    /// - `Err(Error)`: the base domain or the record listing could not be
    ///   fetched; nothing was changed
    pub async fn reconcile(
        &self,
        zone: &ZoneConfig,
        desired: &DesiredRecord,
        purge: bool,
    ) -> Result<ReconciliationOutcome> {
        let base_domain = self.resolve_base_domain(zone).await?;
        self.reconcile_with_base(zone, &base_domain, desired, purge).await
    }

    /// Reconcile every subdomain of `zone` against `address`
    ///
    /// The base domain is resolved once; its failure aborts the whole zone.
    /// A record whose listing fails is skipped and the next subdomain is
    /// still processed.
    pub async fn reconcile_zone(
        &self,
        zone: &ZoneConfig,
        address: &AddressRecord,
        purge: bool,
    ) -> Result<Vec<ReconciliationOutcome>> {
        let base_domain = self.resolve_base_domain(zone).await?;

        let mut outcomes = Vec::with_capacity(zone.subdomains.len());
        for subdomain in &zone.subdomains {
            let desired = DesiredRecord::new(address, subdomain.as_str(), zone.proxied);
            match self
                .reconcile_with_base(zone, &base_domain, &desired, purge)
                .await
            {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!(
                        "Skipping {} record for {}: {}",
                        desired.record_type,
                        desired.fqdn(&base_domain),
                        e
                    );
                }
            }
        }

        Ok(outcomes)
    }

    /// Delete every record of `record_type` in every zone
    ///
    /// Used when a family is enabled but no address was detected. Not scoped
    /// to managed subdomains. A zone whose listing fails is skipped.
    ///
    /// # Returns
    ///
    /// Ids of the records actually deleted
    pub async fn purge_all(&self, zones: &[ZoneConfig], record_type: RecordType) -> Vec<String> {
        let mut deleted = Vec::new();

        for zone in zones {
            let records = match self.provider.list_records(zone, record_type).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(
                        "Cannot list {} records of zone {} for purge: {}",
                        record_type, zone.zone_id, e
                    );
                    continue;
                }
            };

            let ids: Vec<String> = records.into_iter().map(|r| r.id).collect();
            deleted.extend(self.delete_records(zone, &ids).await);
        }

        deleted
    }

    async fn resolve_base_domain(&self, zone: &ZoneConfig) -> Result<String> {
        match self.provider.zone_name(zone).await {
            Ok(name) if !name.is_empty() => Ok(name),
            Ok(_) => Err(Error::not_found(format!(
                "Zone {} has no name",
                zone.zone_id
            ))),
            Err(e) => {
                error!("Cannot resolve zone {}: {}", zone.zone_id, e);
                Err(e)
            }
        }
    }

    async fn reconcile_with_base(
        &self,
        zone: &ZoneConfig,
        base_domain: &str,
        desired: &DesiredRecord,
        purge: bool,
    ) -> Result<ReconciliationOutcome> {
        let fqdn = desired.fqdn(base_domain);
        let records = self.provider.list_records(zone, desired.record_type).await?;

        let plan = RecordPlan::scan(&records, &fqdn, desired);
        let body = desired.body(base_domain);

        let (action, applied) = match plan.identifier {
            Some(record_id) if plan.modified => {
                info!("Updating record {} {} -> {}", desired.record_type, fqdn, desired.content);
                let applied = match self.provider.update_record(zone, &record_id, &body).await {
                    Ok(_) => true,
                    Err(e) => {
                        warn!("Failed to update record {} ({}): {}", fqdn, record_id, e);
                        false
                    }
                };
                (RecordAction::Update { record_id }, applied)
            }
            Some(record_id) => {
                debug!("Record {} {} already up to date", desired.record_type, fqdn);
                (RecordAction::Unchanged { record_id }, true)
            }
            None => {
                info!("Adding new record {} {} -> {}", desired.record_type, fqdn, desired.content);
                let applied = match self.provider.create_record(zone, &body).await {
                    Ok(_) => true,
                    Err(e) => {
                        warn!("Failed to create record {}: {}", fqdn, e);
                        false
                    }
                };
                (RecordAction::Create, applied)
            }
        };

        let deleted_ids = if purge {
            self.delete_records(zone, &plan.duplicate_ids).await
        } else {
            if !plan.duplicate_ids.is_empty() {
                debug!(
                    "Keeping {} duplicate record(s) for {} (purge disabled)",
                    plan.duplicate_ids.len(),
                    fqdn
                );
            }
            Vec::new()
        };

        Ok(ReconciliationOutcome {
            fqdn,
            record_type: desired.record_type,
            action,
            applied,
            duplicate_ids: plan.duplicate_ids,
            deleted_ids,
        })
    }

    async fn delete_records(&self, zone: &ZoneConfig, ids: &[String]) -> Vec<String> {
        let mut deleted = Vec::with_capacity(ids.len());
        for id in ids {
            match self.provider.delete_record(zone, id).await {
                Ok(()) => {
                    info!("Deleted stale record {}", id);
                    deleted.push(id.clone());
                }
                Err(e) => warn!("Failed to delete record {}: {}", id, e),
            }
        }
        deleted
    }

    /// Get the underlying provider name
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }
}
