//! Test doubles and common utilities for behavioural contract tests
//!
//! `MockDnsProvider` keeps an in-memory record set per zone and logs every
//! call, so tests can assert both on the calls issued and on the end state.

#![allow(dead_code)]

use cfddns_core::config::{Authentication, RunContext, ZoneConfig};
use cfddns_core::error::{Error, Result};
use cfddns_core::record::{RecordBody, RecordType, RemoteRecord};
use cfddns_core::traits::{AddressDetector, DetectedAddresses, DnsProvider};
use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A provider call as observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ZoneName { zone_id: String },
    List { zone_id: String, record_type: RecordType },
    Create { zone_id: String, body: RecordBody },
    Update { zone_id: String, record_id: String, body: RecordBody },
    Delete { zone_id: String, record_id: String },
}

#[derive(Default)]
struct MockState {
    zone_names: HashMap<String, String>,
    records: HashMap<String, Vec<RemoteRecord>>,
    calls: Vec<Call>,
    next_id: usize,
    failing_zone_lookups: HashSet<String>,
    failing_listings: HashSet<String>,
    failing_deletes: HashSet<String>,
    fail_writes: bool,
}

/// A recording DnsProvider backed by an in-memory record set
///
/// Clones share state, so a test can hand one clone to the engine and keep
/// another for assertions.
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone and its base domain
    pub fn with_zone(self, zone_id: &str, name: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state
                .zone_names
                .insert(zone_id.to_string(), name.to_string());
            state.records.entry(zone_id.to_string()).or_default();
        }
        self
    }

    /// Seed an existing record
    pub fn with_record(
        self,
        zone_id: &str,
        id: &str,
        name: &str,
        record_type: RecordType,
        content: &str,
        proxied: bool,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .records
            .entry(zone_id.to_string())
            .or_default()
            .push(RemoteRecord {
                id: id.to_string(),
                name: name.to_string(),
                record_type: record_type.as_str().to_string(),
                content: content.to_string(),
                proxied,
                ttl: 1,
            });
        self
    }

    pub fn fail_zone_lookup(&self, zone_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_zone_lookups
            .insert(zone_id.to_string());
    }

    pub fn fail_listing(&self, zone_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_listings
            .insert(zone_id.to_string());
    }

    pub fn fail_delete(&self, record_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_deletes
            .insert(record_id.to_string());
    }

    /// Make every create and update call fail
    pub fn fail_writes(&self) {
        self.state.lock().unwrap().fail_writes = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn creates(&self) -> Vec<RecordBody> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create { body, .. } => Some(body),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<(String, RecordBody)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update {
                    record_id, body, ..
                } => Some((record_id, body)),
                _ => None,
            })
            .collect()
    }

    /// Record ids of every delete call, including failed ones
    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete { record_id, .. } => Some(record_id),
                _ => None,
            })
            .collect()
    }

    /// Current records of a zone
    pub fn records(&self, zone_id: &str) -> Vec<RemoteRecord> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(zone_id)
            .cloned()
            .unwrap_or_default()
    }
}

fn api_failure(method: &str, path: String) -> Error {
    Error::Api {
        method: method.to_string(),
        url: format!("https://mock.invalid/{}", path),
        status: 500,
        body: "{\"success\":false}".to_string(),
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn zone_name(&self, zone: &ZoneConfig) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ZoneName {
            zone_id: zone.zone_id.clone(),
        });

        if state.failing_zone_lookups.contains(&zone.zone_id) {
            return Err(api_failure("GET", format!("zones/{}", zone.zone_id)));
        }

        state
            .zone_names
            .get(&zone.zone_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("zone {}", zone.zone_id)))
    }

    async fn list_records(
        &self,
        zone: &ZoneConfig,
        record_type: RecordType,
    ) -> Result<Vec<RemoteRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List {
            zone_id: zone.zone_id.clone(),
            record_type,
        });

        if state.failing_listings.contains(&zone.zone_id) {
            return Err(api_failure(
                "GET",
                format!("zones/{}/dns_records", zone.zone_id),
            ));
        }

        Ok(state
            .records
            .get(&zone.zone_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.record_type == record_type.as_str())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_record(&self, zone: &ZoneConfig, record: &RecordBody) -> Result<RemoteRecord> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create {
            zone_id: zone.zone_id.clone(),
            body: record.clone(),
        });

        if state.fail_writes {
            return Err(api_failure(
                "POST",
                format!("zones/{}/dns_records", zone.zone_id),
            ));
        }

        state.next_id += 1;
        let created = RemoteRecord {
            id: format!("created-{}", state.next_id),
            name: record.name.clone(),
            record_type: record.record_type.as_str().to_string(),
            content: record.content.clone(),
            proxied: record.proxied,
            ttl: record.ttl,
        };
        state
            .records
            .entry(zone.zone_id.clone())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn update_record(
        &self,
        zone: &ZoneConfig,
        record_id: &str,
        record: &RecordBody,
    ) -> Result<RemoteRecord> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update {
            zone_id: zone.zone_id.clone(),
            record_id: record_id.to_string(),
            body: record.clone(),
        });

        if state.fail_writes {
            return Err(api_failure(
                "PUT",
                format!("zones/{}/dns_records/{}", zone.zone_id, record_id),
            ));
        }

        let existing = state
            .records
            .get_mut(&zone.zone_id)
            .and_then(|records| records.iter_mut().find(|r| r.id == record_id))
            .ok_or_else(|| Error::not_found(format!("record {}", record_id)))?;

        existing.name = record.name.clone();
        existing.content = record.content.clone();
        existing.proxied = record.proxied;
        existing.ttl = record.ttl;
        Ok(existing.clone())
    }

    async fn delete_record(&self, zone: &ZoneConfig, record_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete {
            zone_id: zone.zone_id.clone(),
            record_id: record_id.to_string(),
        });

        if state.failing_deletes.contains(record_id) {
            return Err(api_failure(
                "DELETE",
                format!("zones/{}/dns_records/{}", zone.zone_id, record_id),
            ));
        }

        if let Some(records) = state.records.get_mut(&zone.zone_id) {
            records.retain(|r| r.id != record_id);
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// An AddressDetector returning a fixed answer and counting calls
#[derive(Clone)]
pub struct ScriptedDetector {
    addresses: Arc<Mutex<Option<DetectedAddresses>>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedDetector {
    /// Detector that always reports `addresses`
    pub fn new(ipv4: Option<&str>, ipv6: Option<&str>) -> Self {
        let addresses = DetectedAddresses::new(
            ipv4.map(|ip| ip.parse::<Ipv4Addr>().unwrap()),
            ipv6.map(|ip| ip.parse::<Ipv6Addr>().unwrap()),
        );
        Self {
            addresses: Arc::new(Mutex::new(Some(addresses))),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Detector whose source is unreachable
    pub fn failing() -> Self {
        Self {
            addresses: Arc::new(Mutex::new(None)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressDetector for ScriptedDetector {
    async fn detect(&self) -> Result<DetectedAddresses> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.addresses
            .lock()
            .unwrap()
            .ok_or_else(|| Error::detector("network info unavailable"))
    }
}

/// A token-authenticated zone
pub fn zone(zone_id: &str, subdomains: &[&str]) -> ZoneConfig {
    ZoneConfig::new(zone_id, subdomains, false, Authentication::token("test-token"))
}

/// A run context over `zones`
pub fn context(zones: Vec<ZoneConfig>, a: bool, aaaa: bool, purge: bool) -> RunContext {
    RunContext {
        ipv4_enabled: a,
        ipv6_enabled: aaaa,
        purge_unknown_records: purge,
        zones,
    }
}
