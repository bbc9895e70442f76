// # Address Detector Trait
//
// Defines the interface for discovering the host's current addresses.
//
// ## Implementations
//
// - Supervisor network-info endpoint: `cfddns-ip-supervisor` crate

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::record::{AddressRecord, RecordType};

/// Addresses found in one detection pass
///
/// Each family is either detected (one address) or absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectedAddresses {
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

impl DetectedAddresses {
    pub fn new(ipv4: Option<Ipv4Addr>, ipv6: Option<Ipv6Addr>) -> Self {
        Self { ipv4, ipv6 }
    }

    /// Address carried by records of `record_type`, if detected
    pub fn get(&self, record_type: RecordType) -> Option<AddressRecord> {
        let ip = match record_type {
            RecordType::A => self.ipv4.map(IpAddr::V4),
            RecordType::Aaaa => self.ipv6.map(IpAddr::V6),
        };
        ip.map(AddressRecord::new)
    }
}

/// Trait for address detector implementations
///
/// A missing family is not an error: it is reported as `None` in
/// [`DetectedAddresses`]. `Err` means the detector could not answer at all
/// (source unreachable, malformed document) and the cycle is skipped.
#[async_trait]
pub trait AddressDetector: Send + Sync {
    /// Query the current addresses
    async fn detect(&self) -> Result<DetectedAddresses, crate::Error>;
}
