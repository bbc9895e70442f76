//! Core traits for the DDNS synchronizer
//!
//! - [`AddressDetector`]: Report the host's current addresses
//! - [`DnsProvider`]: Read and write address records via the provider API

pub mod address_detector;
pub mod dns_provider;

pub use address_detector::{AddressDetector, DetectedAddresses};
pub use dns_provider::DnsProvider;
