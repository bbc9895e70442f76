// # cfddns-core
//
// Core library of the Cloudflare DDNS synchronizer.
//
// ## Architecture Overview
//
// - **AddressDetector**: Trait reporting the host's current IPv4/IPv6 addresses
// - **DnsProvider**: Trait for reading and writing address records at the provider
// - **ReconciliationEngine**: Decides and executes create/update/delete per record
// - **Scheduler**: Runs reconciliation cycles once or on a fixed interval
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decision logic lives here, HTTP lives in plugin crates
// 2. **Soft Failures**: A failed provider call never aborts sibling operations
// 3. **Sequential**: One provider call at a time, in a predictable order
// 4. **Library-First**: The daemon is a thin wrapper around this crate

pub mod config;
pub mod engine;
pub mod error;
pub mod record;
pub mod scheduler;
pub mod traits;

// Re-export core types for convenience
pub use config::{Authentication, CfddnsConfig, Credentials, RunContext, ZoneConfig};
pub use engine::{ReconciliationEngine, ReconciliationOutcome, RecordAction};
pub use error::{Error, Result};
pub use record::{AddressRecord, DesiredRecord, RecordType, RemoteRecord};
pub use scheduler::{CycleReport, RunMode, Scheduler};
pub use traits::{AddressDetector, DetectedAddresses, DnsProvider};
