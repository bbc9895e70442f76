//! Cycle scheduler
//!
//! Drives the [`ReconciliationEngine`] either once or on a fixed interval.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──▶ Running(once) ──────────────────────────▶ Terminated
//! Idle ──▶ Running(repeat) ──▶ wait(interval | shutdown) ─┐
//!               ▲                                         │
//!               └──────────── interval elapsed ───────────┘
//!                                   shutdown ──▶ Terminated
//! ```
//!
//! The shutdown token is only observed between cycles: a cycle in progress
//! always runs to completion.

use crate::config::RunContext;
use crate::engine::{ReconciliationEngine, ReconciliationOutcome, RecordAction};
use crate::record::RecordType;
use crate::traits::AddressDetector;
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Interval between cycles in repeat mode
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// How the scheduler runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One cycle, then stop
    Once,
    /// A cycle every interval until shutdown
    Repeat,
}

/// Summary of one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Per-record outcomes, in (family, zone, subdomain) order
    pub outcomes: Vec<ReconciliationOutcome>,
    /// Zones aborted because their base domain could not be resolved
    pub failed_zones: Vec<String>,
    /// Enabled families with no detected address
    pub undetected: Vec<RecordType>,
    /// Undetected families warned about for the first time this cycle
    pub newly_reported: Vec<RecordType>,
    /// Records deleted because their family was undetected
    pub purged_ids: Vec<String>,
    /// The detector could not answer; nothing else ran
    pub detection_failed: bool,
}

impl CycleReport {
    fn count(&self, pred: impl Fn(&RecordAction) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.action)).count()
    }

    /// Number of create decisions
    pub fn created(&self) -> usize {
        self.count(|a| matches!(a, RecordAction::Create))
    }

    /// Number of update decisions
    pub fn updated(&self) -> usize {
        self.count(|a| matches!(a, RecordAction::Update { .. }))
    }

    /// Number of records already up to date
    pub fn unchanged(&self) -> usize {
        self.count(|a| matches!(a, RecordAction::Unchanged { .. }))
    }

    /// Every record deleted during the cycle, duplicates and stale alike
    pub fn deleted(&self) -> usize {
        self.purged_ids.len()
            + self
                .outcomes
                .iter()
                .map(|o| o.deleted_ids.len())
                .sum::<usize>()
    }
}

/// Cycle scheduler
///
/// Owns the only state that outlives a cycle: which families have already
/// been reported as undetected.
pub struct Scheduler {
    engine: ReconciliationEngine,
    detector: Box<dyn AddressDetector>,
    context: RunContext,
    interval: Duration,
    warned: HashSet<RecordType>,
}

impl Scheduler {
    pub fn new(
        engine: ReconciliationEngine,
        detector: Box<dyn AddressDetector>,
        context: RunContext,
    ) -> Self {
        Self {
            engine,
            detector,
            context,
            interval: DEFAULT_INTERVAL,
            warned: HashSet::new(),
        }
    }

    /// Override the repeat interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run according to `mode`
    ///
    /// # Returns
    ///
    /// The number of cycles executed
    pub async fn run(&mut self, mode: RunMode, shutdown: CancellationToken) -> usize {
        match mode {
            RunMode::Once => {
                self.run_cycle().await;
                1
            }
            RunMode::Repeat => self.run_repeat(shutdown).await,
        }
    }

    async fn run_repeat(&mut self, shutdown: CancellationToken) -> usize {
        info!(
            "Updating {} records on {} every {:?}",
            describe_families(&self.context.enabled_types()),
            self.engine.provider_name(),
            self.interval
        );

        let mut cycles = 0;
        loop {
            self.run_cycle().await;
            cycles += 1;

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping after {} cycle(s)", cycles);
                    break;
                }

                _ = tokio::time::sleep(self.interval) => {
                    debug!("Interval elapsed, starting next cycle");
                }
            }
        }

        cycles
    }

    /// Run one full cycle: detect, then reconcile or purge per family
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        let detected = match self.detector.detect().await {
            Ok(detected) => detected,
            Err(e) => {
                error!("Address detection failed, skipping cycle: {}", e);
                report.detection_failed = true;
                return report;
            }
        };

        let purge = self.context.purge_unknown_records;

        for record_type in self.context.enabled_types() {
            let Some(address) = detected.get(record_type) else {
                self.handle_detection_gap(record_type, &mut report).await;
                continue;
            };

            debug!("Detected {} address {}", record_type.family(), address.ip);

            for zone in &self.context.zones {
                match self.engine.reconcile_zone(zone, &address, purge).await {
                    Ok(outcomes) => report.outcomes.extend(outcomes),
                    Err(e) => {
                        warn!(
                            "Aborting zone {} for this cycle ({} records): {}",
                            zone.zone_id, record_type, e
                        );
                        report.failed_zones.push(zone.zone_id.clone());
                    }
                }
            }
        }

        info!(
            created = report.created(),
            updated = report.updated(),
            unchanged = report.unchanged(),
            deleted = report.deleted(),
            failed_zones = report.failed_zones.len(),
            "Cycle complete"
        );

        report
    }

    async fn handle_detection_gap(&mut self, record_type: RecordType, report: &mut CycleReport) {
        report.undetected.push(record_type);

        if self.warned.insert(record_type) {
            warn!("{} not detected", record_type.family());
            report.newly_reported.push(record_type);
        }

        if self.context.purge_unknown_records {
            let deleted = self
                .engine
                .purge_all(&self.context.zones, record_type)
                .await;
            report.purged_ids.extend(deleted);
        }
    }
}

/// "IPv4 (A) & IPv6 (AAAA)" style label for startup messages
pub fn describe_families(types: &[RecordType]) -> String {
    types
        .iter()
        .map(|t| format!("{} ({})", t.family(), t))
        .collect::<Vec<_>>()
        .join(" & ")
}
