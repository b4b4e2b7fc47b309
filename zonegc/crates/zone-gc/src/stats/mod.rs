//! Stats Module - Collection Cycle Statistics
//!
//! Per-cycle timings recorded by the collection driver.

pub mod timer;

pub use timer::{GcTimer, PhaseTimer};

use crate::zone::GcPhase;
use indexmap::IndexMap;
use std::time::Duration;

/// Statistics for one collection cycle
#[derive(Debug, Clone, Default)]
pub struct CycleStats {
    /// Cycle number (1-based, per runtime)
    pub cycle: u64,

    /// Number of zones in the collection set
    pub zones: usize,

    /// Time the collection set spent in each phase, in entry order
    pub phase_times: IndexMap<GcPhase, Duration>,

    /// Total time spent waiting for mutators at safepoints
    pub safepoint_wait: Duration,

    /// Number of safepoint windows opened
    pub safepoints: u32,

    /// Whether the cycle was aborted
    pub aborted: bool,
}

impl CycleStats {
    pub fn new(cycle: u64, zones: usize) -> Self {
        Self {
            cycle,
            zones,
            ..Default::default()
        }
    }

    /// Add time spent in `phase`
    pub fn record_phase(&mut self, phase: GcPhase, spent: Duration) {
        *self.phase_times.entry(phase).or_default() += spent;
    }

    pub fn record_safepoint(&mut self, wait: Duration) {
        self.safepoints += 1;
        self.safepoint_wait += wait;
    }

    /// Time spent in either marking phase
    pub fn marking_time(&self) -> Duration {
        self.phase_times
            .iter()
            .filter(|(phase, _)| phase.is_marking())
            .map(|(_, d)| *d)
            .sum()
    }

    /// Total time across all recorded phases
    pub fn total_time(&self) -> Duration {
        self.phase_times.values().copied().sum()
    }
}
