//! GC Logging and Tracing
//!
//! Structured record of what the collection driver did, useful for:
//! - Debugging phase sequencing
//! - Checking barrier windows after the fact
//! - Production monitoring
//!
//! Every runtime owns one [`GcLogger`]. Events are kept in a bounded history
//! and, when verbose, emitted through the `log` facade at:
//! - WARN: cycle aborts
//! - INFO: cycle start/end, zone creation/destruction
//! - DEBUG: phase transitions, barrier toggles
//! - TRACE: safepoint waits

use crate::zone::{GcPhase, ZoneId, ZoneKind};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// GC event types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GcEvent {
    /// Zone registered with the runtime
    ZoneCreated { zone: ZoneId, kind: ZoneKind },

    /// Zone removed from the runtime
    ZoneDestroyed { zone: ZoneId },

    /// Collection set moved to `Prepare`
    CycleStart { cycle: u64, zones: usize },

    /// One zone changed phase
    PhaseTransition {
        cycle: u64,
        zone: ZoneId,
        from: GcPhase,
        to: GcPhase,
    },

    /// Write barrier switched on
    BarrierActivated {
        cycle: u64,
        zone: ZoneId,
        tracer: String,
    },

    /// Write barrier switched off
    BarrierDeactivated { cycle: u64, zone: ZoneId },

    /// All registered mutators parked
    Safepoint {
        cycle: u64,
        mutators: usize,
        wait_us: u64,
    },

    /// Collection set returned to `NoGC`
    CycleEnd { cycle: u64, duration_ms: f64 },

    /// Cycle reset to `NoGC` before completing
    CycleAborted { cycle: u64, zones: usize },
}

impl GcEvent {
    /// Level the event is emitted at
    pub fn level(&self) -> log::Level {
        match self {
            GcEvent::CycleAborted { .. } => log::Level::Warn,
            GcEvent::ZoneCreated { .. }
            | GcEvent::ZoneDestroyed { .. }
            | GcEvent::CycleStart { .. }
            | GcEvent::CycleEnd { .. } => log::Level::Info,
            GcEvent::PhaseTransition { .. }
            | GcEvent::BarrierActivated { .. }
            | GcEvent::BarrierDeactivated { .. } => log::Level::Debug,
            GcEvent::Safepoint { .. } => log::Level::Trace,
        }
    }

    /// Human-readable rendering
    pub fn to_human(&self) -> String {
        match self {
            GcEvent::ZoneCreated { zone, kind } => {
                format!("[GC] {} created ({})", zone, kind)
            },
            GcEvent::ZoneDestroyed { zone } => format!("[GC] {} destroyed", zone),
            GcEvent::CycleStart { cycle, zones } => {
                format!("[GC] Cycle {} started ({} zones)", cycle, zones)
            },
            GcEvent::PhaseTransition {
                cycle,
                zone,
                from,
                to,
            } => format!("[GC] Cycle {}: {} {} -> {}", cycle, zone, from, to),
            GcEvent::BarrierActivated {
                cycle,
                zone,
                tracer,
            } => format!(
                "[GC] Cycle {}: {} barrier on (tracer: {})",
                cycle, zone, tracer
            ),
            GcEvent::BarrierDeactivated { cycle, zone } => {
                format!("[GC] Cycle {}: {} barrier off", cycle, zone)
            },
            GcEvent::Safepoint {
                cycle,
                mutators,
                wait_us,
            } => format!(
                "[GC] Cycle {}: safepoint reached by {} mutators in {} us",
                cycle, mutators, wait_us
            ),
            GcEvent::CycleEnd { cycle, duration_ms } => {
                format!("[GC] Cycle {} completed ({:.2}ms)", cycle, duration_ms)
            },
            GcEvent::CycleAborted { cycle, zones } => {
                format!("[GC] Cycle {} aborted ({} zones reset)", cycle, zones)
            },
        }
    }

    /// JSON rendering
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

/// GC Logger configuration
#[derive(Debug, Clone)]
pub struct GcLoggerConfig {
    /// Emit events through the `log` facade
    pub verbose: bool,

    /// Emit JSON instead of human-readable text
    pub json: bool,

    /// Maximum number of retained events
    pub history: usize,
}

impl Default for GcLoggerConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            json: false,
            history: 1024,
        }
    }
}

impl From<&crate::config::GcConfig> for GcLoggerConfig {
    fn from(config: &crate::config::GcConfig) -> Self {
        Self {
            verbose: config.verbose,
            json: config.json_events,
            history: config.event_history,
        }
    }
}

/// GC Logger - event history for one runtime
pub struct GcLogger {
    config: GcLoggerConfig,
    events: Mutex<VecDeque<(DateTime<Local>, GcEvent)>>,
    enabled: AtomicBool,
}

impl GcLogger {
    /// Create new GC logger
    pub fn new(config: GcLoggerConfig) -> Self {
        Self {
            config,
            events: Mutex::new(VecDeque::new()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Enable logging
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Disable logging
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Log a GC event
    pub fn log(&self, event: GcEvent) {
        if !self.is_enabled() {
            return;
        }

        if self.config.verbose {
            self.emit(&event);
        }

        if self.config.history == 0 {
            return;
        }

        let mut events = self.events.lock();
        while events.len() >= self.config.history {
            events.pop_front();
        }
        events.push_back((Local::now(), event));
    }

    fn emit(&self, event: &GcEvent) {
        let level = event.level();
        if !log::log_enabled!(target: "zone_gc::events", level) {
            return;
        }

        if self.config.json {
            log::log!(target: "zone_gc::events", level, "{}", event.to_json());
        } else {
            log::log!(target: "zone_gc::events", level, "{}", event.to_human());
        }
    }

    /// Get all retained events with their timestamps
    pub fn get_events(&self) -> Vec<(DateTime<Local>, GcEvent)> {
        self.events.lock().iter().cloned().collect()
    }

    /// Get retained events without timestamps
    pub fn events(&self) -> Vec<GcEvent> {
        self.events.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    /// Clear all events
    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }
}

impl Default for GcLogger {
    fn default() -> Self {
        Self::new(GcLoggerConfig::default())
    }
}
