//! Phase Timer
//!
//! Measures how long a collection set stays in each phase.

use crate::zone::GcPhase;
use std::time::{Duration, Instant};

/// GcTimer - elapsed time since creation or the last lap
#[derive(Debug, Clone, Copy)]
pub struct GcTimer {
    start: Instant,
}

impl GcTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_us(&self) -> u64 {
        self.elapsed().as_micros() as u64
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }

    /// Return the elapsed time and restart
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let lap = now.duration_since(self.start);
        self.start = now;
        lap
    }
}

impl Default for GcTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks the phase the driver last entered and when
#[derive(Debug)]
pub struct PhaseTimer {
    current: GcPhase,
    timer: GcTimer,
}

impl PhaseTimer {
    pub fn new(initial: GcPhase) -> Self {
        Self {
            current: initial,
            timer: GcTimer::new(),
        }
    }

    pub fn current(&self) -> GcPhase {
        self.current
    }

    /// Enter `next`, returning the phase just left and its duration
    pub fn enter(&mut self, next: GcPhase) -> (GcPhase, Duration) {
        let left = std::mem::replace(&mut self.current, next);
        (left, self.timer.lap())
    }
}
