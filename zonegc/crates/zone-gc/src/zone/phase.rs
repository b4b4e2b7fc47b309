//! Collection Phase - Per-Zone GC State Machine
//!
//! Every zone walks the same fixed cycle:
//!
//! ```text
//! NoGC(0) -> Prepare(1) -> MarkBlackOnly(2) -> MarkBlackAndGray(3)
//!         -> Sweep(4) -> Finished(5) -> Compact(6) -> NoGC(0)
//! ```
//!
//! A non-compacting pass returns from `Finished` straight to `NoGC`, and the
//! gray marking step may be skipped (`MarkBlackOnly -> Sweep`).
//!
//! The numeric ordering of the variants is load-bearing:
//! [`GcPhase::is_marking_or_sweeping`] is an ordinal range comparison.
//!
//! [`AtomicGcPhase`] is only a storage primitive. It never validates a
//! transition; sequencing is enforced by the collection driver through
//! [`GcPhase::can_transition_to`].

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Collection phase of a zone
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GcPhase {
    /// No collection in flight
    #[serde(rename = "no_gc")]
    NoGC = 0,
    /// Collection set selected, marking not started
    Prepare = 1,
    /// Marking reachable objects black
    MarkBlackOnly = 2,
    /// Marking both black and gray objects
    MarkBlackAndGray = 3,
    /// Sweeping unmarked cells
    Sweep = 4,
    /// Sweeping done, cycle may end here
    Finished = 5,
    /// Compacting surviving cells
    Compact = 6,
}

impl GcPhase {
    /// All phases in ordinal order
    pub const ALL: [GcPhase; 7] = [
        GcPhase::NoGC,
        GcPhase::Prepare,
        GcPhase::MarkBlackOnly,
        GcPhase::MarkBlackAndGray,
        GcPhase::Sweep,
        GcPhase::Finished,
        GcPhase::Compact,
    ];

    /// Raw ordinal stored in the atomic field
    #[inline(always)]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Decode a raw ordinal
    ///
    /// # Panics
    /// Panics if `raw` is not one of the seven phase ordinals.
    #[inline]
    pub fn from_u32(raw: u32) -> GcPhase {
        match raw {
            0 => GcPhase::NoGC,
            1 => GcPhase::Prepare,
            2 => GcPhase::MarkBlackOnly,
            3 => GcPhase::MarkBlackAndGray,
            4 => GcPhase::Sweep,
            5 => GcPhase::Finished,
            6 => GcPhase::Compact,
            _ => panic!("Assertion failed: invalid GC phase ordinal {}", raw),
        }
    }

    /// Stable lowercase name, used in events and error messages
    pub const fn name(self) -> &'static str {
        match self {
            GcPhase::NoGC => "no_gc",
            GcPhase::Prepare => "prepare",
            GcPhase::MarkBlackOnly => "mark_black_only",
            GcPhase::MarkBlackAndGray => "mark_black_and_gray",
            GcPhase::Sweep => "sweep",
            GcPhase::Finished => "finished",
            GcPhase::Compact => "compact",
        }
    }

    #[inline(always)]
    pub fn was_started(self) -> bool {
        self != GcPhase::NoGC
    }

    #[inline(always)]
    pub fn is_preparing(self) -> bool {
        self == GcPhase::Prepare
    }

    #[inline(always)]
    pub fn is_marking_black_only(self) -> bool {
        self == GcPhase::MarkBlackOnly
    }

    #[inline(always)]
    pub fn is_marking_black_and_gray(self) -> bool {
        self == GcPhase::MarkBlackAndGray
    }

    #[inline(always)]
    pub fn is_sweeping(self) -> bool {
        self == GcPhase::Sweep
    }

    #[inline(always)]
    pub fn is_finished(self) -> bool {
        self == GcPhase::Finished
    }

    #[inline(always)]
    pub fn is_compacting(self) -> bool {
        self == GcPhase::Compact
    }

    /// Either marking phase
    #[inline(always)]
    pub fn is_marking(self) -> bool {
        self.is_marking_black_only() || self.is_marking_black_and_gray()
    }

    /// `MarkBlackOnly <= phase <= Sweep`, compared by ordinal
    #[inline(always)]
    pub fn is_marking_or_sweeping(self) -> bool {
        self >= GcPhase::MarkBlackOnly && self <= GcPhase::Sweep
    }

    #[inline(always)]
    pub fn is_sweeping_or_compacting(self) -> bool {
        self == GcPhase::Sweep || self == GcPhase::Compact
    }

    /// Whether the driver may move a zone from `self` to `next`
    pub fn can_transition_to(self, next: GcPhase) -> bool {
        use GcPhase::*;
        matches!(
            (self, next),
            (NoGC, Prepare)
                | (Prepare, MarkBlackOnly)
                | (MarkBlackOnly, MarkBlackAndGray)
                | (MarkBlackOnly, Sweep)
                | (MarkBlackAndGray, Sweep)
                | (Sweep, Finished)
                | (Finished, Compact)
                | (Finished, NoGC)
                | (Compact, NoGC)
        )
    }
}

impl Default for GcPhase {
    fn default() -> Self {
        GcPhase::NoGC
    }
}

impl fmt::Display for GcPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Atomically readable phase cell
///
/// # Memory Ordering
///
/// Loads and stores are `Relaxed`. A reader sees *a* phase, not necessarily
/// the latest one. Readers that need the latest phase must pass through a
/// safepoint (see [`crate::runtime::safepoint`]), which orders every store
/// made by the driver before the mutator resumes.
#[derive(Debug)]
pub struct AtomicGcPhase(AtomicU32);

impl AtomicGcPhase {
    pub const fn new(phase: GcPhase) -> Self {
        Self(AtomicU32::new(phase as u32))
    }

    #[inline(always)]
    pub fn load(&self) -> GcPhase {
        GcPhase::from_u32(self.0.load(Ordering::Relaxed))
    }

    /// Store without any legality check
    #[inline(always)]
    pub fn store(&self, phase: GcPhase) {
        self.0.store(phase.as_u32(), Ordering::Relaxed);
    }
}

impl Default for AtomicGcPhase {
    fn default() -> Self {
        Self::new(GcPhase::NoGC)
    }
}
