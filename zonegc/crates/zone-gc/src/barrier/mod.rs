//! Barrier Module - Write-Barrier Activation Gate
//!
//! Every heap pointer store consults the gate of the zone that owns the
//! written cell. While the zone is marking, the gate is active and the value
//! being overwritten must be handed to the active tracer so that incremental
//! marking does not lose it.
//!
//! Fast Path Logic:
//! ```text
//! if (prev == null) return;          // Nothing to trace
//! if (!zone.needs_barrier()) return; // One relaxed load
//! slow_path(zone, prev);             // Out of line
//! ```
//!
//! The fast path never locks. The slow path takes the gate's slot lock once to
//! upgrade the tracer.

pub mod gate;

pub use gate::{BarrierGate, Tracer};

use crate::zone::Zone;

/// Pre-write barrier - inline fast path
///
/// Call before overwriting a heap pointer held by a cell of `zone`, passing
/// the pointer value about to be replaced.
///
/// # Panics
///
/// The slow path panics if the barrier is active and the calling thread is
/// not the runtime's owning thread.
///
/// # Examples
///
/// ```rust
/// use zone_gc::{barrier::pre_write_barrier, Runtime, GcConfig, ZoneKind};
///
/// let runtime = Runtime::new(GcConfig::default())?;
/// let zone = runtime.new_zone(ZoneKind::Ordinary)?;
///
/// // No collection in flight: nothing happens
/// pre_write_barrier(&zone, 0x1000);
/// # Ok::<(), zone_gc::ZoneError>(())
/// ```
#[inline(always)]
pub fn pre_write_barrier(zone: &Zone, prev: usize) {
    if prev == 0 || !zone.needs_barrier() {
        return;
    }

    pre_write_barrier_slow_path(zone, prev);
}

#[cold]
#[inline(never)]
fn pre_write_barrier_slow_path(zone: &Zone, prev: usize) {
    zone.active_tracer().trace_edge(prev);
}
