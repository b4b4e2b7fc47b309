//! Barrier gate and tracer slot.

use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

/// Object representing an active marking pass
///
/// Implemented by the marker that lives outside this crate. The gate only
/// keeps a [`Weak`] reference to it; the tracer's lifetime is tied to a
/// collection pass and owned by whoever opened that pass.
pub trait Tracer: Send + Sync {
    /// Record an edge that the mutator is about to overwrite
    fn trace_edge(&self, target: usize);

    /// Record a conservative root candidate found on a stack
    fn trace_root(&self, candidate: usize) {
        self.trace_edge(candidate);
    }

    /// Name used in event logs
    fn name(&self) -> &str {
        "tracer"
    }
}

/// BarrierGate - per-zone write-barrier switch
///
/// ## Activation Protocol
///
/// 1. The driver opens a tracer for the pass.
/// 2. `activate` stores it in the slot, then raises the flag.
/// 3. `deactivate` lowers the flag, then clears the slot.
///
/// The window in which `needs_barrier()` is true is exactly the window in
/// which the slot holds the tracer.
///
/// The flag is a bare relaxed load for the mutation fast path. The slot sits
/// behind a lock: it is only read on the barrier slow path, and the owning
/// thread check in front of it comes from an embedder-supplied predicate
/// that the gate does not trust for memory safety.
pub struct BarrierGate {
    /// 0 or 1, read on every heap mutation
    needs_barrier: CachePadded<AtomicU32>,

    tracer: Mutex<Option<Weak<dyn Tracer>>>,
}

impl BarrierGate {
    pub fn new() -> Self {
        Self {
            needs_barrier: CachePadded::new(AtomicU32::new(0)),
            tracer: Mutex::new(None),
        }
    }

    /// Whether heap writes must run barrier logic
    ///
    /// Pure relaxed load, safe from any thread.
    #[inline(always)]
    pub fn needs_barrier(&self) -> bool {
        self.needs_barrier.load(Ordering::Relaxed) != 0
    }

    pub(crate) fn activate(&self, tracer: Weak<dyn Tracer>) {
        let mut slot = self.tracer.lock();
        *slot = Some(tracer);
        self.needs_barrier.store(1, Ordering::Relaxed);
    }

    pub(crate) fn deactivate(&self) {
        let mut slot = self.tracer.lock();
        self.needs_barrier.store(0, Ordering::Relaxed);
        *slot = None;
    }

    /// Upgrade the tracer in the slot, if any is set and still alive
    pub(crate) fn tracer(&self) -> Option<Arc<dyn Tracer>> {
        self.tracer.lock().as_ref().and_then(Weak::upgrade)
    }
}

impl Default for BarrierGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BarrierGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarrierGate")
            .field("needs_barrier", &self.needs_barrier())
            .finish_non_exhaustive()
    }
}
