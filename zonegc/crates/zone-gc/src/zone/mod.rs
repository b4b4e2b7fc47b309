//! Zone Module - Independently Collectible Heap Partitions
//!
//! A [`Zone`] is the unit the collector schedules. It carries:
//!
//! - its [`ZoneKind`], fixed at creation
//! - its [`GcPhase`], stored in a relaxed atomic
//! - its [`BarrierGate`], consulted on every heap pointer store
//! - a non-owning handle back to its [`Runtime`]
//!
//! ## Thread Safety
//!
//! Any thread may query kind, phase and `needs_barrier()`. Everything that
//! touches collector-internal state (the tracer, phase and barrier mutation,
//! the checked runtime accessor) asserts the runtime's owning thread.

pub mod kind;
pub mod phase;

pub use kind::ZoneKind;
pub use phase::{AtomicGcPhase, GcPhase};

use crate::assert_context;
use crate::barrier::{BarrierGate, Tracer};
use crate::runtime::{Runtime, ThreadAffinityGuard, UncheckedRuntime};
use crossbeam::utils::CachePadded;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Weak};

/// Zone identifier, unique within its runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ZoneId(u32);

impl ZoneId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone#{}", self.0)
    }
}

/// Zone - per-partition phase coordinator and write-barrier gate
///
/// Created by [`Runtime::new_zone`]; phase and barrier state only change
/// through [`crate::CollectionDriver`].
///
/// # Examples
///
/// ```rust
/// use zone_gc::{GcConfig, GcPhase, Runtime, ZoneKind};
///
/// let runtime = Runtime::new(GcConfig::default())?;
/// let zone = runtime.new_zone(ZoneKind::Ordinary)?;
///
/// assert_eq!(zone.phase(), GcPhase::NoGC);
/// assert!(!zone.needs_barrier());
/// assert_eq!(zone.kind(), ZoneKind::Ordinary);
/// # Ok::<(), zone_gc::ZoneError>(())
/// ```
pub struct Zone {
    id: ZoneId,
    kind: ZoneKind,

    /// Read on the allocation fast path
    phase: CachePadded<AtomicGcPhase>,

    barrier: BarrierGate,

    runtime: Weak<Runtime>,
    affinity: ThreadAffinityGuard,
}

impl Zone {
    pub(crate) fn new(
        id: ZoneId,
        kind: ZoneKind,
        runtime: Weak<Runtime>,
        affinity: ThreadAffinityGuard,
    ) -> Self {
        let zone = Self {
            id,
            kind,
            phase: CachePadded::new(AtomicGcPhase::new(GcPhase::NoGC)),
            barrier: BarrierGate::new(),
            runtime,
            affinity,
        };
        debug_assert!(!zone.was_started());
        zone
    }

    #[inline]
    pub fn id(&self) -> ZoneId {
        self.id
    }

    // ------------------------------------------------------------------
    // Kind
    // ------------------------------------------------------------------

    #[inline]
    pub fn kind(&self) -> ZoneKind {
        self.kind
    }

    #[inline]
    pub fn is_interned_global_data(&self) -> bool {
        self.kind.is_interned_global_data()
    }

    #[inline]
    pub fn is_privileged(&self) -> bool {
        self.kind.is_privileged()
    }

    // ------------------------------------------------------------------
    // Phase
    // ------------------------------------------------------------------

    /// Current phase, relaxed freshness
    #[inline(always)]
    pub fn phase(&self) -> GcPhase {
        self.phase.load()
    }

    #[inline]
    pub fn was_started(&self) -> bool {
        self.phase().was_started()
    }

    #[inline]
    pub fn is_preparing(&self) -> bool {
        self.phase().is_preparing()
    }

    #[inline]
    pub fn is_marking_black_only(&self) -> bool {
        self.phase().is_marking_black_only()
    }

    #[inline]
    pub fn is_marking_black_and_gray(&self) -> bool {
        self.phase().is_marking_black_and_gray()
    }

    #[inline]
    pub fn is_sweeping(&self) -> bool {
        self.phase().is_sweeping()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.phase().is_finished()
    }

    #[inline]
    pub fn is_compacting(&self) -> bool {
        self.phase().is_compacting()
    }

    #[inline]
    pub fn is_marking(&self) -> bool {
        self.phase().is_marking()
    }

    #[inline]
    pub fn is_marking_or_sweeping(&self) -> bool {
        self.phase().is_marking_or_sweeping()
    }

    #[inline]
    pub fn is_sweeping_or_compacting(&self) -> bool {
        self.phase().is_sweeping_or_compacting()
    }

    // ------------------------------------------------------------------
    // Barrier
    // ------------------------------------------------------------------

    /// Whether heap writes into this zone must run the write barrier
    #[inline(always)]
    pub fn needs_barrier(&self) -> bool {
        self.barrier.needs_barrier()
    }

    /// Tracer of the active marking pass
    ///
    /// # Panics
    ///
    /// - the barrier is inactive
    /// - the calling thread is not the runtime's owning thread
    /// - the tracer was dropped while the barrier was still active
    #[track_caller]
    pub fn active_tracer(&self) -> Arc<dyn Tracer> {
        assert_context!(
            self.needs_barrier(),
            "barrier tracer requested for {} while its barrier is inactive",
            self.id
        );
        self.affinity.assert_owner("barrier tracer access");

        match self.barrier.tracer() {
            Some(tracer) => tracer,
            None => panic!(
                "Assertion failed: tracer of {} was dropped while its barrier was active",
                self.id
            ),
        }
    }

    // ------------------------------------------------------------------
    // Runtime access
    // ------------------------------------------------------------------

    /// Owning runtime, owning thread only
    ///
    /// # Panics
    ///
    /// Panics off the owning thread, or if the runtime has been dropped.
    #[track_caller]
    pub fn runtime_checked(&self) -> Arc<Runtime> {
        self.affinity.assert_owner("checked runtime access");
        self.upgrade_runtime()
    }

    /// Owning runtime from any thread, without an affinity check
    ///
    /// The returned handle only exposes immutable or internally synchronized
    /// diagnostics. Anything else must go through [`Zone::runtime_checked`].
    #[track_caller]
    pub fn runtime_unchecked(&self) -> UncheckedRuntime {
        UncheckedRuntime::new(self.upgrade_runtime())
    }

    #[track_caller]
    fn upgrade_runtime(&self) -> Arc<Runtime> {
        match self.runtime.upgrade() {
            Some(runtime) => runtime,
            None => panic!("Assertion failed: {} outlived its runtime", self.id),
        }
    }

    // ------------------------------------------------------------------
    // Driver-only mutation
    // ------------------------------------------------------------------

    /// Store a new phase without a legality check
    pub(crate) fn set_phase(&self, phase: GcPhase) {
        self.affinity.assert_owner("phase transition");
        self.phase.store(phase);
    }

    pub(crate) fn activate_barrier(&self, tracer: &Arc<dyn Tracer>) {
        self.affinity.assert_owner("barrier activation");
        assert_context!(
            !self.needs_barrier(),
            "barrier of {} activated twice",
            self.id
        );
        self.barrier.activate(Arc::downgrade(tracer));
    }

    pub(crate) fn deactivate_barrier(&self) {
        self.affinity.assert_owner("barrier deactivation");
        self.barrier.deactivate();
    }
}

impl Drop for Zone {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        let phase = self.phase();
        assert_context!(
            phase == GcPhase::NoGC,
            "{} destroyed during a collection (phase {})",
            self.id,
            phase
        );
    }
}

impl fmt::Debug for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zone")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("phase", &self.phase())
            .field("needs_barrier", &self.needs_barrier())
            .finish()
    }
}
