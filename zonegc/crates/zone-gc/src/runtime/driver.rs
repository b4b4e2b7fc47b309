//! Collection Driver - Phase Sequencing for a Collection Set
//!
//! The driver is the only code path that mutates zone phase and barrier
//! state. Every step follows the same shape:
//!
//! 1. Check the requested transition against [`GcPhase::can_transition_to`]
//!    for every zone involved. Any illegal zone rejects the whole step.
//! 2. Open a safepoint window (see [`super::safepoint`]).
//! 3. Toggle barriers and store the new phases.
//! 4. Release the window, publishing the stores to parked mutators.
//!
//! ```text
//! begin_cycle ─▶ Prepare ─▶ start_marking ─▶ MarkBlackOnly ─▶ mark_gray ─▶ MarkBlackAndGray
//!                                                  │                           │
//!                                                  └──────▶ start_sweeping ◀───┘
//!                                                                 │
//!                             end_cycle ◀─ compact ◀─ Finished ◀─ finish
//! ```

use super::Runtime;
use crate::barrier::Tracer;
use crate::error::{Result, ZoneError};
use crate::logging::GcEvent;
use crate::marker::{ConservativeRootScan, FrameCursor, ScanSummary, StackWalker};
use crate::stats::{CycleStats, GcTimer, PhaseTimer};
use crate::zone::{GcPhase, Zone, ZoneId};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Barrier change applied inside a transition window
#[derive(Clone, Copy)]
enum BarrierChange<'a> {
    Keep,
    Activate(&'a Arc<dyn Tracer>),
    Deactivate,
}

/// CollectionDriver - sequences one collection cycle at a time
///
/// Obtained from [`Runtime::driver`]. The driver is `!Send`: it is created
/// on the runtime's owning thread and stays there.
///
/// Dropping a driver with a cycle in flight aborts the cycle.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use zone_gc::{GcConfig, GcPhase, Runtime, Tracer, ZoneKind};
///
/// struct Marker;
/// impl Tracer for Marker {
///     fn trace_edge(&self, _target: usize) {}
/// }
///
/// let runtime = Runtime::new(GcConfig::default())?;
/// let zone = runtime.new_zone(ZoneKind::Ordinary)?;
/// let tracer: Arc<dyn Tracer> = Arc::new(Marker);
///
/// let mut driver = runtime.driver()?;
/// driver.begin_cycle(&[zone.id()])?;
/// driver.start_marking(&tracer)?;
/// assert!(zone.needs_barrier());
///
/// driver.start_sweeping()?;
/// driver.finish()?;
/// let stats = driver.end_cycle()?;
///
/// assert_eq!(stats.cycle, 1);
/// assert_eq!(zone.phase(), GcPhase::NoGC);
/// # Ok::<(), zone_gc::ZoneError>(())
/// ```
#[derive(Debug)]
pub struct CollectionDriver {
    runtime: Arc<Runtime>,

    /// Number of the cycle in flight, or of the next one
    cycle: u64,

    /// Collection set, empty between cycles
    zones: Vec<Arc<Zone>>,

    phase_timer: PhaseTimer,
    cycle_timer: GcTimer,
    stats: CycleStats,

    _not_send: PhantomData<*const ()>,
}

impl CollectionDriver {
    pub(crate) fn new(runtime: Arc<Runtime>) -> Self {
        let cycle = runtime.cycle_count() + 1;
        Self {
            runtime,
            cycle,
            zones: Vec::new(),
            phase_timer: PhaseTimer::new(GcPhase::NoGC),
            cycle_timer: GcTimer::new(),
            stats: CycleStats::default(),
            _not_send: PhantomData,
        }
    }

    /// Cycle number of the cycle in flight, or of the next one
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Phase most recently entered by the collection set
    ///
    /// After a partial `compact` this is `Compact` even though the rest of
    /// the set is still `Finished`.
    pub fn phase(&self) -> GcPhase {
        self.phase_timer.current()
    }

    pub fn in_cycle(&self) -> bool {
        !self.zones.is_empty()
    }

    /// Zones of the cycle in flight
    pub fn collection_set(&self) -> &[Arc<Zone>] {
        &self.zones
    }

    /// Collection set in sweep order: the interned-global-data zone last
    ///
    /// Other zones may still point into interned global data while they are
    /// swept.
    pub fn sweep_order(&self) -> Vec<Arc<Zone>> {
        let (mut order, interned): (Vec<_>, Vec<_>) = self
            .zones
            .iter()
            .cloned()
            .partition(|zone| !zone.is_interned_global_data());
        order.extend(interned);
        order
    }

    // ------------------------------------------------------------------
    // Cycle steps
    // ------------------------------------------------------------------

    /// NoGC -> Prepare for `ids`
    ///
    /// # Errors
    /// - `InvalidArgument`: a cycle is in flight, `ids` is empty, or has duplicates
    /// - `UnknownZone`: an id is not registered
    /// - `InvalidTransition`: a zone is not idle
    /// - `Timeout`: mutators did not reach the safepoint
    pub fn begin_cycle(&mut self, ids: &[ZoneId]) -> Result<()> {
        crate::ensure!(
            !self.in_cycle(),
            ZoneError::InvalidArgument(format!("cycle {} is already in flight", self.cycle))
        );
        crate::ensure!(
            !ids.is_empty(),
            ZoneError::InvalidArgument("empty collection set".to_string())
        );

        let mut zones: Vec<Arc<Zone>> = Vec::with_capacity(ids.len());
        for &id in ids {
            crate::ensure!(
                zones.iter().all(|zone| zone.id() != id),
                ZoneError::InvalidArgument(format!("{} listed twice", id))
            );
            zones.push(self.runtime.zone(id).ok_or(ZoneError::UnknownZone(id))?);
        }

        self.cycle = self.runtime.cycle_count() + 1;
        self.stats = CycleStats::new(self.cycle, zones.len());
        self.cycle_timer = GcTimer::new();
        self.phase_timer = PhaseTimer::new(GcPhase::NoGC);

        let wait = self.publish(&zones, GcPhase::Prepare, BarrierChange::Keep)?;
        self.zones = zones;

        self.runtime.logger().log(GcEvent::CycleStart {
            cycle: self.cycle,
            zones: self.zones.len(),
        });
        self.enter(GcPhase::Prepare, wait);
        Ok(())
    }

    /// Prepare -> MarkBlackOnly, activating every barrier with `tracer`
    ///
    /// The driver keeps no strong reference; the caller owns `tracer` for
    /// the whole marking pass.
    pub fn start_marking(&mut self, tracer: &Arc<dyn Tracer>) -> Result<()> {
        self.step(GcPhase::MarkBlackOnly, BarrierChange::Activate(tracer))
    }

    /// MarkBlackOnly -> MarkBlackAndGray
    pub fn mark_gray(&mut self) -> Result<()> {
        self.step(GcPhase::MarkBlackAndGray, BarrierChange::Keep)
    }

    /// Deactivate barriers, then either marking phase -> Sweep
    pub fn start_sweeping(&mut self) -> Result<()> {
        self.step(GcPhase::Sweep, BarrierChange::Deactivate)
    }

    /// Sweep -> Finished
    pub fn finish(&mut self) -> Result<()> {
        self.step(GcPhase::Finished, BarrierChange::Keep)
    }

    /// Finished -> Compact for a subset of the collection set
    ///
    /// # Errors
    /// `InvalidArgument` if `ids` is empty, lists a zone twice, names a zone
    /// outside the collection set, or names only privileged zones.
    pub fn compact(&mut self, ids: &[ZoneId]) -> Result<()> {
        crate::ensure!(
            !ids.is_empty(),
            ZoneError::InvalidArgument("empty compaction set".to_string())
        );

        let mut subset: Vec<Arc<Zone>> = Vec::with_capacity(ids.len());
        for &id in ids {
            crate::ensure!(
                subset.iter().all(|zone| zone.id() != id),
                ZoneError::InvalidArgument(format!("{} listed twice", id))
            );
            let zone = self
                .zones
                .iter()
                .find(|zone| zone.id() == id)
                .ok_or_else(|| {
                    ZoneError::InvalidArgument(format!("{} is not in the collection set", id))
                })?;
            subset.push(Arc::clone(zone));
        }

        crate::ensure!(
            !subset.iter().all(|zone| zone.is_privileged()),
            ZoneError::InvalidArgument(
                "privileged zones are only compacted alongside ordinary zones".to_string()
            )
        );

        let wait = self.publish(&subset, GcPhase::Compact, BarrierChange::Keep)?;
        self.enter(GcPhase::Compact, wait);
        Ok(())
    }

    /// Finished/Compact -> NoGC, completing the cycle
    ///
    /// Returns the statistics of the finished cycle.
    pub fn end_cycle(&mut self) -> Result<CycleStats> {
        self.step(GcPhase::NoGC, BarrierChange::Keep)?;

        let completed = self.runtime.finish_cycle();
        debug_assert_eq!(completed, self.cycle);

        let duration_ms = self.cycle_timer.elapsed_ms();
        self.runtime.logger().log(GcEvent::CycleEnd {
            cycle: self.cycle,
            duration_ms,
        });

        self.zones.clear();
        self.cycle += 1;
        Ok(std::mem::take(&mut self.stats))
    }

    /// Reset the collection set to NoGC from any phase
    ///
    /// Barriers are switched off first. If mutators do not reach the
    /// safepoint in time the reset is published without a window. Does
    /// nothing between cycles.
    pub fn abort_cycle(&mut self) {
        if !self.in_cycle() {
            return;
        }

        let wait = match self.open_window() {
            Ok(wait) => wait,
            Err(e) => {
                log::warn!(
                    "cycle {}: aborting without a safepoint window: {}",
                    self.cycle,
                    e
                );
                Duration::ZERO
            },
        };

        for zone in &self.zones {
            if zone.needs_barrier() {
                zone.deactivate_barrier();
            }
            zone.set_phase(GcPhase::NoGC);
        }
        self.runtime.safepoint().release();

        self.runtime.logger().log(GcEvent::CycleAborted {
            cycle: self.cycle,
            zones: self.zones.len(),
        });

        self.enter(GcPhase::NoGC, wait);
        self.stats.aborted = true;
        self.zones.clear();
    }

    // ------------------------------------------------------------------
    // Root scanning
    // ------------------------------------------------------------------

    /// Conservatively scan a mutator stack, feeding candidates to the
    /// active tracer's `trace_root`
    ///
    /// # Errors
    /// `InvalidArgument` unless the collection set is marking.
    pub fn scan_roots<W>(
        &self,
        walker: &W,
        start: FrameCursor,
        scan: &ConservativeRootScan,
    ) -> Result<ScanSummary>
    where
        W: StackWalker + ?Sized,
    {
        let zone = self
            .zones
            .first()
            .filter(|zone| zone.is_marking())
            .ok_or_else(|| {
                ZoneError::InvalidArgument("root scan outside a marking phase".to_string())
            })?;

        let tracer = zone.active_tracer();
        Ok(scan.run(walker, start, |word| tracer.trace_root(word)))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn step(&mut self, to: GcPhase, barrier: BarrierChange<'_>) -> Result<()> {
        crate::ensure!(
            self.in_cycle(),
            ZoneError::InvalidArgument(format!("no cycle in flight (requested {})", to))
        );
        let wait = self.publish(&self.zones, to, barrier)?;
        self.enter(to, wait);
        Ok(())
    }

    /// Validate, open a window, mutate, release
    ///
    /// Nothing is mutated unless every zone may enter `to` and the window
    /// opened.
    fn publish(
        &self,
        zones: &[Arc<Zone>],
        to: GcPhase,
        barrier: BarrierChange<'_>,
    ) -> Result<Duration> {
        for zone in zones {
            let from = zone.phase();
            crate::ensure!(
                from.can_transition_to(to),
                ZoneError::InvalidTransition {
                    zone: zone.id(),
                    from,
                    to,
                }
            );
        }

        let wait = self.open_window()?;
        let logger = self.runtime.logger();

        for zone in zones {
            match barrier {
                BarrierChange::Keep => {},
                BarrierChange::Activate(tracer) => {
                    zone.activate_barrier(tracer);
                    logger.log(GcEvent::BarrierActivated {
                        cycle: self.cycle,
                        zone: zone.id(),
                        tracer: tracer.name().to_string(),
                    });
                },
                BarrierChange::Deactivate => {
                    zone.deactivate_barrier();
                    logger.log(GcEvent::BarrierDeactivated {
                        cycle: self.cycle,
                        zone: zone.id(),
                    });
                },
            }

            let from = zone.phase();
            zone.set_phase(to);
            logger.log(GcEvent::PhaseTransition {
                cycle: self.cycle,
                zone: zone.id(),
                from,
                to,
            });
        }

        self.runtime.safepoint().release();
        Ok(wait)
    }

    /// Request a safepoint and wait for every registered mutator
    ///
    /// On timeout the request is withdrawn again.
    fn open_window(&self) -> Result<Duration> {
        let safepoint = self.runtime.safepoint();
        safepoint.request();

        match safepoint.wait_for_mutators(self.runtime.config().safepoint_timeout()) {
            Ok(wait) => {
                self.runtime.logger().log(GcEvent::Safepoint {
                    cycle: self.cycle,
                    mutators: safepoint.registered_mutators(),
                    wait_us: wait.as_micros() as u64,
                });
                Ok(wait)
            },
            Err(e) => {
                safepoint.release();
                log::warn!("cycle {}: {}", self.cycle, e);
                Err(e)
            },
        }
    }

    fn enter(&mut self, phase: GcPhase, wait: Duration) {
        let (left, spent) = self.phase_timer.enter(phase);
        if left != GcPhase::NoGC {
            self.stats.record_phase(left, spent);
        }
        self.stats.record_safepoint(wait);
        log::debug!("cycle {}: {} -> {}", self.cycle, left, phase);
    }
}

impl Drop for CollectionDriver {
    fn drop(&mut self) {
        if self.in_cycle() {
            self.abort_cycle();
        }
        self.runtime.release_driver();
    }
}
