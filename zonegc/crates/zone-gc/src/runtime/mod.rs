//! Runtime Module - Zone Registry and Collection Entry Point
//!
//! A [`Runtime`] is constructed explicitly and threaded through every zone it
//! creates; nothing here is process-global, so independent runtimes can live
//! side by side (one per test, one per embedder instance).
//!
//! Manages:
//! - Zone creation and destruction
//! - The owning-thread contract
//! - Safepoints for mutator threads
//! - The collection driver and event log

pub mod affinity;
pub mod driver;
pub mod safepoint;

pub use affinity::{OwnerThread, ThreadAffinityGuard, ThreadRegistration};
pub use driver::CollectionDriver;
pub use safepoint::{MutatorGuard, Safepoint};

use crate::config::GcConfig;
use crate::error::{Result, ZoneError};
use crate::logging::{GcEvent, GcLogger, GcLoggerConfig};
use crate::zone::{Zone, ZoneId, ZoneKind};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique runtime identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuntimeId(u64);

impl RuntimeId {
    fn next() -> Self {
        Self(NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runtime#{}", self.0)
    }
}

/// Runtime - owner of a set of zones
///
/// ## Thread Safety
///
/// `Runtime` is `Send + Sync`. Zone creation, destruction and collection are
/// restricted to the owning thread; registry lookups and diagnostics work
/// from any thread.
pub struct Runtime {
    id: RuntimeId,
    config: GcConfig,
    affinity: ThreadAffinityGuard,

    /// Live zones in creation order
    zones: RwLock<IndexMap<ZoneId, Arc<Zone>>>,
    next_zone_id: AtomicU32,

    safepoint: Safepoint,
    logger: GcLogger,

    /// Completed cycles
    cycle_count: AtomicU64,

    /// Set while a `CollectionDriver` exists
    collecting: AtomicBool,
}

impl Runtime {
    /// Create a runtime owned by the calling thread
    ///
    /// # Errors
    /// `ZoneError::Configuration` if `config` fails validation.
    pub fn new(config: GcConfig) -> Result<Arc<Self>> {
        Self::with_registration(config, Arc::new(OwnerThread::current()))
    }

    /// Create a runtime whose owning thread is decided by `registration`
    pub fn with_registration(
        config: GcConfig,
        registration: Arc<dyn ThreadRegistration>,
    ) -> Result<Arc<Self>> {
        config
            .validate()
            .map_err(|e| ZoneError::Configuration(format!("Invalid configuration: {}", e)))?;

        let logger = GcLogger::new(GcLoggerConfig::from(&config));
        let runtime = Arc::new(Self {
            id: RuntimeId::next(),
            config,
            affinity: ThreadAffinityGuard::new(registration),
            zones: RwLock::new(IndexMap::new()),
            next_zone_id: AtomicU32::new(0),
            safepoint: Safepoint::new(),
            logger,
            cycle_count: AtomicU64::new(0),
            collecting: AtomicBool::new(false),
        });

        log::debug!("{} created", runtime.id);
        Ok(runtime)
    }

    pub fn id(&self) -> RuntimeId {
        self.id
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    pub fn affinity(&self) -> &ThreadAffinityGuard {
        &self.affinity
    }

    pub fn logger(&self) -> &GcLogger {
        &self.logger
    }

    pub fn safepoint(&self) -> &Safepoint {
        &self.safepoint
    }

    /// Create a zone of the given kind, owning thread only
    ///
    /// # Errors
    /// - `ZoneError::ZoneLimit` when `max_zones` zones are alive
    /// - `ZoneError::ZoneIdsExhausted` when no unused id is left
    ///
    /// # Panics
    /// Panics off the owning thread.
    pub fn new_zone(self: &Arc<Self>, kind: ZoneKind) -> Result<Arc<Zone>> {
        self.affinity.assert_owner("zone creation");

        let mut zones = self.zones.write();
        if zones.len() >= self.config.max_zones {
            return Err(ZoneError::ZoneLimit {
                max: self.config.max_zones,
            });
        }

        let id = self
            .next_zone_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| {
                next.checked_add(1)
            })
            .map(ZoneId::new)
            .map_err(|_| ZoneError::ZoneIdsExhausted)?;
        let zone = Arc::new(Zone::new(
            id,
            kind,
            Arc::downgrade(self),
            self.affinity.clone(),
        ));
        zones.insert(id, Arc::clone(&zone));
        drop(zones);

        self.logger.log(GcEvent::ZoneCreated { zone: id, kind });
        Ok(zone)
    }

    /// Remove a zone from the registry, owning thread only
    ///
    /// Outstanding `Arc<Zone>` handles stay valid; the zone is freed when the
    /// last one drops.
    ///
    /// # Errors
    /// - `ZoneError::UnknownZone` if `id` is not registered
    /// - `ZoneError::ZoneBusy` if the zone is part of a collection
    pub fn destroy_zone(&self, id: ZoneId) -> Result<()> {
        self.affinity.assert_owner("zone destruction");

        let mut zones = self.zones.write();
        let zone = zones.get(&id).ok_or(ZoneError::UnknownZone(id))?;

        let phase = zone.phase();
        if phase.was_started() {
            return Err(ZoneError::ZoneBusy { zone: id, phase });
        }

        zones.shift_remove(&id);
        drop(zones);

        self.logger.log(GcEvent::ZoneDestroyed { zone: id });
        Ok(())
    }

    pub fn zone(&self, id: ZoneId) -> Option<Arc<Zone>> {
        self.zones.read().get(&id).cloned()
    }

    /// Snapshot of all live zones in creation order
    pub fn zones(&self) -> Vec<Arc<Zone>> {
        self.zones.read().values().cloned().collect()
    }

    /// Ids of all live zones in creation order
    pub fn zone_ids(&self) -> Vec<ZoneId> {
        self.zones.read().keys().copied().collect()
    }

    pub fn zone_count(&self) -> usize {
        self.zones.read().len()
    }

    /// Register the calling thread as a mutator
    ///
    /// # Panics
    /// Panics on the owning thread: it drives safepoints and cannot park at
    /// them.
    pub fn register_mutator(self: &Arc<Self>) -> MutatorGuard {
        crate::assert_context!(
            !self.affinity.is_owner(),
            "the owning thread of {} cannot register as a mutator",
            self.id
        );
        MutatorGuard::new(Arc::clone(self))
    }

    /// Start driving a collection, owning thread only
    ///
    /// # Errors
    /// `ZoneError::AlreadyCollecting` if another driver is alive.
    pub fn driver(self: &Arc<Self>) -> Result<CollectionDriver> {
        self.affinity.assert_owner("collection driver");

        if self
            .collecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ZoneError::AlreadyCollecting);
        }

        Ok(CollectionDriver::new(Arc::clone(self)))
    }

    /// Number of completed collection cycles
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count.load(Ordering::Relaxed)
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting.load(Ordering::Acquire)
    }

    pub(crate) fn finish_cycle(&self) -> u64 {
        self.cycle_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn release_driver(&self) {
        self.collecting.store(false, Ordering::Release);
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("id", &self.id)
            .field("zones", &self.zone_count())
            .field("cycle_count", &self.cycle_count())
            .field("collecting", &self.is_collecting())
            .finish()
    }
}

/// Runtime handle obtained without a thread check
///
/// Only exposes fields that are immutable or internally synchronized, so a
/// diagnostic read from any thread cannot race a collector mutation.
#[derive(Clone)]
pub struct UncheckedRuntime {
    runtime: Arc<Runtime>,
}

impl UncheckedRuntime {
    pub(crate) fn new(runtime: Arc<Runtime>) -> Self {
        Self { runtime }
    }

    pub fn id(&self) -> RuntimeId {
        self.runtime.id()
    }

    pub fn config(&self) -> &GcConfig {
        self.runtime.config()
    }

    pub fn zone_count(&self) -> usize {
        self.runtime.zone_count()
    }

    pub fn cycle_count(&self) -> u64 {
        self.runtime.cycle_count()
    }

    pub fn is_collecting(&self) -> bool {
        self.runtime.is_collecting()
    }

    /// Whether this handle and `runtime` refer to the same runtime
    pub fn is(&self, runtime: &Arc<Runtime>) -> bool {
        Arc::ptr_eq(&self.runtime, runtime)
    }
}

impl fmt::Debug for UncheckedRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UncheckedRuntime")
            .field(&self.runtime.id())
            .finish()
    }
}
