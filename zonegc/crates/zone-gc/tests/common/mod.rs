//! Test Utilities for the zone-gc Integration Suites
//!
//! Fixtures build a fresh runtime per test; nothing is shared between tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use zone_gc::{
    CollectionDriver, GcConfig, GcPhase, Runtime, Tracer, Zone, ZoneId, ZoneKind,
};

/// Generous safepoint timeout for tests with live mutators
pub const TEST_SAFEPOINT_TIMEOUT_MS: u64 = 10_000;

/// ============================================================================
/// ZONE FIXTURE
/// ============================================================================

/// Runtime plus a handful of zones owned by the test thread
pub struct ZoneFixture {
    pub runtime: Arc<Runtime>,
    pub zones: Vec<Arc<Zone>>,
}

impl ZoneFixture {
    /// One zone of each kind: ordinary, interned global data, privileged
    pub fn with_defaults() -> Self {
        Self::with_kinds(&[
            ZoneKind::Ordinary,
            ZoneKind::InternedGlobalData,
            ZoneKind::Privileged,
        ])
    }

    pub fn with_kinds(kinds: &[ZoneKind]) -> Self {
        Self::with_config(
            GcConfig {
                safepoint_timeout_ms: TEST_SAFEPOINT_TIMEOUT_MS,
                ..Default::default()
            },
            kinds,
        )
    }

    pub fn with_config(config: GcConfig, kinds: &[ZoneKind]) -> Self {
        let runtime =
            Runtime::new(config).expect("runtime initialization should succeed with valid config");
        let zones = kinds
            .iter()
            .map(|&kind| runtime.new_zone(kind).expect("zone creation should succeed"))
            .collect();
        Self { runtime, zones }
    }

    pub fn zone(&self, index: usize) -> &Arc<Zone> {
        &self.zones[index]
    }

    pub fn ids(&self) -> Vec<ZoneId> {
        self.zones.iter().map(|zone| zone.id()).collect()
    }

    pub fn driver(&self) -> CollectionDriver {
        self.runtime
            .driver()
            .expect("no other driver should be active")
    }

    /// Assert every zone of the fixture is in `phase`
    pub fn assert_all_in(&self, phase: GcPhase) {
        for zone in &self.zones {
            assert_eq!(zone.phase(), phase, "{} in wrong phase", zone.id());
        }
    }
}

/// ============================================================================
/// RECORDING TRACER
/// ============================================================================

/// Tracer that remembers every edge and root it is handed
#[derive(Default)]
pub struct RecordingTracer {
    name: String,
    edges: Mutex<Vec<usize>>,
    roots: Mutex<Vec<usize>>,
}

impl RecordingTracer {
    pub fn named(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            ..Default::default()
        })
    }

    pub fn edges(&self) -> Vec<usize> {
        self.edges.lock().clone()
    }

    pub fn roots(&self) -> Vec<usize> {
        self.roots.lock().clone()
    }
}

impl Tracer for RecordingTracer {
    fn trace_edge(&self, target: usize) {
        self.edges.lock().push(target);
    }

    fn trace_root(&self, candidate: usize) {
        self.roots.lock().push(candidate);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Upcast for driver calls
pub fn as_tracer(tracer: &Arc<RecordingTracer>) -> Arc<dyn Tracer> {
    Arc::clone(tracer) as Arc<dyn Tracer>
}

/// ============================================================================
/// MUTATOR THREADS
/// ============================================================================

/// Background mutator that polls for safepoints until stopped
pub struct PollingMutator {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<usize>>,
}

impl PollingMutator {
    /// Spawn a mutator and wait until it is registered
    ///
    /// `body` runs between polls.
    pub fn spawn<F>(runtime: &Arc<Runtime>, mut body: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let handle = {
            let runtime = Arc::clone(runtime);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let guard = runtime.register_mutator();
                ready_tx.send(()).ok();

                let mut parks = 0;
                while !stop.load(Ordering::Relaxed) {
                    body();
                    if guard.poll() {
                        parks += 1;
                    }
                }
                parks
            })
        };

        ready_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("mutator should register");

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop the mutator and return how often it parked
    pub fn stop(mut self) -> usize {
        self.stop.store(true, Ordering::Relaxed);
        self.handle
            .take()
            .map(|handle| handle.join().expect("mutator thread panicked"))
            .unwrap_or(0)
    }
}

impl Drop for PollingMutator {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Registered mutator that never polls, holding up every safepoint
pub struct StuckMutator {
    release: std::sync::mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl StuckMutator {
    pub fn spawn(runtime: &Arc<Runtime>) -> Self {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let (release, release_rx) = std::sync::mpsc::channel::<()>();

        let handle = {
            let runtime = Arc::clone(runtime);
            thread::spawn(move || {
                let _guard = runtime.register_mutator();
                ready_tx.send(()).ok();
                let _ = release_rx.recv();
            })
        };

        ready_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("mutator should register");

        Self {
            release,
            handle: Some(handle),
        }
    }
}

impl Drop for StuckMutator {
    fn drop(&mut self) {
        let _ = self.release.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Run `f` on a fresh thread and report whether it panicked
pub fn panics_off_thread<F>(f: F) -> bool
where
    F: FnOnce() + Send + 'static,
{
    thread::spawn(f).join().is_err()
}
