//! Write Barrier and Thread Affinity Tests
//!
//! These tests verify:
//! - The barrier window equals the marking window
//! - `pre_write_barrier` reaches the active tracer and nothing else
//! - Owning-thread checks on tracer and runtime access
//! - Custom `ThreadRegistration` implementations

mod common;

use common::{as_tracer, panics_off_thread, RecordingTracer, ZoneFixture};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use zone_gc::runtime::ThreadRegistration;
use zone_gc::{pre_write_barrier, GcConfig, Runtime, Tracer, ZoneKind};

// ============================================================================
// BARRIER WINDOW
// ============================================================================

/// **Bug this finds:** Barrier left active after marking, or a null
/// previous value handed to the tracer
#[test]
fn test_pre_write_barrier_only_while_marking() {
    let fixture = ZoneFixture::with_kinds(&[ZoneKind::Ordinary]);
    let zone = fixture.zone(0);
    let tracer = RecordingTracer::named("window");
    let mut driver = fixture.driver();

    pre_write_barrier(zone, 0x1000);

    driver.begin_cycle(&fixture.ids()).unwrap();
    pre_write_barrier(zone, 0x2000);

    driver.start_marking(&as_tracer(&tracer)).unwrap();
    pre_write_barrier(zone, 0x3000);
    pre_write_barrier(zone, 0);

    driver.mark_gray().unwrap();
    pre_write_barrier(zone, 0x4000);

    driver.start_sweeping().unwrap();
    pre_write_barrier(zone, 0x5000);

    driver.finish().unwrap();
    driver.end_cycle().unwrap();
    pre_write_barrier(zone, 0x6000);

    assert_eq!(tracer.edges(), vec![0x3000, 0x4000]);
}

#[test]
fn test_active_tracer_is_latest_activation() {
    let fixture = ZoneFixture::with_kinds(&[ZoneKind::Ordinary]);
    let zone = fixture.zone(0);
    let first = as_tracer(&RecordingTracer::named("first"));
    let second = as_tracer(&RecordingTracer::named("second"));
    let mut driver = fixture.driver();

    for tracer in [&first, &second] {
        driver.begin_cycle(&fixture.ids()).unwrap();
        driver.start_marking(tracer).unwrap();

        let active = zone.active_tracer();
        assert!(Arc::ptr_eq(&active, tracer));
        assert_eq!(active.name(), tracer.name());

        driver.start_sweeping().unwrap();
        driver.finish().unwrap();
        driver.end_cycle().unwrap();
    }
}

#[test]
#[should_panic(expected = "while its barrier is inactive")]
fn test_active_tracer_panics_when_inactive() {
    let fixture = ZoneFixture::with_kinds(&[ZoneKind::Ordinary]);
    fixture.zone(0).active_tracer();
}

#[test]
#[should_panic(expected = "was dropped while its barrier was active")]
fn test_dropped_tracer_detected() {
    let fixture = ZoneFixture::with_kinds(&[ZoneKind::Ordinary]);
    let mut driver = fixture.driver();
    driver.begin_cycle(&fixture.ids()).unwrap();

    let tracer = as_tracer(&RecordingTracer::named("short-lived"));
    driver.start_marking(&tracer).unwrap();
    drop(tracer);

    pre_write_barrier(fixture.zone(0), 0x1000);
}

/// Every zone of the collection set shares the same tracer
#[test]
fn test_barrier_applies_to_whole_collection_set() {
    let fixture = ZoneFixture::with_defaults();
    let tracer = RecordingTracer::named("shared");
    let mut driver = fixture.driver();

    driver.begin_cycle(&fixture.ids()).unwrap();
    driver.start_marking(&as_tracer(&tracer)).unwrap();

    for (i, zone) in fixture.zones.iter().enumerate() {
        assert!(zone.needs_barrier());
        pre_write_barrier(zone, 0x100 * (i + 1));
    }

    assert_eq!(tracer.edges(), vec![0x100, 0x200, 0x300]);
}

/// Zones outside the collection set keep running without a barrier
#[test]
fn test_zone_outside_collection_set_unaffected() {
    let fixture = ZoneFixture::with_kinds(&[ZoneKind::Ordinary, ZoneKind::Ordinary]);
    let tracer = RecordingTracer::named("partial");
    let mut driver = fixture.driver();

    driver.begin_cycle(&[fixture.zone(0).id()]).unwrap();
    driver.start_marking(&as_tracer(&tracer)).unwrap();

    assert!(fixture.zone(0).needs_barrier());
    assert!(!fixture.zone(1).needs_barrier());
    assert!(!fixture.zone(1).was_started());

    pre_write_barrier(fixture.zone(1), 0x1000);
    assert!(tracer.edges().is_empty());
}

// ============================================================================
// THREAD AFFINITY
// ============================================================================

/// **Invariant verified:** tracer access off the owning thread always panics
#[test]
fn test_active_tracer_off_thread_panics() {
    let fixture = ZoneFixture::with_kinds(&[ZoneKind::Ordinary]);
    let tracer = as_tracer(&RecordingTracer::named("owned"));
    let mut driver = fixture.driver();
    driver.begin_cycle(&fixture.ids()).unwrap();
    driver.start_marking(&tracer).unwrap();

    let zone = Arc::clone(fixture.zone(0));
    assert!(panics_off_thread(move || {
        zone.active_tracer();
    }));

    let zone = Arc::clone(fixture.zone(0));
    assert!(panics_off_thread(move || pre_write_barrier(&zone, 0x1000)));

    // Still usable from the owner
    assert!(Arc::ptr_eq(&fixture.zone(0).active_tracer(), &tracer));
}

#[test]
fn test_queries_work_off_thread() {
    let fixture = ZoneFixture::with_kinds(&[ZoneKind::InternedGlobalData]);
    let zone = Arc::clone(fixture.zone(0));

    let remote = std::thread::spawn(move || {
        (
            zone.phase(),
            zone.needs_barrier(),
            zone.is_interned_global_data(),
            zone.runtime_unchecked().zone_count(),
        )
    })
    .join()
    .unwrap();

    assert_eq!(remote, (zone_gc::GcPhase::NoGC, false, true, 1));
}

#[test]
fn test_runtime_checked_same_runtime_on_owner() {
    let fixture = ZoneFixture::with_defaults();

    for zone in &fixture.zones {
        assert!(Arc::ptr_eq(&zone.runtime_checked(), &fixture.runtime));
        assert!(zone.runtime_unchecked().is(&fixture.runtime));
    }
}

#[test]
fn test_runtime_checked_off_thread_panics() {
    let fixture = ZoneFixture::with_kinds(&[ZoneKind::Ordinary]);
    let zone = Arc::clone(fixture.zone(0));

    assert!(panics_off_thread(move || {
        zone.runtime_checked();
    }));
}

#[test]
fn test_driver_off_thread_panics() {
    let fixture = ZoneFixture::with_kinds(&[ZoneKind::Ordinary]);
    let runtime = Arc::clone(&fixture.runtime);

    assert!(panics_off_thread(move || {
        let _ = runtime.driver();
    }));
    assert!(!fixture.runtime.is_collecting());
}

/// Registration that hands ownership around at runtime
struct Switchable(AtomicBool);

impl ThreadRegistration for Switchable {
    fn is_calling_thread_owner(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[test]
fn test_custom_registration_decides_ownership() {
    let registration = Arc::new(Switchable(AtomicBool::new(true)));
    let runtime = Runtime::with_registration(GcConfig::default(), registration.clone()).unwrap();
    let zone = runtime.new_zone(ZoneKind::Privileged).unwrap();

    assert!(runtime.affinity().is_owner());
    assert!(Arc::ptr_eq(&zone.runtime_checked(), &runtime));

    registration.0.store(false, Ordering::SeqCst);
    assert!(!runtime.affinity().is_owner());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| zone.runtime_checked()));
    assert!(result.is_err());

    registration.0.store(true, Ordering::SeqCst);
    runtime.destroy_zone(zone.id()).unwrap();
}

/// Registration that claims every thread as owner
struct EveryThread;

impl ThreadRegistration for EveryThread {
    fn is_calling_thread_owner(&self) -> bool {
        true
    }
}

/// **Bug this finds:** Tracer slot read from several threads at once when a
/// permissive registration lets them all past the owner check
#[test]
fn test_permissive_registration_tracer_reads_race_free() {
    let runtime = Runtime::with_registration(GcConfig::default(), Arc::new(EveryThread)).unwrap();
    let zone = runtime.new_zone(ZoneKind::Ordinary).unwrap();
    let recorder = RecordingTracer::named("shared-slot");
    let tracer = as_tracer(&recorder);
    let mut driver = runtime.driver().unwrap();
    driver.begin_cycle(&[zone.id()]).unwrap();
    driver.start_marking(&tracer).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let zone = Arc::clone(&zone);
            let tracer = Arc::clone(&tracer);
            std::thread::spawn(move || {
                for _ in 0..5_000 {
                    assert!(Arc::ptr_eq(&zone.active_tracer(), &tracer));
                    pre_write_barrier(&zone, 0x1000);
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(recorder.edges().len(), 4 * 5_000);
    driver.abort_cycle();
    assert!(!zone.needs_barrier());
}
