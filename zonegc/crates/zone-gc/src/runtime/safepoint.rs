//! Safepoint Management
//!
//! Zone phase and barrier fields are relaxed atomics. A mutator reading them
//! sees *a* value, not necessarily the latest. Safepoints supply the ordering:
//! every phase or barrier change made by the collection driver is published
//! inside a safepoint window, and a mutator leaving the window observes all
//! of it.
//!
//! ## Protocol
//!
//! ```text
//! driver                              mutator
//! ------                              -------
//! request()      (SeqCst)
//!                                     poll(): is_requested() -> true
//!                                             arrive, spin on state
//! wait_for_mutators(timeout)
//! <relaxed phase/barrier stores>
//! release()      (Release) ─────────▶ state == NONE (Acquire), resume
//! ```
//!
//! The Release/Acquire pair makes every store made between `request` and
//! `release` happen-before the mutator's next zone query.
//!
//! The owning thread drives safepoints and is never registered as a mutator.
//! Any other thread registers at most once per runtime.

use crate::error::{Result, ZoneError};
use crossbeam::utils::{Backoff, CachePadded};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// Safepoint state constants
pub const SAFEPOINT_NONE: u8 = 0;
pub const SAFEPOINT_REQUESTED: u8 = 1;

/// Safepoint - rendezvous between the collection driver and mutator threads
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use zone_gc::runtime::safepoint::Safepoint;
///
/// let safepoint = Safepoint::new();
///
/// // No mutators registered: the window opens immediately
/// safepoint.request();
/// safepoint.wait_for_mutators(Duration::from_millis(10))?;
/// safepoint.release();
/// # Ok::<(), zone_gc::ZoneError>(())
/// ```
pub struct Safepoint {
    /// Polled by every mutator
    state: CachePadded<AtomicU8>,

    /// Mutators currently inside `block_until_released`
    parked: AtomicUsize,

    /// Mutators that must park before the window opens
    registered: AtomicUsize,

    /// Threads behind `registered`
    threads: Mutex<HashSet<ThreadId>>,
}

impl Safepoint {
    pub fn new() -> Self {
        Self {
            state: CachePadded::new(AtomicU8::new(SAFEPOINT_NONE)),
            parked: AtomicUsize::new(0),
            registered: AtomicUsize::new(0),
            threads: Mutex::new(HashSet::new()),
        }
    }

    /// Ask all registered mutators to park
    pub fn request(&self) {
        self.state.store(SAFEPOINT_REQUESTED, Ordering::SeqCst);
    }

    /// Spin until every registered mutator has parked
    ///
    /// Returns how long the wait took.
    ///
    /// # Errors
    /// `ZoneError::Timeout` if `timeout` elapses first. The request stays
    /// pending; the caller decides whether to release.
    pub fn wait_for_mutators(&self, timeout: Duration) -> Result<Duration> {
        let start = Instant::now();
        let backoff = Backoff::new();

        while self.parked.load(Ordering::Acquire) < self.registered.load(Ordering::SeqCst) {
            if start.elapsed() >= timeout {
                return Err(ZoneError::Timeout(format!(
                    "{} of {} mutators reached the safepoint within {:?}",
                    self.parked.load(Ordering::Acquire),
                    self.registered.load(Ordering::Acquire),
                    timeout
                )));
            }

            if backoff.is_completed() {
                std::thread::yield_now();
            } else {
                backoff.snooze();
            }
        }

        Ok(start.elapsed())
    }

    /// Resume all parked mutators
    ///
    /// Publishes every store made since `request`.
    pub fn release(&self) {
        self.state.store(SAFEPOINT_NONE, Ordering::Release);
    }

    /// Check if a safepoint is requested
    #[inline(always)]
    pub fn is_requested(&self) -> bool {
        self.state.load(Ordering::Acquire) != SAFEPOINT_NONE
    }

    /// Park the calling mutator until the driver releases the safepoint
    ///
    /// A mutator that misses one release and is still parked when the next
    /// window is requested counts as parked for that window too.
    pub fn block_until_released(&self) {
        self.parked.fetch_add(1, Ordering::AcqRel);

        let backoff = Backoff::new();
        while self.state.load(Ordering::Acquire) != SAFEPOINT_NONE {
            if backoff.is_completed() {
                std::thread::yield_now();
            } else {
                backoff.snooze();
            }
        }

        self.parked.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn registered_mutators(&self) -> usize {
        self.registered.load(Ordering::Acquire)
    }

    pub fn parked_mutators(&self) -> usize {
        self.parked.load(Ordering::Acquire)
    }

    /// Count the calling thread as a mutator
    ///
    /// Parks right away if a window is open: the driver may have read the
    /// registered count before this increment.
    ///
    /// # Panics
    /// Panics if the calling thread is already registered. A thread parks
    /// once per window, so a second registration could never be matched.
    #[track_caller]
    pub(crate) fn register(&self) -> ThreadId {
        let thread = thread::current().id();
        let inserted = self.threads.lock().insert(thread);
        crate::assert_context!(
            inserted,
            "thread {:?} is already registered as a mutator",
            thread
        );

        self.registered.fetch_add(1, Ordering::SeqCst);
        if self.state.load(Ordering::SeqCst) != SAFEPOINT_NONE {
            self.block_until_released();
        }
        thread
    }

    pub(crate) fn unregister(&self, thread: ThreadId) {
        if self.threads.lock().remove(&thread) {
            self.registered.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl Default for Safepoint {
    fn default() -> Self {
        Self::new()
    }
}

/// MutatorGuard - registration of one mutator thread with a runtime
///
/// Created by [`crate::Runtime::register_mutator`]; unregisters on drop.
/// The thread must call [`MutatorGuard::poll`] regularly (allocation slow
/// paths, loop back-edges) so the driver can open safepoint windows.
///
/// The guard is `!Send`: it belongs to the thread that registered.
pub struct MutatorGuard {
    runtime: Arc<super::Runtime>,
    thread: ThreadId,
    _not_send: PhantomData<*const ()>,
}

impl MutatorGuard {
    #[track_caller]
    pub(crate) fn new(runtime: Arc<super::Runtime>) -> Self {
        let thread = runtime.safepoint().register();
        Self {
            runtime,
            thread,
            _not_send: PhantomData,
        }
    }

    /// Park if a safepoint is requested
    ///
    /// Returns `true` if the thread parked.
    #[inline]
    pub fn poll(&self) -> bool {
        let safepoint = self.runtime.safepoint();
        if safepoint.is_requested() {
            safepoint.block_until_released();
            return true;
        }
        false
    }
}

impl Drop for MutatorGuard {
    fn drop(&mut self) {
        self.runtime.safepoint().unregister(self.thread);
    }
}
