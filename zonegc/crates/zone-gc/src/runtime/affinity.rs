//! Thread Affinity - Owning Thread Checks
//!
//! A runtime has exactly one thread allowed to mutate collector state. Which
//! thread that is comes from the embedder's thread registration facility,
//! modeled here as the [`ThreadRegistration`] trait.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Thread registration collaborator
///
/// Only the "is the calling thread the owner" predicate is consumed. It
/// should answer true on at most one thread at a time. A looser answer
/// weakens the affinity panics but the zone state stays race free.
pub trait ThreadRegistration: Send + Sync {
    fn is_calling_thread_owner(&self) -> bool;
}

/// Default registration: the thread that constructed it owns the runtime
#[derive(Debug, Clone, Copy)]
pub struct OwnerThread {
    owner: ThreadId,
}

impl OwnerThread {
    /// Record the calling thread as owner
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }
}

impl ThreadRegistration for OwnerThread {
    #[inline]
    fn is_calling_thread_owner(&self) -> bool {
        thread::current().id() == self.owner
    }
}

/// ThreadAffinityGuard - owning-thread predicate shared by a runtime and its zones
#[derive(Clone)]
pub struct ThreadAffinityGuard {
    registration: Arc<dyn ThreadRegistration>,
}

impl ThreadAffinityGuard {
    pub fn new(registration: Arc<dyn ThreadRegistration>) -> Self {
        Self { registration }
    }

    /// Whether the calling thread is the owning thread
    #[inline]
    pub fn is_owner(&self) -> bool {
        self.registration.is_calling_thread_owner()
    }

    /// Abort unless the calling thread is the owning thread
    ///
    /// # Panics
    /// Panics with `what` and the calling thread in the message.
    #[inline]
    #[track_caller]
    pub fn assert_owner(&self, what: &str) {
        crate::assert_context!(
            self.is_owner(),
            "{} requires the runtime's owning thread (called from {:?})",
            what,
            thread::current().id()
        );
    }
}

impl fmt::Debug for ThreadAffinityGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadAffinityGuard")
            .field("is_owner", &self.is_owner())
            .finish()
    }
}
