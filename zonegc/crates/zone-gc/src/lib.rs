//! # zone-gc - Per-Zone Collection Phase Coordination
//!
//! zone-gc tracks where each heap partition ("zone") stands in a garbage
//! collection cycle, and gates the write barrier that incremental marking
//! depends on. Marking, sweeping and compaction algorithms live elsewhere;
//! this crate is the state they coordinate through.
//!
//! ## Overview
//!
//! - **Phase state machine**: every zone carries a [`GcPhase`], readable from
//!   any thread with one relaxed load
//! - **Write-barrier gate**: [`Zone::needs_barrier`] is the fast-path check;
//!   [`barrier::pre_write_barrier`] hands overwritten pointers to the active
//!   [`Tracer`]
//! - **Thread affinity**: collector-internal state is only touched on the
//!   runtime's owning thread, checked at runtime
//! - **Collection driver**: [`CollectionDriver`] is the only way to change
//!   phases, and publishes every change inside a safepoint window
//! - **Root scanning**: [`marker::ConservativeRootScan`] walks mutator stacks
//!   through an embedder-supplied [`marker::StackWalker`]
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use zone_gc::{barrier::pre_write_barrier, GcConfig, Runtime, Tracer, ZoneKind};
//!
//! struct Marker;
//! impl Tracer for Marker {
//!     fn trace_edge(&self, target: usize) {
//!         println!("gray {:#x}", target);
//!     }
//! }
//!
//! fn main() -> Result<(), zone_gc::ZoneError> {
//!     let runtime = Runtime::new(GcConfig::default())?;
//!     let zone = runtime.new_zone(ZoneKind::Ordinary)?;
//!     let tracer: Arc<dyn Tracer> = Arc::new(Marker);
//!
//!     let mut driver = runtime.driver()?;
//!     driver.begin_cycle(&[zone.id()])?;
//!     driver.start_marking(&tracer)?;
//!
//!     // Mutator overwrites a pointer: the old value reaches the tracer
//!     pre_write_barrier(&zone, 0x1000);
//!
//!     driver.start_sweeping()?;
//!     driver.finish()?;
//!     driver.end_cycle()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Phase Order
//!
//! ```text
//! NoGC ─▶ Prepare ─▶ MarkBlackOnly ─▶ MarkBlackAndGray ─▶ Sweep ─▶ Finished ─▶ Compact
//!  ▲                       │                               ▲         │           │
//!  │                       └───────────────────────────────┘         │           │
//!  └─────────────────────────────────────────────────────────────────┴───────────┘
//! ```
//!
//! The write barrier is active exactly while a zone is marking.
//!
//! ## Thread Safety
//!
//! - `Runtime` and `Zone` are `Send + Sync`
//! - Phase and barrier queries work from any thread
//! - `Zone::active_tracer`, `Zone::runtime_checked`, zone creation and the
//!   collection driver require the owning thread and panic elsewhere
//! - Mutator threads register with [`Runtime::register_mutator`] and poll
//!   for safepoints
//!
//! ## Modules
//!
//! - [`barrier`]: Write-barrier gate and the `Tracer` interface
//! - [`config`]: Configuration parameters and validation
//! - [`error`]: Error types and assertion macros
//! - [`logging`]: Structured event log
//! - [`marker`]: Stack walking and conservative root scanning
//! - [`runtime`]: Zone registry, thread affinity, safepoints, collection driver
//! - [`stats`]: Per-cycle timings
//! - [`zone`]: Zones, phases and zone kinds

// Core types
pub mod config;
pub mod error;
pub mod zone;

// Collector interfaces
pub mod barrier;
pub mod marker;

// Runtime and monitoring
pub mod logging;
pub mod runtime;
pub mod stats;

// Re-export main types for convenience
pub use barrier::{pre_write_barrier, Tracer};
pub use config::GcConfig;
pub use error::{Result, ZoneError};
pub use runtime::{CollectionDriver, MutatorGuard, Runtime};
pub use stats::CycleStats;
pub use zone::{GcPhase, Zone, ZoneId, ZoneKind};

use std::sync::Arc;

/// zone-gc version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Create a runtime with configuration taken from `ZONEGC_*` variables
///
/// The calling thread becomes the runtime's owning thread.
///
/// # Examples
///
/// ```rust
/// let runtime = zone_gc::init()?;
/// assert_eq!(runtime.zone_count(), 0);
/// # Ok::<(), zone_gc::ZoneError>(())
/// ```
pub fn init() -> Result<Arc<Runtime>> {
    Runtime::new(GcConfig::from_env())
}

/// Create a runtime with a custom configuration
///
/// # Examples
///
/// ```rust
/// use zone_gc::GcConfig;
///
/// let config = GcConfig {
///     max_zones: 16,
///     safepoint_timeout_ms: 50,
///     ..Default::default()
/// };
///
/// let runtime = zone_gc::init_with_config(config)?;
/// assert_eq!(runtime.config().max_zones, 16);
/// # Ok::<(), zone_gc::ZoneError>(())
/// ```
pub fn init_with_config(config: GcConfig) -> Result<Arc<Runtime>> {
    Runtime::new(config)
}
