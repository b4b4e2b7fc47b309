//! Error Module - Zone GC Error Types
//!
//! Defines the recoverable errors of the runtime and collection driver.
//!
//! Contract violations on the zone query surface (wrong thread, inactive
//! barrier, stale tracer) are not represented here. They abort the operation
//! through [`assert_context!`] because continuing with inconsistent collector
//! state risks silent heap corruption.
//!
//! # Error Categories
//!
//! ## Driver Errors
//! - `InvalidTransition` - Requested phase change is not in the cycle order
//! - `AlreadyCollecting` - A driver already exists for this runtime
//! - `Timeout` - Mutators did not reach the safepoint in time
//!
//! ## Registry Errors
//! - `UnknownZone` - Zone id not registered with the runtime
//! - `ZoneBusy` - Zone cannot be destroyed while a collection is in flight
//! - `ZoneLimit` - Runtime reached its configured zone count
//! - `ZoneIdsExhausted` - Every zone id of the runtime has been handed out
//!
//! ## Configuration Errors
//! - `Configuration` - Invalid configuration
//! - `InvalidArgument` - Invalid function argument

use crate::zone::{GcPhase, ZoneId};
use thiserror::Error;

/// Main error type for runtime and driver operations
///
/// # Examples
///
/// ```rust
/// use zone_gc::error::ZoneError;
///
/// fn handle_error(err: ZoneError) {
///     match err {
///         ZoneError::InvalidTransition { zone, from, to } => {
///             eprintln!("{zone}: cannot go from {from} to {to}");
///         }
///         _ => eprintln!("Other error: {err}"),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum ZoneError {
    /// Configuration error
    ///
    /// **When returned:** `GcConfig::validate` rejected the configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Illegal phase transition
    ///
    /// **When returned:** The driver was asked for a phase change that does
    /// not follow the cycle order. No zone was modified.
    ///
    /// **Recovery strategy:** Fix the caller's sequencing, or abort the cycle
    #[error("Invalid phase transition for {zone}: {from} -> {to}")]
    InvalidTransition {
        zone: ZoneId,
        from: GcPhase,
        to: GcPhase,
    },

    /// Invalid argument
    ///
    /// **Example scenarios:**
    /// - Empty collection set
    /// - Compacting only privileged zones
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Zone id not registered with this runtime
    #[error("Unknown zone: {0}")]
    UnknownZone(ZoneId),

    /// Zone is part of an in-flight collection
    ///
    /// **When returned:** `destroy_zone` on a zone whose phase is not `NoGC`
    #[error("{zone} is busy (phase {phase})")]
    ZoneBusy { zone: ZoneId, phase: GcPhase },

    /// Zone limit reached
    #[error("Zone limit reached: at most {max} zones")]
    ZoneLimit { max: usize },

    /// Zone id space used up
    ///
    /// **When returned:** `new_zone` after `u32::MAX` zones were created over
    /// the runtime's lifetime. Ids are never reused.
    #[error("Zone ids exhausted")]
    ZoneIdsExhausted,

    /// A collection driver is already active for the runtime
    #[error("A collection is already in progress")]
    AlreadyCollecting,

    /// Operation timeout
    ///
    /// **When returned:** Registered mutators did not reach the safepoint
    /// within `safepoint_timeout_ms`. Nothing was published.
    ///
    /// **Recovery strategy:** Retry, or abort the cycle
    #[error("Operation timeout: {0}")]
    Timeout(String),
}

impl ZoneError {
    /// Check if this error is recoverable by retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ZoneError::Timeout(_) | ZoneError::AlreadyCollecting)
    }

    /// Check if this error indicates a sequencing bug in the caller
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            ZoneError::InvalidTransition { .. } | ZoneError::InvalidArgument(_)
        )
    }
}

/// Result type alias for zone GC operations
pub type Result<T> = std::result::Result<T, ZoneError>;

/// Macro for assertion with context
///
/// Contract violations abort with the failed condition and a message.
#[macro_export]
macro_rules! assert_context {
    ($cond:expr, $context:expr) => {
        if !$cond {
            panic!("Assertion failed at {}: {}", stringify!($cond), $context);
        }
    };
    ($cond:expr, $context:expr, $($arg:tt)*) => {
        if !$cond {
            panic!("Assertion failed at {}: {}", stringify!($cond), format!($context, $($arg)*));
        }
    };
}

/// Ensure condition is true, otherwise return error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
