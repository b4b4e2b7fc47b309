//! Marker Module - Root Discovery Interfaces
//!
//! The mark/trace algorithm itself lives outside this crate. What the
//! collector needs from here is the conservative stack scan that seeds it
//! with roots while a zone is marking.

pub mod stack_scan;

pub use stack_scan::{
    Boundary, ConservativeRootScan, Frame, FrameCursor, ScanSummary, StackWalker,
};
