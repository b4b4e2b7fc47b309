//! Stack Scanning - Conservative Root Scan over a Stack Walker
//!
//! The collector does not know the frame layout of managed or native code.
//! An embedder-supplied [`StackWalker`] turns a [`FrameCursor`] into the next
//! [`Frame`] and reports whether that step crossed a managed/native boundary.
//! [`ConservativeRootScan`] drives the walk and treats every frame word that
//! looks like a heap pointer as a potential root.
//!
//! ## Frame Pointer Tagging
//!
//! A frame pointer saved by an exit stub (managed code calling out) or a
//! native-to-managed entry stub carries a tag in its low bit. Real frame
//! pointers are at least 2-byte aligned, so the bit is free.
//!
//! ## False Positive Reduction
//!
//! Candidates must be:
//! 1. **8-byte aligned**
//! 2. **Inside the heap range** given to the scanner

use std::ops::Range;

/// Direction of a boundary crossed between two frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Managed code called into native code
    ManagedToNative,
    /// Native code called into managed code
    NativeToManaged,
}

/// Position in a stack walk: a frame pointer, possibly tagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameCursor(usize);

impl FrameCursor {
    /// Low bit marks an exit or entry frame pointer
    pub const EXIT_OR_ENTRY_TAG: usize = 0x1;

    /// End of the stack
    pub const NULL: FrameCursor = FrameCursor(0);

    pub const fn new(fp: usize) -> Self {
        Self(fp)
    }

    /// Cursor for a frame pointer saved by an exit or entry stub
    ///
    /// # Panics
    /// Panics if `fp` already carries the tag.
    pub fn tagged(fp: usize) -> Self {
        crate::assert_context!(
            fp & Self::EXIT_OR_ENTRY_TAG == 0,
            "frame pointer {:#x} is already tagged",
            fp
        );
        Self(fp | Self::EXIT_OR_ENTRY_TAG)
    }

    #[inline]
    pub fn is_exit_or_entry(self) -> bool {
        self.0 & Self::EXIT_OR_ENTRY_TAG != 0
    }

    /// Frame pointer with the tag stripped
    #[inline]
    pub fn untagged(self) -> usize {
        self.0 & !Self::EXIT_OR_ENTRY_TAG
    }

    #[inline]
    pub fn raw(self) -> usize {
        self.0
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.untagged() == 0
    }
}

/// One stack frame as seen by the walker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Untagged frame pointer of this frame
    pub fp: usize,
    /// Return address into the caller
    pub return_address: usize,
    /// Where the walk continues
    pub caller: FrameCursor,
}

/// Stack walker collaborator
pub trait StackWalker {
    /// Frame at `cursor`, and the boundary crossed to reach it, if any
    ///
    /// `None` ends the walk.
    fn next_frame(&self, cursor: FrameCursor) -> Option<(Frame, Option<Boundary>)>;

    /// Words of `frame` that may hold heap pointers
    fn frame_words(&self, _frame: &Frame, _visit: &mut dyn FnMut(usize)) {}
}

/// Result of a conservative root scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub frames: usize,
    pub managed_to_native: usize,
    pub native_to_managed: usize,
    /// Words reported to the visitor
    pub candidates: usize,
    /// Words rejected by the alignment or range filter
    pub rejected: usize,
    /// Walk stopped at the frame limit instead of the stack end
    pub truncated: bool,
}

impl ScanSummary {
    pub fn boundary_crossings(&self) -> usize {
        self.managed_to_native + self.native_to_managed
    }
}

/// ConservativeRootScan - frame iteration plus candidate filtering
///
/// # Examples
///
/// ```rust
/// use zone_gc::marker::stack_scan::{
///     Boundary, ConservativeRootScan, Frame, FrameCursor, StackWalker,
/// };
///
/// struct OneFrame;
///
/// impl StackWalker for OneFrame {
///     fn next_frame(&self, cursor: FrameCursor) -> Option<(Frame, Option<Boundary>)> {
///         (cursor.untagged() == 0x7000).then(|| {
///             let frame = Frame { fp: 0x7000, return_address: 0x40, caller: FrameCursor::NULL };
///             (frame, None)
///         })
///     }
///
///     fn frame_words(&self, _frame: &Frame, visit: &mut dyn FnMut(usize)) {
///         visit(0x1_0008);
///         visit(0x42);
///     }
/// }
///
/// let scan = ConservativeRootScan::new(0x1_0000..0x2_0000);
/// let mut roots = Vec::new();
/// let summary = scan.run(&OneFrame, FrameCursor::new(0x7000), |w| roots.push(w));
///
/// assert_eq!(summary.frames, 1);
/// assert_eq!(roots, vec![0x1_0008]);
/// ```
#[derive(Debug, Clone)]
pub struct ConservativeRootScan {
    heap: Range<usize>,
    max_frames: usize,
}

impl ConservativeRootScan {
    pub const DEFAULT_MAX_FRAMES: usize = 1 << 16;
    const WORD_ALIGNMENT: usize = 8;

    pub fn new(heap: Range<usize>) -> Self {
        Self {
            heap,
            max_frames: Self::DEFAULT_MAX_FRAMES,
        }
    }

    /// Bound the walk; protects against cyclic frame chains
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Whether `word` could be a pointer into the heap
    #[inline]
    pub fn is_candidate(&self, word: usize) -> bool {
        word % Self::WORD_ALIGNMENT == 0 && self.heap.contains(&word)
    }

    /// Walk from `start`, reporting each candidate word to `visit`
    pub fn run<W, F>(&self, walker: &W, start: FrameCursor, mut visit: F) -> ScanSummary
    where
        W: StackWalker + ?Sized,
        F: FnMut(usize),
    {
        let mut summary = ScanSummary::default();
        let mut cursor = start;

        while !cursor.is_null() {
            if summary.frames >= self.max_frames {
                summary.truncated = true;
                break;
            }

            let Some((frame, boundary)) = walker.next_frame(cursor) else {
                break;
            };

            summary.frames += 1;
            match boundary {
                Some(Boundary::ManagedToNative) => summary.managed_to_native += 1,
                Some(Boundary::NativeToManaged) => summary.native_to_managed += 1,
                None => {}
            }

            walker.frame_words(&frame, &mut |word| {
                if self.is_candidate(word) {
                    summary.candidates += 1;
                    visit(word);
                } else {
                    summary.rejected += 1;
                }
            });

            cursor = frame.caller;
        }

        log::trace!(
            "conservative scan: {} frames, {} crossings, {} candidates",
            summary.frames,
            summary.boundary_crossings(),
            summary.candidates
        );

        summary
    }
}
