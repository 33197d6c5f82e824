//! Structured diagnostics for [`crate::checkheap`] failures.
//!
//! `checkheap` itself keeps the spec-mandated `bool` return (original
//! spec §6) so it drops into the classic harness contract unchanged; this
//! module is the typed detail behind that bool for embedders that want
//! more than pass/fail.

use core::fmt;

/// Which invariant (original spec §3, I1–I7) a [`CheckError`] reports a
/// violation of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invariant {
    /// I1: header/footer size or alloc mismatch.
    HeaderFooterMismatch,
    /// I2: `prev_alloc`/`prev_min` bits disagree with the physical predecessor.
    PrevFlagsMismatch,
    /// I3: two physically adjacent free blocks.
    AdjacentFreeBlocks,
    /// I4: a free block missing from its class's list, or an allocated
    /// block found on one.
    FreeListMembership,
    /// I5: a free-list entry's size does not map to the class it is on.
    WrongSizeClass,
    /// I6: `next`/`prev` pointers in a free list are inconsistent.
    BrokenLinks,
    /// I6 (cycle variant): a free list class contains a cycle.
    CyclicFreeList,
    /// I7: a block address fell outside `[heap_lo, heap_hi]`.
    OutOfBounds,
    /// Prologue or epilogue sentinel missing or malformed.
    BadSentinel,
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Invariant::HeaderFooterMismatch => "header/footer disagree on size or alloc state",
            Invariant::PrevFlagsMismatch => "prev_alloc/prev_min bits disagree with predecessor",
            Invariant::AdjacentFreeBlocks => "two physically adjacent free blocks",
            Invariant::FreeListMembership => "free-list membership does not match alloc state",
            Invariant::WrongSizeClass => "free-list entry's size does not match its class",
            Invariant::BrokenLinks => "free-list next/prev pointers are inconsistent",
            Invariant::CyclicFreeList => "free-list class contains a cycle",
            Invariant::OutOfBounds => "block address outside heap bounds",
            Invariant::BadSentinel => "prologue or epilogue sentinel is malformed",
        };
        f.write_str(msg)
    }
}

/// Detail behind a failed [`crate::heap::Heap::checkheap`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckError {
    pub invariant: Invariant,
    /// Address of the offending block's header, if applicable.
    pub at: usize,
    /// Call-site line number passed to `checkheap`, for harness parity.
    pub line: u32,
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checkheap failed at line {}: {} (block at {:#x})",
            self.line, self.invariant, self.at
        )
    }
}

/// Snapshot of heap occupancy, useful for utilization measurement by an
/// external harness without exposing internal pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
    pub heap_size: usize,
    pub allocated_bytes: usize,
    pub free_bytes: usize,
    pub allocated_blocks: usize,
    pub free_blocks: usize,
}
