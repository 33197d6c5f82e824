//! Placement Engine — `find_fit` and `split_block`.
//!
//! `find_fit` walks the segregated index starting at the requested size's
//! own class: first-fit for the first five (small) classes, a *bounded*
//! better-fit scan for the rest (original spec §4.4). The bound exists so
//! a pathological free list in one class cannot make a single `malloc`
//! call scan arbitrarily far — it trades a small amount of utilization for
//! a hard cap on search cost.

use core::ptr::NonNull;

use crate::block;
use crate::freelist::FreeListIndex;
use crate::sizeclass::{self, NUM_CLASSES};
use crate::walker;

/// Classes below this index use plain first-fit. Classes at or above it
/// use bounded better-fit.
const FIRST_FIT_CLASS_BOUND: usize = 5;

/// Read a free block's size from its free-list payload pointer.
#[inline]
unsafe fn block_size_at(payload: NonNull<u8>) -> usize {
    let header = block::payload_to_header(payload);
    block::size(unsafe { walker::read_header(header) })
}

/// Find a free block able to hold `asize` bytes, or `None`.
///
/// # Safety
/// Every pointer reachable through `index`'s lists must point at a live
/// free block's payload.
pub unsafe fn find_fit(
    index: &FreeListIndex,
    asize: usize,
    scan_limit: usize,
) -> Option<NonNull<u8>> {
    let start_class = sizeclass::classify(asize);

    if start_class < FIRST_FIT_CLASS_BOUND {
        for class in start_class..NUM_CLASSES {
            for payload in index.iter_class(class) {
                if unsafe { block_size_at(payload) } >= asize {
                    return Some(payload);
                }
            }
        }
        return None;
    }

    let mut best: Option<(NonNull<u8>, usize)> = None;
    for class in start_class..NUM_CLASSES {
        let mut considered = 0usize;
        for payload in index.iter_class(class) {
            let size = unsafe { block_size_at(payload) };
            if size < asize {
                continue;
            }
            if size == asize {
                return Some(payload);
            }
            if best.is_none_or(|(_, best_size)| size < best_size) {
                best = Some((payload, size));
            }
            considered += 1;
            if best.is_some() && considered >= scan_limit {
                break;
            }
        }
        if best.is_some() {
            break;
        }
    }
    best.map(|(payload, _)| payload)
}

/// Split an allocated block at `header` (currently sized `block_size`) so
/// that exactly `asize` bytes remain allocated, carving the residue into a
/// new free block when the residue is at least the minimum block size.
///
/// Returns the new free block's header, if a split occurred. The caller
/// is responsible for inserting it into the free-list index.
///
/// # Safety
/// `header` must be a live, currently-allocated block of size
/// `block_size >= asize`, and `header + asize .. header + block_size`
/// must be writable.
pub unsafe fn split_block(
    header: NonNull<u8>,
    block_size: usize,
    asize: usize,
) -> Option<NonNull<u8>> {
    let residue = block_size - asize;
    if residue < block::MIN_BLOCK_SIZE {
        return None;
    }

    let word = unsafe { walker::read_header(header) };
    let shrunk = block::with_size_and_alloc(word, asize, true);
    unsafe { walker::write_header(header, shrunk) };

    let new_header = unsafe { header.add(asize) };
    let new_word = block::pack(residue, false, true, asize == block::MIN_BLOCK_SIZE);
    unsafe { walker::write_header(new_header, new_word) };
    if residue > block::MIN_BLOCK_SIZE {
        unsafe { walker::write_footer(new_header, residue) };
    }

    // Propagate prev_alloc/prev_min into the block after the residue.
    let after = unsafe { walker::find_next(new_header, new_word) };
    let after_word = unsafe { walker::read_header(after) };
    let after_word = block::with_prev_flags(after_word, false, residue == block::MIN_BLOCK_SIZE);
    unsafe { walker::write_header(after, after_word) };

    Some(new_header)
}
