//! Heap Consistency Checker.
//!
//! Validates the invariants the rest of this crate is built to maintain:
//! a well-formed prologue footer with `heap_start` exactly one word past it,
//! matched header/footer pairs, correct `prev_alloc`/`prev_min` propagation,
//! no two adjacent free blocks, a well-formed epilogue, two-way membership
//! between the physical heap and the segregated free lists, correct
//! size-class placement, and acyclic, symmetric free-list linkage. Compiled
//! away entirely in release builds — this walks the whole heap and every
//! free list, which is far too expensive to pay for on every `malloc`/`free`
//! outside of testing.

use core::ptr::NonNull;

#[cfg(debug_assertions)]
use alloc::collections::BTreeSet;

use crate::backend::HeapBackend;
#[cfg(debug_assertions)]
use crate::block;
use crate::diagnostics::CheckError;
#[cfg(debug_assertions)]
use crate::diagnostics::Invariant;
use crate::freelist::FreeListIndex;
#[cfg(debug_assertions)]
use crate::freelist;
#[cfg(debug_assertions)]
use crate::sizeclass::{self, NUM_CLASSES};
#[cfg(debug_assertions)]
use crate::walker;

#[cfg(debug_assertions)]
fn has_cycle(head: Option<NonNull<u8>>) -> bool {
    let mut slow = head;
    let mut fast = head;
    loop {
        let Some(slow_node) = slow else { return false };
        slow = unsafe { freelist::raw_next(slow_node) };

        let Some(fast1) = fast else { return false };
        let Some(fast2) = (unsafe { freelist::raw_next(fast1) }) else {
            return false;
        };
        fast = unsafe { freelist::raw_next(fast2) };

        if let (Some(s), Some(f)) = (slow, fast) {
            if s == f {
                return true;
            }
        }
    }
}

/// Walk the physical heap and every free-list class, returning the first
/// invariant violation found, if any.
///
/// `line` is carried through into the returned [`CheckError`] purely so
/// callers can report "checkheap failed at line N" the way the classic
/// harness contract expects; it plays no role in the check itself.
#[cfg(debug_assertions)]
pub fn check<B: HeapBackend>(
    heap_start: Option<NonNull<u8>>,
    backend: &B,
    index: &FreeListIndex,
    line: u32,
) -> Result<(), CheckError> {
    let Some(start) = heap_start else {
        return Ok(());
    };
    let lo = backend.heap_lo() as usize;
    let hi = backend.heap_hi() as usize;

    let prologue_word = unsafe { walker::read_header(NonNull::new_unchecked(lo as *mut u8)) };
    if block::size(prologue_word) != 0 || !block::is_alloc(prologue_word) {
        return Err(CheckError {
            invariant: Invariant::BadSentinel,
            at: lo,
            line,
        });
    }
    if start.as_ptr() as usize != lo + block::WORD_SIZE {
        return Err(CheckError {
            invariant: Invariant::BadSentinel,
            at: start.as_ptr() as usize,
            line,
        });
    }

    let mut free_seen: BTreeSet<usize> = BTreeSet::new();
    let mut cur = start;
    let mut prev_alloc = true;
    let mut prev_min = false;

    loop {
        let addr = cur.as_ptr() as usize;
        if addr < lo || addr >= hi {
            return Err(CheckError {
                invariant: Invariant::OutOfBounds,
                at: addr,
                line,
            });
        }

        let word = unsafe { walker::read_header(cur) };
        let size = block::size(word);

        if size == 0 {
            if !block::is_alloc(word) {
                return Err(CheckError {
                    invariant: Invariant::BadSentinel,
                    at: addr,
                    line,
                });
            }
            break;
        }

        if block::is_prev_alloc(word) != prev_alloc || block::is_prev_min(word) != prev_min {
            return Err(CheckError {
                invariant: Invariant::PrevFlagsMismatch,
                at: addr,
                line,
            });
        }

        if !block::is_alloc(word) {
            if !prev_alloc {
                return Err(CheckError {
                    invariant: Invariant::AdjacentFreeBlocks,
                    at: addr,
                    line,
                });
            }
            if size > block::MIN_BLOCK_SIZE {
                let footer = unsafe { walker::read_footer_before(cur.add(size)) };
                if footer != word {
                    return Err(CheckError {
                        invariant: Invariant::HeaderFooterMismatch,
                        at: addr,
                        line,
                    });
                }
            }
            free_seen.insert(addr);
        }

        prev_alloc = block::is_alloc(word);
        prev_min = size == block::MIN_BLOCK_SIZE;
        cur = unsafe { walker::find_next(cur, word) };
    }

    for class in 0..NUM_CLASSES {
        if has_cycle(index.head(class)) {
            return Err(CheckError {
                invariant: Invariant::CyclicFreeList,
                at: 0,
                line,
            });
        }

        let mut expected_prev: Option<NonNull<u8>> = None;
        for payload in index.iter_class(class) {
            let header = block::payload_to_header(payload);
            let addr = header.as_ptr() as usize;
            let word = unsafe { walker::read_header(header) };

            if block::is_alloc(word) {
                return Err(CheckError {
                    invariant: Invariant::FreeListMembership,
                    at: addr,
                    line,
                });
            }
            if sizeclass::classify(block::size(word)) != class {
                return Err(CheckError {
                    invariant: Invariant::WrongSizeClass,
                    at: addr,
                    line,
                });
            }
            if !sizeclass::is_minimum_class(class) {
                let actual_prev = unsafe { freelist::raw_prev(payload) };
                if actual_prev != expected_prev {
                    return Err(CheckError {
                        invariant: Invariant::BrokenLinks,
                        at: addr,
                        line,
                    });
                }
            }
            expected_prev = Some(payload);

            if !free_seen.remove(&addr) {
                return Err(CheckError {
                    invariant: Invariant::FreeListMembership,
                    at: addr,
                    line,
                });
            }
        }
    }

    if let Some(&addr) = free_seen.iter().next() {
        return Err(CheckError {
            invariant: Invariant::FreeListMembership,
            at: addr,
            line,
        });
    }

    Ok(())
}

#[cfg(not(debug_assertions))]
pub fn check<B: HeapBackend>(
    _heap_start: Option<NonNull<u8>>,
    _backend: &B,
    _index: &FreeListIndex,
    _line: u32,
) -> Result<(), CheckError> {
    Ok(())
}
