//! Heap Walker — locate a block's physical neighbors.
//!
//! `find_next` is unconditional pointer arithmetic. `find_prev` is only
//! safe to call when the caller has already established (via the current
//! block's `prev_alloc` bit) that the predecessor is free; an allocated
//! predecessor has no footer to read and its boundary is never needed by
//! the coalescing engine.

use core::ptr::NonNull;

use crate::block::{self, WORD_SIZE};

/// Read the header word at `header`.
///
/// # Safety
/// `header` must point to a valid, readable header word.
#[inline]
pub unsafe fn read_header(header: NonNull<u8>) -> u64 {
    unsafe { header.cast::<u64>().read() }
}

/// Write the header word at `header`.
///
/// # Safety
/// `header` must point to a valid, writable header word.
#[inline]
pub unsafe fn write_header(header: NonNull<u8>, word: u64) {
    unsafe { header.cast::<u64>().write(word) }
}

/// Read the footer word immediately preceding `header` (the predecessor's
/// footer, when the predecessor is free and non-minimum).
///
/// # Safety
/// The word at `header - WORD_SIZE` must be a valid, readable footer.
#[inline]
pub unsafe fn read_footer_before(header: NonNull<u8>) -> u64 {
    unsafe { header.cast::<u64>().sub(1).read() }
}

/// Write the footer word for a free, non-minimum block whose header sits
/// at `header` and whose size is `size`.
///
/// # Safety
/// `header .. header + size` must be valid, writable memory.
#[inline]
pub unsafe fn write_footer(header: NonNull<u8>, size: usize) {
    let footer = unsafe { header.add(size - WORD_SIZE) };
    unsafe { write_header(footer, read_header(header)) };
}

/// Return the physically next block, given this block's header word.
///
/// Precondition: `header` does not denote the epilogue.
///
/// # Safety
/// `header + block::size(word)` must be a valid header address.
#[inline]
pub unsafe fn find_next(header: NonNull<u8>, word: u64) -> NonNull<u8> {
    unsafe { header.add(block::size(word)) }
}

/// Return the physical predecessor of the block at `header`, whose header
/// word is `word`.
///
/// Precondition: `!block::is_prev_alloc(word)` — callers must check this
/// bit before calling; an allocated predecessor's boundary cannot be
/// located (it has no footer) and must never be walked to.
///
/// # Safety
/// If `block::is_prev_min(word)`, `header - MIN_BLOCK_SIZE` must be a
/// valid header. Otherwise the word at `header - WORD_SIZE` must be a
/// valid footer whose encoded size locates a valid header.
#[inline]
pub unsafe fn find_prev(header: NonNull<u8>, word: u64) -> NonNull<u8> {
    debug_assert!(
        !block::is_prev_alloc(word),
        "find_prev called with an allocated (footerless) predecessor"
    );
    if block::is_prev_min(word) {
        unsafe { header.sub(block::MIN_BLOCK_SIZE) }
    } else {
        let prev_footer = unsafe { read_footer_before(header) };
        unsafe { header.sub(block::size(prev_footer)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::pack;
    use alloc::alloc::{alloc, dealloc, Layout};

    fn layout(n: usize) -> Layout {
        Layout::from_size_align(n, 16).unwrap()
    }

    #[test]
    fn find_next_advances_by_size() {
        let lay = layout(64);
        let base = unsafe { NonNull::new(alloc(lay)).unwrap() };
        let word = pack(32, true, true, false);
        let next = unsafe { find_next(base, word) };
        assert_eq!(next.as_ptr() as usize, base.as_ptr() as usize + 32);
        unsafe { dealloc(base.as_ptr(), lay) };
    }

    #[test]
    fn find_prev_via_minimum_predecessor() {
        let lay = layout(64);
        let base = unsafe { NonNull::new(alloc(lay)).unwrap() };
        let cur = unsafe { base.add(16) };
        let word = pack(32, true, false, true);
        let prev = unsafe { find_prev(cur, word) };
        assert_eq!(prev, base);
        unsafe { dealloc(base.as_ptr(), lay) };
    }

    #[test]
    fn find_prev_via_footer() {
        let lay = layout(64);
        let base = unsafe { NonNull::new(alloc(lay)).unwrap() };
        let prev_word = pack(48, false, true, false);
        unsafe { write_header(base, prev_word) };
        unsafe { write_footer(base, 48) };
        let cur = unsafe { base.add(48) };
        let word = pack(16, true, false, false);
        let prev = unsafe { find_prev(cur, word) };
        assert_eq!(prev, base);
        unsafe { dealloc(base.as_ptr(), lay) };
    }
}
