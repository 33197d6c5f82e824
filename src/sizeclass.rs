//! Size-class classification for the segregated free-list index.
//!
//! Fifteen classes: class 0 is the minimum-size class; classes 1..7 are
//! exact-size classes for {32,48,64,80,96,112,128}; classes 8..14 are
//! power-of-two buckets above 128, with class 14 absorbing everything that
//! does not fit below it.

use crate::block::MIN_BLOCK_SIZE;

/// Number of free-list heads.
pub const NUM_CLASSES: usize = 15;

/// Exact-size classes 1..7, in order.
const EXACT_SIZES: [usize; 7] = [32, 48, 64, 80, 96, 112, 128];

/// Largest size covered by an exact class (class 7).
const EXACT_MAX: usize = 128;

/// Highest valid class index.
const LAST_CLASS: usize = NUM_CLASSES - 1;

/// Map a legal block size to its free-list class.
///
/// Total over all legal sizes (multiples of 16, >= [`MIN_BLOCK_SIZE`]):
/// every such size yields exactly one class in `0..NUM_CLASSES`.
#[inline]
pub fn classify(size: usize) -> usize {
    debug_assert!(size >= MIN_BLOCK_SIZE);
    debug_assert!(size % 16 == 0);

    if size == MIN_BLOCK_SIZE {
        return 0;
    }
    if size <= EXACT_MAX {
        // size is one of 32,48,64,80,96,112,128 (16-byte steps above MIN_BLOCK_SIZE).
        return 1 + EXACT_SIZES.iter().position(|&s| s == size).unwrap_or(EXACT_SIZES.len() - 1);
    }

    let log2 = usize::BITS - size.leading_zeros() - 1;
    let class = 8 + log2 as usize - 7;
    class.min(LAST_CLASS)
}

/// `true` if `class` is the singly-linked minimum-size class.
#[inline]
pub const fn is_minimum_class(class: usize) -> bool {
    class == 0
}
