//! Segregated Free-List Index.
//!
//! Fifteen free-list heads. Classes 1..14 are doubly-linked (next at
//! offset 0, prev at offset 1 word into the payload) so deletion anywhere
//! in the list is O(1). Class 0 (minimum-size, 16 bytes) has room for only
//! one link field, so it is a singly-linked list and deletion of an
//! interior node is a linear scan — acceptable because minimum blocks are
//! small and, in practice, rare in the search path (original spec §4.3,
//! §9).
//!
//! Deleted nodes have their link fields poisoned in debug builds so a
//! dangling free-list pointer used after being unlinked shows up as an
//! obviously bogus address under [`crate::checkheap`] rather than
//! silently working by accident.

use core::ptr::NonNull;

use crate::sizeclass::{self, NUM_CLASSES};

/// Sentinel written into cleared link fields in debug builds.
#[cfg(debug_assertions)]
const POISON: usize = 0xF4EE_1157_DEAD_0BAD;

#[inline]
unsafe fn read_link(node: NonNull<u8>, offset: usize) -> Option<NonNull<u8>> {
    let raw = unsafe { node.cast::<usize>().add(offset).read() };
    NonNull::new(raw as *mut u8)
}

#[inline]
unsafe fn write_link(node: NonNull<u8>, offset: usize, value: Option<NonNull<u8>>) {
    let raw = value.map_or(0, |p| p.as_ptr() as usize);
    unsafe { node.cast::<usize>().add(offset).write(raw) };
}

#[cfg(debug_assertions)]
#[inline]
unsafe fn poison_links(node: NonNull<u8>, doubly_linked: bool) {
    unsafe { node.cast::<usize>().write(POISON) };
    if doubly_linked {
        unsafe { node.cast::<usize>().add(1).write(POISON) };
    }
}

#[cfg(not(debug_assertions))]
#[inline]
unsafe fn poison_links(_node: NonNull<u8>, _doubly_linked: bool) {}

/// The 15 free-list heads, indexed by size class.
pub struct FreeListIndex {
    heads: [Option<NonNull<u8>>; NUM_CLASSES],
}

impl FreeListIndex {
    pub const fn new() -> Self {
        Self {
            heads: [None; NUM_CLASSES],
        }
    }

    /// Head of a given class's list, for `find_fit` and [`crate::checkheap`].
    pub fn head(&self, class: usize) -> Option<NonNull<u8>> {
        self.heads[class]
    }

    /// Insert a free block's payload pointer at the head of its size
    /// class's list (LIFO).
    ///
    /// # Safety
    /// `payload` must point to a free block's payload area, large enough
    /// to hold the link field(s) for its class, not already on any list.
    pub unsafe fn insert(&mut self, payload: NonNull<u8>, size: usize) {
        let class = sizeclass::classify(size);
        let old_head = self.heads[class];

        if sizeclass::is_minimum_class(class) {
            unsafe { write_link(payload, 0, old_head) };
        } else {
            unsafe { write_link(payload, 0, old_head) }; // next
            unsafe { write_link(payload, 1, None) }; // prev
            if let Some(old) = old_head {
                unsafe { write_link(old, 1, Some(payload)) };
            }
        }

        self.heads[class] = Some(payload);
    }

    /// Remove a specific free block from its size class's list.
    ///
    /// # Safety
    /// `payload` must currently be on the list for `size`'s class.
    pub unsafe fn remove(&mut self, payload: NonNull<u8>, size: usize) {
        let class = sizeclass::classify(size);

        if sizeclass::is_minimum_class(class) {
            let mut cursor = self.heads[class];
            let mut prev: Option<NonNull<u8>> = None;
            while let Some(node) = cursor {
                let next = unsafe { read_link(node, 0) };
                if node == payload {
                    match prev {
                        Some(p) => unsafe { write_link(p, 0, next) },
                        None => self.heads[class] = next,
                    }
                    unsafe { poison_links(node, false) };
                    return;
                }
                prev = Some(node);
                cursor = next;
            }
            debug_assert!(false, "minimum-class block not found in its free list");
        } else {
            let next = unsafe { read_link(payload, 0) };
            let prev = unsafe { read_link(payload, 1) };

            match prev {
                Some(p) => unsafe { write_link(p, 0, next) },
                None => self.heads[class] = next,
            }
            if let Some(n) = next {
                unsafe { write_link(n, 1, prev) };
            }
            unsafe { poison_links(payload, true) };
        }
    }

    /// Iterate the payload pointers of a class's free list, front to back.
    /// Used by `find_fit` and [`crate::checkheap`].
    pub fn iter_class(&self, class: usize) -> FreeListIter<'_> {
        FreeListIter {
            _index: self,
            cursor: self.heads[class],
        }
    }
}

/// Raw next-link read, exposed only so [`crate::checkheap`] can run
/// tortoise-and-hare cycle detection without going through the (cycle-unsafe)
/// [`FreeListIter`].
///
/// # Safety
/// `node` must point to a live free-list node.
pub(crate) unsafe fn raw_next(node: NonNull<u8>) -> Option<NonNull<u8>> {
    unsafe { read_link(node, 0) }
}

/// Raw prev-link read, exposed only so [`crate::checkheap`] can verify
/// doubly-linked list symmetry. Meaningless for the singly-linked minimum
/// class; callers must not invoke this on class 0 nodes.
///
/// # Safety
/// `node` must point to a live, non-minimum-class free-list node.
pub(crate) unsafe fn raw_prev(node: NonNull<u8>) -> Option<NonNull<u8>> {
    unsafe { read_link(node, 1) }
}

impl Default for FreeListIndex {
    fn default() -> Self {
        Self::new()
    }
}

pub struct FreeListIter<'a> {
    _index: &'a FreeListIndex,
    cursor: Option<NonNull<u8>>,
}

impl Iterator for FreeListIter<'_> {
    type Item = NonNull<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor?;
        self.cursor = unsafe { read_link(node, 0) };
        Some(node)
    }
}
