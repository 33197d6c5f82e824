//! Reference [`HeapBackend`] used by this crate's own tests and by
//! embedders that have not yet wired up a real backing store.
//!
//! Analogous to `NullAudio` in the sibling emulator core: a minimal,
//! always-available stand-in for a real platform implementation, never
//! meant to be the load-bearing backend in production. The actual
//! trace-driven harness and its memory primitive are out of scope for
//! this crate (original spec §1); `VecHeapBackend` exists only so this
//! crate can exercise and test itself.

use core::ptr::NonNull;

use alloc::vec::Vec;

use crate::backend::HeapBackend;

/// A `HeapBackend` over a growable `Vec<u8>`.
///
/// `Vec` reallocation would normally invalidate previously-handed-out
/// pointers, which `HeapBackend` forbids; `VecHeapBackend` sidesteps this
/// by reserving its full capacity up front and refusing to extend past
/// it, surfacing that as ordinary backend exhaustion (`extend` returns
/// `None`) rather than ever moving memory.
pub struct VecHeapBackend {
    storage: Vec<u8>,
    used: usize,
}

impl VecHeapBackend {
    /// Create a backend with `capacity` bytes reserved up front. No bytes
    /// are handed out until [`HeapBackend::extend`] is called.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: alloc::vec![0u8; capacity],
            used: 0,
        }
    }
}

impl HeapBackend for VecHeapBackend {
    fn extend(&mut self, n: usize) -> Option<NonNull<u8>> {
        if self.used + n > self.storage.len() {
            return None;
        }
        let ptr = unsafe { self.storage.as_mut_ptr().add(self.used) };
        self.used += n;
        NonNull::new(ptr)
    }

    fn heap_lo(&self) -> *const u8 {
        self.storage.as_ptr()
    }

    fn heap_hi(&self) -> *const u8 {
        unsafe { self.storage.as_ptr().add(self.used) }
    }
}
