//! Top-Level Operations: `malloc`, `free`, `realloc`, `calloc`, and `init`.
//!
//! [`Heap`] owns the free-list index and a generic [`HeapBackend`], and
//! wires the lower-level modules together into the public allocator
//! surface. Mirrors the `Emulator` struct in the sibling core this crate
//! grew out of: one top-level owner type, generic over the host-provided
//! collaborators, with the actual component logic living in their own
//! modules rather than inlined here.
//!
//! None of these operations propagate `Result` — `malloc`/`calloc`/`realloc`
//! return `None` on failure (out-of-heap) the same way the C calling
//! convention they model returns a null pointer, and `free` is infallible.
//! Only [`HeapConfig::validate`](crate::config::HeapConfig::validate), a
//! construction-time step, uses `Result`.

use core::ptr::NonNull;

use crate::backend::{BytePoison, HeapBackend, NoPoison};
use crate::block;
use crate::checkheap;
use crate::coalesce;
use crate::config::{ConfigError, HeapConfig};
use crate::diagnostics::{CheckError, HeapStats};
use crate::freelist::FreeListIndex;
use crate::placement;
use crate::walker;

/// Round `n` up to the next multiple of [`block::ALIGNMENT`].
#[inline]
fn align_up(n: usize) -> usize {
    (n + (block::ALIGNMENT - 1)) & !(block::ALIGNMENT - 1)
}

/// Smallest legal block size able to hold `requested` payload bytes plus
/// this crate's one-word footerless-allocated header.
#[inline]
fn asize_for(requested: usize) -> usize {
    align_up(requested + block::WORD_SIZE).max(block::MIN_BLOCK_SIZE)
}

/// A segregated-fit allocator over a backend-provided, monotonically
/// growable region of memory.
///
/// Generic over its [`HeapBackend`] (how more memory is acquired) and,
/// optionally, a [`BytePoison`] (how payload-zeroing and payload-copying
/// writes are performed) — defaulted to [`NoPoison`] so most callers never
/// need to name it.
pub struct Heap<B: HeapBackend, P: BytePoison = NoPoison> {
    backend: B,
    poison: P,
    config: HeapConfig,
    heap_start: Option<NonNull<u8>>,
    index: FreeListIndex,
    #[cfg(debug_assertions)]
    last_check_error: Option<CheckError>,
}

impl<B: HeapBackend> Heap<B, NoPoison> {
    /// Construct an empty heap over `backend`. No memory is requested from
    /// the backend until the first `malloc`/`calloc` that needs it.
    ///
    /// Does not validate `config`; prefer [`Heap::try_new`] unless `config`
    /// is known-good (e.g. [`HeapConfig::default`]).
    pub fn new(config: HeapConfig, backend: B) -> Self {
        Self::with_poison(config, backend, NoPoison)
    }

    /// Construct an empty heap, rejecting an invalid `config` up front
    /// rather than letting it degrade behavior later.
    pub fn try_new(config: HeapConfig, backend: B) -> Result<Self, ConfigError> {
        Ok(Self::new(config.validate()?, backend))
    }
}

impl<B: HeapBackend, P: BytePoison> Heap<B, P> {
    /// Construct an empty heap with a custom [`BytePoison`] hook for
    /// `calloc`'s zero-fill and `realloc`'s copy.
    ///
    /// Does not validate `config`; prefer [`Heap::try_with_poison`] unless
    /// `config` is known-good.
    pub fn with_poison(config: HeapConfig, backend: B, poison: P) -> Self {
        Self {
            backend,
            poison,
            config,
            heap_start: None,
            index: FreeListIndex::new(),
            #[cfg(debug_assertions)]
            last_check_error: None,
        }
    }

    /// Construct an empty heap with a custom [`BytePoison`] hook,
    /// rejecting an invalid `config` up front.
    pub fn try_with_poison(config: HeapConfig, backend: B, poison: P) -> Result<Self, ConfigError> {
        Ok(Self::with_poison(config.validate()?, backend, poison))
    }

    /// Allocate at least `requested` bytes, returning `None` (the null
    /// pointer case) if `requested` is zero or the backend is exhausted.
    pub fn malloc(&mut self, requested: usize) -> Option<NonNull<u8>> {
        if requested == 0 {
            return None;
        }
        let asize = asize_for(requested);

        loop {
            if let Some(payload) =
                unsafe { placement::find_fit(&self.index, asize, self.config.better_fit_scan_limit) }
            {
                return Some(unsafe { self.place(payload, asize) });
            }
            if !self.extend_heap(asize) {
                return None;
            }
        }
    }

    /// Release a previously-`malloc`ed (or `calloc`ed/`realloc`ed)
    /// pointer. A `None` `ptr` is a no-op, mirroring `free(NULL)`.
    pub fn free(&mut self, ptr: Option<NonNull<u8>>) {
        let Some(payload) = ptr else { return };
        let header = block::payload_to_header(payload);
        let word = unsafe { walker::read_header(header) };
        debug_assert!(block::is_alloc(word), "double free or invalid free()");
        let size = block::size(word);

        let free_word = block::with_size_and_alloc(word, size, false);
        unsafe { walker::write_header(header, free_word) };

        let (merged_header, merged_size) = unsafe { coalesce::coalesce(&mut self.index, header, size) };
        unsafe { self.index.insert(block::header_to_payload(merged_header), merged_size) };
    }

    /// Resize the allocation at `ptr` to `new_size` bytes, preserving the
    /// lesser of the old and new sizes worth of payload bytes.
    ///
    /// `ptr == None` behaves as `malloc(new_size)`; `new_size == 0` behaves
    /// as `free(ptr)` and returns `None`. On allocation failure the
    /// original block is left untouched and `None` is returned.
    pub fn realloc(&mut self, ptr: Option<NonNull<u8>>, new_size: usize) -> Option<NonNull<u8>> {
        let Some(payload) = ptr else {
            return self.malloc(new_size);
        };
        if new_size == 0 {
            self.free(Some(payload));
            return None;
        }

        let header = block::payload_to_header(payload);
        let word = unsafe { walker::read_header(header) };
        let old_capacity = block::size(word) - block::WORD_SIZE;

        let new_payload = self.malloc(new_size)?;
        let copy_len = old_capacity.min(new_size);
        unsafe { self.poison.mem_copy(new_payload.as_ptr(), payload.as_ptr(), copy_len) };
        self.free(Some(payload));
        Some(new_payload)
    }

    /// Allocate space for `nmemb` elements of `size` bytes each, zeroed.
    /// Returns `None` on `nmemb * size` overflow, a zero-sized request, or
    /// allocation failure.
    pub fn calloc(&mut self, nmemb: usize, size: usize) -> Option<NonNull<u8>> {
        let total = nmemb.checked_mul(size)?;
        if total == 0 {
            return None;
        }
        let payload = self.malloc(total)?;
        unsafe { self.poison.mem_write_zero(payload.as_ptr(), total) };
        Some(payload)
    }

    /// Run the heap consistency checker (original spec's `checkheap`,
    /// I1–I7). Always returns `true` in release builds, where the checker
    /// is compiled away entirely.
    pub fn checkheap(&mut self, line: u32) -> bool {
        let result = checkheap::check(self.heap_start, &self.backend, &self.index, line);
        #[cfg(debug_assertions)]
        {
            self.last_check_error = result.err();
            self.last_check_error.is_none()
        }
        #[cfg(not(debug_assertions))]
        {
            let _ = result;
            true
        }
    }

    /// Detail behind the most recent failing [`Heap::checkheap`] call.
    /// Always `None` in release builds.
    pub fn last_check_error(&self) -> Option<CheckError> {
        #[cfg(debug_assertions)]
        {
            self.last_check_error
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    }

    /// A point-in-time snapshot of heap occupancy.
    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats::default();
        let Some(start) = self.heap_start else {
            return stats;
        };
        stats.heap_size = self.backend.heap_hi() as usize - self.backend.heap_lo() as usize;

        let mut cur = start;
        loop {
            let word = unsafe { walker::read_header(cur) };
            let size = block::size(word);
            if size == 0 {
                break;
            }
            if block::is_alloc(word) {
                stats.allocated_blocks += 1;
                stats.allocated_bytes += size;
            } else {
                stats.free_blocks += 1;
                stats.free_bytes += size;
            }
            cur = unsafe { walker::find_next(cur, word) };
        }
        stats
    }

    /// Mark a free block found by `find_fit` allocated, splitting off its
    /// residue if one is worth carving, and return its payload pointer.
    ///
    /// # Safety
    /// `payload` must be a live free block's payload pointer, currently
    /// present in `self.index` under its own size's class.
    unsafe fn place(&mut self, payload: NonNull<u8>, asize: usize) -> NonNull<u8> {
        let header = block::payload_to_header(payload);
        let word = unsafe { walker::read_header(header) };
        let size = block::size(word);
        unsafe { self.index.remove(payload, size) };

        let alloc_word = block::with_size_and_alloc(word, size, true);
        unsafe { walker::write_header(header, alloc_word) };

        match unsafe { placement::split_block(header, size, asize) } {
            Some(residue_header) => {
                let residue_word = unsafe { walker::read_header(residue_header) };
                let residue_size = block::size(residue_word);
                unsafe {
                    self.index
                        .insert(block::header_to_payload(residue_header), residue_size)
                };
            }
            None => {
                // No split: the block right after this one inherits our new
                // alloc state directly, since split_block did not already
                // propagate it into a residue block on our behalf.
                let next = unsafe { walker::find_next(header, alloc_word) };
                let next_word = unsafe { walker::read_header(next) };
                let next_word = block::with_prev_flags(next_word, true, size == block::MIN_BLOCK_SIZE);
                unsafe { walker::write_header(next, next_word) };
            }
        }

        block::header_to_payload(header)
    }

    /// Request at least `min_bytes` worth of new block from the backend and
    /// graft it onto the heap end, coalescing it with the physical
    /// predecessor there if that block was free, and inserting the result
    /// into the free-list index. Returns `false` on backend exhaustion.
    ///
    /// On the very first extension there is no epilogue yet, so a prologue
    /// footer sentinel is materialized at `heap_lo` and `heap_start` is set
    /// one word past it. On every later extension the *existing* epilogue
    /// word is overwritten in place to become the new block's header: it
    /// already sits physically adjacent to the rest of the heap, so
    /// overwriting it (instead of appending after it) keeps the heap one
    /// contiguous chain rather than stranding a zero-size allocated block
    /// between chunks, which would otherwise break a full-heap walk and make
    /// coalescing the new block with the previous chunk's tail impossible.
    /// The overwritten epilogue's own `prev_alloc`/`prev_min` bits already
    /// describe the block physically before it — which is also the new
    /// block's predecessor — so those bits simply carry over.
    fn extend_heap(&mut self, min_bytes: usize) -> bool {
        let block_size = align_up(min_bytes.max(self.config.chunk_size));

        let (new_header, prev_alloc, prev_min) = match self.heap_start {
            None => {
                let total = block::WORD_SIZE + block_size + block::WORD_SIZE;
                let Some(prologue) = self.backend.extend(total) else {
                    return false;
                };
                unsafe { walker::write_header(prologue, block::pack(0, true, false, false)) };
                let header = unsafe { prologue.add(block::WORD_SIZE) };
                self.heap_start = Some(header);
                (header, true, false)
            }
            Some(_) => {
                let old_epilogue = unsafe {
                    NonNull::new_unchecked(self.backend.heap_hi() as *mut u8).sub(block::WORD_SIZE)
                };
                let epilogue_word = unsafe { walker::read_header(old_epilogue) };
                let prev_alloc = block::is_prev_alloc(epilogue_word);
                let prev_min = block::is_prev_min(epilogue_word);

                if self.backend.extend(block_size).is_none() {
                    return false;
                }
                (old_epilogue, prev_alloc, prev_min)
            }
        };

        let word = block::pack(block_size, false, prev_alloc, prev_min);
        unsafe { walker::write_header(new_header, word) };
        if block_size > block::MIN_BLOCK_SIZE {
            unsafe { walker::write_footer(new_header, block_size) };
        }
        let new_epilogue = unsafe { new_header.add(block_size) };
        unsafe {
            walker::write_header(
                new_epilogue,
                block::pack(0, true, false, block_size == block::MIN_BLOCK_SIZE),
            )
        };

        let (merged_header, merged_size) = unsafe { coalesce::coalesce(&mut self.index, new_header, block_size) };
        unsafe {
            self.index
                .insert(block::header_to_payload(merged_header), merged_size)
        };
        true
    }
}
