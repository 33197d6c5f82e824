//! End-to-end scenarios exercising [`segfit_alloc::Heap`] as an external
//! harness would: through `malloc`/`free`/`realloc`/`calloc` only, asserting
//! `checkheap` after every mutating step. This binary links `std` even
//! though the library under test is `no_std` — the same split the sibling
//! emulator core's own `gameboy` library test modules rely on.

use segfit_alloc::{Heap, HeapConfig, VecHeapBackend};

fn new_heap() -> Heap<VecHeapBackend> {
    Heap::new(HeapConfig::default(), VecHeapBackend::with_capacity(1 << 20))
}

/// Scenario 1: a single malloc on a freshly-initialized heap produces a
/// well-formed heap (prologue boundary respected, epilogue intact).
#[test]
fn initial_malloc_shape() {
    let mut heap = new_heap();
    let p = heap.malloc(40);
    assert!(p.is_some());
    assert!(heap.checkheap(line!()));
    let stats = heap.stats();
    assert_eq!(stats.allocated_blocks, 1);
}

/// Scenario 2: freeing and re-requesting the same size hands back the same
/// block (LIFO reuse within its size class).
#[test]
fn lifo_reuse_of_freed_block() {
    let mut heap = new_heap();
    let a = heap.malloc(64).unwrap();
    heap.free(Some(a));
    assert!(heap.checkheap(line!()));
    let b = heap.malloc(64).unwrap();
    assert_eq!(a, b);
}

/// Scenario 3: freeing three physically adjacent allocations in any order
/// leaves exactly one free block spanning all three (three-way coalesce).
#[test]
fn three_way_coalesce() {
    let mut heap = new_heap();
    let a = heap.malloc(48).unwrap();
    let b = heap.malloc(48).unwrap();
    let c = heap.malloc(48).unwrap();

    heap.free(Some(a));
    heap.free(Some(c));
    assert!(heap.checkheap(line!()));
    heap.free(Some(b));
    assert!(heap.checkheap(line!()));

    let stats = heap.stats();
    // Only the merged block (and whatever residue preceded it) remains free;
    // none of a/b/c survive as separate free-list entries.
    assert_eq!(stats.free_blocks, 1);
}

/// Scenario 4: `realloc` preserves payload bytes across a grow, regardless
/// of whether the new block happens to land at the same address.
#[test]
fn realloc_preserves_bytes_across_grow() {
    let mut heap = new_heap();
    let p = heap.malloc(48).unwrap();
    unsafe { std::ptr::write_bytes(p.as_ptr(), 0xAB, 48) };
    assert!(heap.checkheap(line!()));

    let grown = heap.realloc(Some(p), 512).unwrap();
    let bytes = unsafe { std::slice::from_raw_parts(grown.as_ptr(), 48) };
    assert!(bytes.iter().all(|&b| b == 0xAB));
    assert!(heap.checkheap(line!()));
}

/// Scenario 5: `calloc` zero-fills its payload, including across a heap
/// growth triggered by the request itself.
#[test]
fn calloc_zero_fills_and_grows_heap_if_needed() {
    let mut heap = Heap::new(
        HeapConfig {
            chunk_size: 64,
            ..HeapConfig::default()
        },
        VecHeapBackend::with_capacity(1 << 16),
    );
    let before = heap.stats().heap_size;
    let p = heap.calloc(64, 64).unwrap();
    let bytes = unsafe { std::slice::from_raw_parts(p.as_ptr(), 64 * 64) };
    assert!(bytes.iter().all(|&b| b == 0));
    assert!(heap.checkheap(line!()));
    assert!(heap.stats().heap_size > before);
}

/// Scenario 6: a steady-state allocate/free loop never grows the heap past
/// its first extension once a stable working set is reached.
#[test]
fn steady_state_loop_does_not_grow_heap_unboundedly() {
    let mut heap = new_heap();
    // Warm up: establish the working set.
    let mut live: Vec<_> = (0..16).map(|_| heap.malloc(64).unwrap()).collect();
    let steady_size = heap.stats().heap_size;

    for i in 0..2000 {
        let idx = i % live.len();
        heap.free(Some(live[idx]));
        live[idx] = heap.malloc(64).unwrap();
    }

    assert_eq!(heap.stats().heap_size, steady_size);
    assert!(heap.checkheap(line!()));
}

#[test]
fn malloc_zero_is_null() {
    let mut heap = new_heap();
    assert!(heap.malloc(0).is_none());
}

#[test]
fn free_of_null_is_a_noop() {
    let mut heap = new_heap();
    heap.free(None);
    assert!(heap.checkheap(line!()));
}

#[test]
fn realloc_of_null_behaves_as_malloc() {
    let mut heap = new_heap();
    let p = heap.realloc(None, 100);
    assert!(p.is_some());
    assert!(heap.checkheap(line!()));
}

#[test]
fn realloc_to_zero_behaves_as_free() {
    let mut heap = new_heap();
    let p = heap.malloc(100);
    assert!(heap.realloc(p, 0).is_none());
    assert!(heap.checkheap(line!()));
}

/// An allocation that exactly matches a free block's size is placed with
/// no split, and the physical successor's `prev_alloc` bit still flips.
#[test]
fn exact_size_match_does_not_split() {
    let mut heap = new_heap();
    let a = heap.malloc(64).unwrap();
    let b = heap.malloc(64).unwrap();
    heap.free(Some(a));

    // The freed block is exactly large enough for another same-sized
    // request with no room to spare, so it is reused whole rather than
    // split, and checkheap confirms the successor's prev_alloc bit still
    // tracks the reused block's new allocated state.
    let c = heap.malloc(64).unwrap();
    assert_eq!(a, c);
    assert!(heap.checkheap(line!()));
    let _ = b;
}

/// Residue left over by a split that is exactly the minimum block size is
/// still carved out (not folded back into the allocated part), and the
/// resulting minimum-size free block round-trips through malloc/free.
#[test]
fn split_residue_at_minimum_block_size() {
    // chunk_size=96 forces the heap's first extension to a 96-byte block;
    // a 64-byte request needs an 80-byte block, leaving an exactly
    // MIN_BLOCK_SIZE (16-byte) residue.
    let mut heap = Heap::new(
        HeapConfig {
            chunk_size: 96,
            ..HeapConfig::default()
        },
        VecHeapBackend::with_capacity(1 << 16),
    );
    heap.malloc(64).unwrap();
    assert!(heap.checkheap(line!()));
    let stats = heap.stats();
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.free_bytes, 16);

    let b = heap.malloc(4).unwrap();
    assert!(heap.checkheap(line!()));
    let _ = b;
}
