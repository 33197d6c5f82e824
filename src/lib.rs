//! # segfit-alloc - Segregated-Fit Dynamic Memory Allocator
//!
//! A `no_std`-compatible `malloc`/`free`/`realloc`/`calloc` implementation
//! over a single, monotonically growable simulated heap. All
//! platform-specific functionality — how the heap acquires more memory, and
//! optional byte-level write instrumentation — is abstracted through traits
//! that must be implemented by the host.
//!
//! ## Host Traits
//!
//! - [`HeapBackend`] - acquires additional heap memory on demand
//! - [`BytePoison`] - optional hook over payload-zeroing/payload-copying writes
//!
//! ## Usage
//!
//! ```ignore
//! use segfit_alloc::{Heap, HeapConfig, VecHeapBackend};
//!
//! let mut heap = Heap::new(HeapConfig::default(), VecHeapBackend::with_capacity(1 << 20));
//!
//! let p = heap.malloc(64).unwrap();
//! heap.free(Some(p));
//! debug_assert!(heap.checkheap(line!()));
//! ```

#![no_std]

// Vec-backed free-list bookkeeping in `sim` and `BTreeSet` bookkeeping in
// `checkheap` need an allocator, but nothing in the allocator itself does.
extern crate alloc;

pub mod backend;
pub mod block;
pub mod checkheap;
pub mod coalesce;
pub mod config;
pub mod diagnostics;
pub mod freelist;
pub mod heap;
pub mod placement;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod sizeclass;
pub mod walker;

pub use backend::{BytePoison, HeapBackend, NoPoison};
pub use config::{ConfigError, HeapConfig};
pub use diagnostics::{CheckError, HeapStats, Invariant};
pub use heap::Heap;
#[cfg(any(test, feature = "sim"))]
pub use sim::VecHeapBackend;
