//! Raw allocators used by the record operations
//!
//! Records are built from untyped blocks obtained through [`RawAllocator`].
//! The process allocator, [`LibcAllocator`], forwards to `malloc`/`free` so
//! external leak checkers see every block. [`TrackingAllocator`] wraps another
//! allocator, keeps a ledger of outstanding blocks and can be armed to fail,
//! which is how the leak and failure paths are observed in tests.

use log::{debug, error};
use std::collections::HashMap;
use std::fmt;
use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard};

/// A source of untyped heap blocks
///
/// Blocks are released without a size, mirroring `free`. Like `malloc`,
/// every block must be aligned for any fundamental type.
pub trait RawAllocator {
    /// Allocate `size` bytes, or `None` if the request cannot be satisfied
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// Release a block previously returned by [`allocate`](Self::allocate)
    ///
    /// # Safety
    ///
    /// `ptr` must come from this allocator and must not have been released.
    unsafe fn release(&self, ptr: NonNull<u8>);
}

impl<A: RawAllocator + ?Sized> RawAllocator for &A {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        (**self).allocate(size)
    }

    unsafe fn release(&self, ptr: NonNull<u8>) {
        (**self).release(ptr)
    }
}

/// The C heap (`malloc`/`free`)
#[derive(Debug, Clone, Copy, Default)]
pub struct LibcAllocator;

/// Shared instance used by the default constructors and the C exports
pub static LIBC: LibcAllocator = LibcAllocator;

impl RawAllocator for LibcAllocator {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        // malloc(0) may legally return null; never ask for zero bytes
        let ptr = unsafe { libc::malloc(size.max(1)) } as *mut u8;
        NonNull::new(ptr)
    }

    unsafe fn release(&self, ptr: NonNull<u8>) {
        libc::free(ptr.as_ptr() as *mut libc::c_void);
    }
}

/// Snapshot of a [`TrackingAllocator`]'s ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Blocks allocated and not yet released
    pub live_blocks: usize,
    /// Bytes held by the live blocks
    pub live_bytes: usize,
    /// Successful allocations over the allocator's lifetime
    pub total_allocs: usize,
    /// Successful releases over the allocator's lifetime
    pub total_frees: usize,
    /// Bytes handed out over the allocator's lifetime
    pub bytes_allocated: usize,
    /// Requests that returned no block
    pub failed_allocs: usize,
    /// Releases of blocks the ledger did not know about
    pub invalid_releases: usize,
}

impl fmt::Display for AllocStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "live = {} B in {} blocks\ttotal = {} allocs, {} frees, {} B\tfailed = {}",
            self.live_bytes,
            self.live_blocks,
            self.total_allocs,
            self.total_frees,
            self.bytes_allocated,
            self.failed_allocs
        )
    }
}

#[derive(Debug, Default)]
struct Ledger {
    live: HashMap<usize, usize>,
    stats: AllocStats,
    // Remaining successful allocations before faults start
    fail_after: Option<usize>,
}

/// An allocator that records every block it hands out
///
/// Releases of unknown blocks are counted and logged but never forwarded,
/// so a double destroy through a tracker does not reach the inner heap.
#[derive(Debug, Default)]
pub struct TrackingAllocator<A: RawAllocator = LibcAllocator> {
    inner: A,
    ledger: Mutex<Ledger>,
}

impl TrackingAllocator<LibcAllocator> {
    /// Track allocations made on the C heap
    pub fn new() -> Self {
        Self::wrap(LibcAllocator)
    }
}

impl<A: RawAllocator> TrackingAllocator<A> {
    /// Track allocations made through `inner`
    pub fn wrap(inner: A) -> Self {
        TrackingAllocator {
            inner,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        // A panic while holding the lock cannot leave the ledger half-updated
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current counters
    pub fn stats(&self) -> AllocStats {
        self.ledger().stats
    }

    /// Sizes of all outstanding blocks, smallest first
    pub fn live_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self.ledger().live.values().copied().collect();
        sizes.sort_unstable();
        sizes
    }

    /// Whether `ptr` is an outstanding block of this allocator
    pub fn is_live(&self, ptr: *const u8) -> bool {
        self.ledger().live.contains_key(&(ptr as usize))
    }

    /// Let `successes` more allocations through, then fail every request
    pub fn fail_after(&self, successes: usize) {
        self.ledger().fail_after = Some(successes);
    }

    /// Stop injecting faults
    pub fn disarm(&self) {
        self.ledger().fail_after = None;
    }
}

impl<A: RawAllocator> RawAllocator for TrackingAllocator<A> {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        let mut ledger = self.ledger();

        if let Some(remaining) = ledger.fail_after.as_mut() {
            if *remaining == 0 {
                ledger.stats.failed_allocs += 1;
                debug!("injected allocation failure ({} bytes)", size);
                return None;
            }
            *remaining -= 1;
        }

        let Some(ptr) = self.inner.allocate(size) else {
            ledger.stats.failed_allocs += 1;
            return None;
        };

        ledger.live.insert(ptr.as_ptr() as usize, size);
        ledger.stats.live_blocks += 1;
        ledger.stats.live_bytes += size;
        ledger.stats.total_allocs += 1;
        ledger.stats.bytes_allocated += size;
        debug!("allocated {} bytes at {:p}", size, ptr);
        Some(ptr)
    }

    unsafe fn release(&self, ptr: NonNull<u8>) {
        let mut ledger = self.ledger();

        let Some(size) = ledger.live.remove(&(ptr.as_ptr() as usize)) else {
            ledger.stats.invalid_releases += 1;
            error!("release of untracked block {:p} ignored", ptr);
            return;
        };

        ledger.stats.live_blocks -= 1;
        ledger.stats.live_bytes -= size;
        ledger.stats.total_frees += 1;
        debug!("released {} bytes at {:p}", size, ptr);
        self.inner.release(ptr);
    }
}
