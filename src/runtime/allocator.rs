//! Device memory allocator
//!
//! Allocations are 64-byte aligned and zero-filled. The allocator keeps a running
//! byte count so an executor can enforce a memory budget and report usage;
//! exceeding the budget is an `OutOfMemory` error rather than an abort.

use crate::error::{Error, Result};
use std::alloc::{Layout as AllocLayout, alloc_zeroed, dealloc};
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Alignment of every device allocation (cache line / AVX-512 width)
pub const ALLOC_ALIGN: usize = 64;

/// Memory allocator trait for device buffers
pub trait Allocator: Clone + Send + Sync {
    /// Allocate zero-filled memory of the given size
    ///
    /// Returns `Err(OutOfMemory)` if the system allocator fails or the
    /// allocator's budget would be exceeded.
    fn allocate(&self, size_bytes: usize) -> Result<NonNull<u8>>;

    /// Deallocate memory
    ///
    /// # Safety
    /// `ptr` must come from `allocate` on this allocator with the same `size_bytes`,
    /// and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size_bytes: usize);

    /// Get the total allocated bytes
    fn allocated_bytes(&self) -> usize {
        0 // Default: tracking not supported
    }
}

#[derive(Debug)]
struct AllocatorState {
    used: AtomicUsize,
    limit: Option<usize>,
}

/// Tracking allocator backing device buffers
#[derive(Clone, Debug)]
pub struct DeviceAllocator {
    state: Arc<AllocatorState>,
}

impl DeviceAllocator {
    /// Create an allocator, optionally capped at `limit` bytes in flight
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            state: Arc::new(AllocatorState {
                used: AtomicUsize::new(0),
                limit,
            }),
        }
    }

    /// Configured budget, if any
    pub fn limit(&self) -> Option<usize> {
        self.state.limit
    }

    /// True if both handles refer to the same allocator
    pub fn same_pool(&self, other: &DeviceAllocator) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    fn layout(size_bytes: usize) -> Result<AllocLayout> {
        // Zero-sized buffers still get a real, aligned address
        AllocLayout::from_size_align(size_bytes.max(1), ALLOC_ALIGN)
            .map_err(|_| Error::OutOfMemory { size: size_bytes })
    }

    fn reserve(&self, size_bytes: usize) -> Result<()> {
        let limit = self.state.limit;
        self.state
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                let next = used.checked_add(size_bytes)?;
                match limit {
                    Some(limit) if next > limit => None,
                    _ => Some(next),
                }
            })
            .map(|_| ())
            .map_err(|_| Error::OutOfMemory { size: size_bytes })
    }
}

impl Allocator for DeviceAllocator {
    fn allocate(&self, size_bytes: usize) -> Result<NonNull<u8>> {
        let layout = Self::layout(size_bytes)?;
        self.reserve(size_bytes)?;

        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        match NonNull::new(ptr) {
            Some(ptr) => Ok(ptr),
            None => {
                self.state.used.fetch_sub(size_bytes, Ordering::AcqRel);
                Err(Error::OutOfMemory { size: size_bytes })
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size_bytes: usize) {
        let Ok(layout) = Self::layout(size_bytes) else {
            return;
        };
        // SAFETY: caller guarantees ptr came from `allocate` with this size.
        unsafe { dealloc(ptr.as_ptr(), layout) };
        self.state.used.fetch_sub(size_bytes, Ordering::AcqRel);
    }

    fn allocated_bytes(&self) -> usize {
        self.state.used.load(Ordering::Acquire)
    }
}
