//! Device buffers and device pointers
//!
//! A [`Buffer`] is the ownership handle returned by `Executor::allocate`. Views,
//! kernels and BLAS routines receive the handle (or a [`DevicePtr`] into it)
//! directly, so there is no table mapping raw addresses back to buffers.

use super::allocator::{Allocator, DeviceAllocator};
use crate::dtype::DeviceRepr;
use crate::error::{Error, Result};
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a device allocation
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric id
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Typed device storage shared by every handle and in-flight kernel
pub(crate) struct DeviceMemory<T: DeviceRepr> {
    ptr: NonNull<T>,
    len: usize,
    allocator: DeviceAllocator,
    _marker: PhantomData<T>,
}

// SAFETY: the memory is plain data owned by this struct. Only the queue worker of
// the executor owning `allocator` touches it (executors reject foreign buffers),
// launches run one at a time on that queue, and access inside a launch is
// element-disjoint.
unsafe impl<T: DeviceRepr> Send for DeviceMemory<T> {}
unsafe impl<T: DeviceRepr> Sync for DeviceMemory<T> {}

impl<T: DeviceRepr> DeviceMemory<T> {
    fn new(len: usize, allocator: DeviceAllocator) -> Result<Self> {
        let size = Self::size_bytes_for(len)?;
        let ptr = allocator.allocate(size)?.cast::<T>();
        Ok(Self {
            ptr,
            len,
            allocator,
            _marker: PhantomData,
        })
    }

    fn size_bytes_for(len: usize) -> Result<usize> {
        len.checked_mul(std::mem::size_of::<T>())
            .ok_or(Error::OutOfMemory { size: usize::MAX })
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Read element `i`
    ///
    /// # Safety
    /// `i < len`, and no other thread writes element `i` concurrently.
    #[inline]
    pub(crate) unsafe fn read(&self, i: usize) -> T {
        debug_assert!(i < self.len);
        unsafe { self.ptr.as_ptr().add(i).read() }
    }

    /// Write element `i`
    ///
    /// # Safety
    /// `i < len`, and no other thread reads or writes element `i` concurrently.
    #[inline]
    pub(crate) unsafe fn write(&self, i: usize, value: T) {
        debug_assert!(i < self.len);
        unsafe { self.ptr.as_ptr().add(i).write(value) }
    }

    /// Copy `src` into elements `[offset, offset + src.len())`
    ///
    /// # Safety
    /// Range in bounds; no kernel touches it concurrently.
    pub(crate) unsafe fn write_slice(&self, offset: usize, src: &[T]) {
        debug_assert!(offset + src.len() <= self.len);
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), self.ptr.as_ptr().add(offset), src.len());
        }
    }

    /// Copy elements `[offset, offset + dst.len())` into `dst`
    ///
    /// # Safety
    /// Range in bounds; no kernel writes it concurrently.
    pub(crate) unsafe fn read_slice(&self, offset: usize, dst: &mut [T]) {
        debug_assert!(offset + dst.len() <= self.len);
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.as_ptr().add(offset), dst.as_mut_ptr(), dst.len());
        }
    }
}

impl<T: DeviceRepr> Drop for DeviceMemory<T> {
    fn drop(&mut self) {
        let size = self.len * std::mem::size_of::<T>();
        // SAFETY: ptr was produced by this allocator with the same size.
        unsafe { self.allocator.deallocate(self.ptr.cast::<u8>(), size) };
    }
}

/// Handle to a device allocation of `len` elements of `T`
///
/// Cloning the handle shares the allocation. The memory is returned to the
/// allocator once the caller deallocates (drops) every handle and every
/// submitted kernel using it has finished.
pub struct Buffer<T: DeviceRepr> {
    id: BufferId,
    memory: Arc<DeviceMemory<T>>,
}

impl<T: DeviceRepr> Buffer<T> {
    pub(crate) fn allocate(len: usize, allocator: DeviceAllocator) -> Result<Self> {
        Ok(Self {
            id: BufferId::next(),
            memory: Arc::new(DeviceMemory::new(len, allocator)?),
        })
    }

    /// Identity of the allocation
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// True if the buffer holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the allocation in bytes
    pub fn size_bytes(&self) -> usize {
        self.len() * std::mem::size_of::<T>()
    }

    /// Pointer to the first element
    pub fn ptr(&self) -> DevicePtr<T> {
        self.at(0)
    }

    /// Pointer to element `offset`
    pub fn at(&self, offset: usize) -> DevicePtr<T> {
        DevicePtr {
            buffer: self.clone(),
            offset,
        }
    }

    /// True if the buffer was allocated from `allocator`
    pub(crate) fn is_from(&self, allocator: &DeviceAllocator) -> bool {
        self.memory.allocator.same_pool(allocator)
    }

    pub(crate) fn memory(&self) -> &Arc<DeviceMemory<T>> {
        &self.memory
    }
}

impl<T: DeviceRepr> Clone for Buffer<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            memory: Arc::clone(&self.memory),
        }
    }
}

impl<T: DeviceRepr> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("len", &self.len())
            .finish()
    }
}

/// A buffer handle plus an element offset
///
/// This is what BLAS routines take where the reference interface takes a raw
/// pointer: `buffer()` and `offset()` recover the allocation and position.
#[derive(Clone, Debug)]
pub struct DevicePtr<T: DeviceRepr> {
    buffer: Buffer<T>,
    offset: usize,
}

impl<T: DeviceRepr> DevicePtr<T> {
    /// The allocation this pointer points into
    pub fn buffer(&self) -> &Buffer<T> {
        &self.buffer
    }

    /// Element offset from the start of the allocation
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Pointer `count` elements further
    pub fn add(&self, count: usize) -> Self {
        Self {
            buffer: self.buffer.clone(),
            offset: self.offset + count,
        }
    }

    /// Elements from this pointer to the end of the allocation
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }
}

impl<T: DeviceRepr> From<&Buffer<T>> for DevicePtr<T> {
    fn from(buffer: &Buffer<T>) -> Self {
        buffer.ptr()
    }
}
