//! Strided vector view

use super::Span;
use crate::dtype::DeviceRepr;
use crate::error::{Error, Result};
use crate::runtime::{Buffer, DevicePtr};

/// A strided window `buffer[offset + i * stride]`, `i < len`
///
/// Views never own memory; they share the buffer handle. A view with `len == 0`
/// is always valid. Construction checks that the last element is in bounds, so
/// kernels can read and write any `i < len` without further checks.
#[derive(Clone, Debug)]
pub struct VectorView<T: DeviceRepr> {
    buffer: Buffer<T>,
    offset: usize,
    stride: usize,
    len: usize,
}

impl<T: DeviceRepr> VectorView<T> {
    /// Create a view of `len` elements starting at `offset`
    ///
    /// # Errors
    /// - `InvalidArgument` if `stride == 0`
    /// - `ViewOutOfBounds` if `offset + (len - 1) * stride` is past the buffer
    pub fn new(buffer: &Buffer<T>, offset: usize, stride: usize, len: usize) -> Result<Self> {
        if stride == 0 {
            return Err(Error::invalid_argument("stride", "must be at least 1"));
        }
        if len > 0 {
            let required = (len - 1)
                .checked_mul(stride)
                .and_then(|s| s.checked_add(offset))
                .and_then(|last| last.checked_add(1))
                .ok_or(Error::ViewOutOfBounds {
                    required: usize::MAX,
                    len: buffer.len(),
                })?;
            if required > buffer.len() {
                return Err(Error::ViewOutOfBounds {
                    required,
                    len: buffer.len(),
                });
            }
        }
        Ok(Self {
            buffer: buffer.clone(),
            offset,
            stride,
            len,
        })
    }

    /// View of `len` elements with increment `stride` starting at `ptr`
    pub fn from_ptr(ptr: &DevicePtr<T>, len: usize, stride: usize) -> Result<Self> {
        Self::new(ptr.buffer(), ptr.offset(), stride, len)
    }

    /// Contiguous view over a whole buffer
    pub fn contiguous(buffer: &Buffer<T>) -> Self {
        Self {
            buffer: buffer.clone(),
            offset: 0,
            stride: 1,
            len: buffer.len(),
        }
    }

    /// The underlying buffer
    pub fn buffer(&self) -> &Buffer<T> {
        &self.buffer
    }

    /// Index of element 0 inside the buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Distance between consecutive elements
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the view has no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Buffer index of logical element `i`
    #[inline]
    pub fn physical_index(&self, i: usize) -> usize {
        self.offset + i * self.stride
    }

    /// True if both views address the same elements in the same order
    pub fn same_mapping(&self, other: &Self) -> bool {
        self.buffer.id() == other.buffer.id()
            && self.offset == other.offset
            && (self.stride == other.stride || self.len <= 1)
            && self.len == other.len
    }

    pub(crate) fn span(&self) -> Span {
        let end = if self.len == 0 {
            self.offset
        } else {
            self.physical_index(self.len - 1) + 1
        };
        Span::new(self.buffer.id(), self.offset, end)
    }

    /// True if the two views may touch a common buffer element
    ///
    /// The test is on the covered index ranges, so interleaved strided views of
    /// the same region count as overlapping.
    pub fn overlaps<U: DeviceRepr>(&self, other: &VectorView<U>) -> bool {
        self.span().overlaps(&other.span())
    }

    /// Read logical element `i`
    ///
    /// # Safety
    /// `i < len`, and no work-item writes this element concurrently.
    #[inline]
    pub(crate) unsafe fn read(&self, i: usize) -> T {
        debug_assert!(i < self.len);
        unsafe { self.buffer.memory().read(self.physical_index(i)) }
    }

    /// Write logical element `i`
    ///
    /// # Safety
    /// `i < len`, and no other work-item touches this element concurrently.
    #[inline]
    pub(crate) unsafe fn write(&self, i: usize, value: T) {
        debug_assert!(i < self.len);
        unsafe { self.buffer.memory().write(self.physical_index(i), value) }
    }
}
