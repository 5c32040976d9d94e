//! Column-major matrix view with a transpose tag

use super::Span;
use crate::dtype::DeviceRepr;
use crate::error::{Error, Result};
use crate::runtime::{Buffer, DevicePtr};

/// A column-major matrix stored in a device buffer
///
/// Physical element `(r, c)` lives at `offset + r + c * ld`. The transpose tag
/// swaps the logical shape: a transposed view of a `R x C` storage block is a
/// `C x R` matrix whose logical `(r, c)` is physical `(c, r)`.
#[derive(Clone, Debug)]
pub struct MatrixView<T: DeviceRepr> {
    buffer: Buffer<T>,
    offset: usize,
    rows: usize,
    cols: usize,
    ld: usize,
    transposed: bool,
}

impl<T: DeviceRepr> MatrixView<T> {
    /// View `rows x cols` stored column-major with leading dimension `ld`
    ///
    /// # Errors
    /// - `InvalidArgument` if `ld < max(1, rows)`
    /// - `ViewOutOfBounds` if the last element is past the buffer
    pub fn new(
        buffer: &Buffer<T>,
        offset: usize,
        rows: usize,
        cols: usize,
        ld: usize,
    ) -> Result<Self> {
        if ld < rows.max(1) {
            return Err(Error::invalid_argument(
                "ld",
                format!("leading dimension {ld} is smaller than max(1, {rows})"),
            ));
        }
        if rows > 0 && cols > 0 {
            let required = (cols - 1)
                .checked_mul(ld)
                .and_then(|v| v.checked_add(rows))
                .and_then(|v| v.checked_add(offset))
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
            rows,
            cols,
            ld,
            transposed: false,
        })
    }

    /// View starting at `ptr`
    pub fn from_ptr(ptr: &DevicePtr<T>, rows: usize, cols: usize, ld: usize) -> Result<Self> {
        Self::new(ptr.buffer(), ptr.offset(), rows, cols, ld)
    }

    /// The same storage with the transpose tag flipped
    pub fn transposed(&self) -> Self {
        Self {
            transposed: !self.transposed,
            ..self.clone()
        }
    }

    /// The underlying buffer
    pub fn buffer(&self) -> &Buffer<T> {
        &self.buffer
    }

    /// Index of physical element (0, 0)
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Leading dimension of the storage
    pub fn ld(&self) -> usize {
        self.ld
    }

    /// True if the logical matrix is the transpose of the storage
    pub fn is_transposed(&self) -> bool {
        self.transposed
    }

    /// Logical row count
    pub fn rows(&self) -> usize {
        if self.transposed { self.cols } else { self.rows }
    }

    /// Logical column count
    pub fn cols(&self) -> usize {
        if self.transposed { self.rows } else { self.cols }
    }

    /// Storage shape `(rows, cols)`, ignoring the tag
    pub fn physical_shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Buffer index of physical element `(r, c)`
    #[inline]
    pub fn physical_index(&self, r: usize, c: usize) -> usize {
        self.offset + r + c * self.ld
    }

    /// Buffer index of logical element `(r, c)`
    #[inline]
    pub fn index(&self, r: usize, c: usize) -> usize {
        if self.transposed {
            self.physical_index(c, r)
        } else {
            self.physical_index(r, c)
        }
    }

    pub(crate) fn span(&self) -> Span {
        let end = if self.rows == 0 || self.cols == 0 {
            self.offset
        } else {
            self.physical_index(self.rows - 1, self.cols - 1) + 1
        };
        Span::new(self.buffer.id(), self.offset, end)
    }

    /// True if the two views may touch a common buffer element
    pub fn overlaps(&self, other: &MatrixView<T>) -> bool {
        self.span().overlaps(&other.span())
    }

    /// Read the buffer element at `index`
    ///
    /// # Safety
    /// `index` comes from `physical_index`/`index` with in-range coordinates and
    /// no work-item writes it concurrently.
    #[inline]
    pub(crate) unsafe fn load(&self, index: usize) -> T {
        unsafe { self.buffer.memory().read(index) }
    }

    /// Write the buffer element at `index`
    ///
    /// # Safety
    /// As for [`load`](Self::load), and no other work-item touches the element.
    #[inline]
    pub(crate) unsafe fn store(&self, index: usize, value: T) {
        unsafe { self.buffer.memory().write(index, value) }
    }
}
