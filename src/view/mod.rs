//! Non-owning views over device buffers
//!
//! Views carry the addressing of an operand (offset, stride or leading
//! dimension, transpose tag) and a shared handle to its buffer. They are checked
//! against the buffer size once, when created.

mod matrix;
mod vector;

pub use matrix::MatrixView;
pub use vector::VectorView;

use crate::runtime::BufferId;

/// Half-open range of buffer elements a view can touch
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Span {
    buffer: BufferId,
    start: usize,
    end: usize,
}

impl Span {
    pub(crate) fn new(buffer: BufferId, start: usize, end: usize) -> Self {
        Self { buffer, start, end }
    }

    pub(crate) fn overlaps(&self, other: &Span) -> bool {
        self.buffer == other.buffer
            && self.start < self.end
            && other.start < other.end
            && self.start < other.end
            && other.start < self.end
    }
}
