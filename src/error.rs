//! Error types for numblas

use thiserror::Error;

/// Result type alias using numblas's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in numblas operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Operand lengths or matrix extents do not agree
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected extents
        expected: Vec<usize>,
        /// Actual extents
        got: Vec<usize>,
    },

    /// A view addresses elements past the end of its buffer
    #[error("View out of bounds: needs {required} elements, buffer holds {len}")]
    ViewOutOfBounds {
        /// Number of elements the view needs
        required: usize,
        /// Number of elements in the buffer
        len: usize,
    },

    /// Out of device memory
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// Output operand overlaps an input operand where that is not allowed
    #[error("Output operand of '{op}' overlaps an input operand")]
    AliasedOperands {
        /// The operation name
        op: &'static str,
    },

    /// A submitted operation failed on the device
    #[error("Device error in '{op}': {reason}")]
    Device {
        /// The operation that failed
        op: &'static str,
        /// Failure description
        reason: String,
    },

    /// The command queue has shut down and accepts no more work
    #[error("Command queue is closed")]
    QueueClosed,

    /// Routine intentionally not provided
    #[error("Not implemented: {feature}")]
    NotImplemented {
        /// Description of the unimplemented feature
        feature: &'static str,
    },
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create a device error
    pub fn device(op: &'static str, reason: impl Into<String>) -> Self {
        Self::Device {
            op,
            reason: reason.into(),
        }
    }
}
