//! Element types for numblas kernels
//!
//! BLAS routines here are defined for real single and double precision. The
//! `Element` trait maps those Rust types onto `DType`, and `DeviceRepr` is the
//! looser bound for anything that may live in a device buffer (elements as well
//! as reduction accumulators such as [`IndexValue`]).

mod element;
mod index_value;

pub use element::{DeviceRepr, Element};
pub use index_value::IndexValue;

use std::fmt;

/// Data type of a buffer element
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DType {
    /// 64-bit floating point
    F64 = 0,
    /// 32-bit floating point
    F32 = 1,
}

impl DType {
    /// Size of one element in bytes
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::F64 => 8,
            Self::F32 => 4,
        }
    }

    /// BLAS routine prefix (`s` for single, `d` for double precision)
    pub const fn blas_prefix(self) -> char {
        match self {
            Self::F64 => 'd',
            Self::F32 => 's',
        }
    }

    /// Short name used in logs and error messages
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}
