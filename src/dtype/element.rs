//! Element trait for mapping Rust types to DType

use super::DType;
use bytemuck::{Pod, Zeroable};
use num_traits::Float;
use std::fmt::{Debug, Display};

/// Anything that may be stored in a device buffer
///
/// Device allocations are zero-filled, so every storable type must accept the
/// all-zero bit pattern (`Zeroable`). Kernels copy values in and out of shared
/// storage from several work-groups at once, hence `Copy + Send + Sync`.
pub trait DeviceRepr: Copy + Send + Sync + Zeroable + Debug + 'static {}

impl<T> DeviceRepr for T where T: Copy + Send + Sync + Zeroable + Debug + 'static {}

/// Trait for scalar types BLAS kernels compute with
///
/// This trait connects Rust's type system to the runtime `DType`. It is
/// implemented for `f32` and `f64`.
///
/// # Bounds
/// - `Pod` - plain bytes, safe to move between host and device
/// - `Float` - abs/sqrt/NaN handling used by the operator catalog
/// - `Display` - values show up in log lines
pub trait Element: DeviceRepr + Pod + Float + Display + Default {
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Widen to f64 for reference accumulation and logging
    fn as_f64(self) -> f64;

    /// Convert from f64 to this type
    fn from_f64(v: f64) -> Self;
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}
