//! # numblas
//!
//! **Accelerator-style BLAS kernels built on fused expression trees.**
//!
//! numblas implements the vector routines of BLAS level 1 and the level 3
//! matrix multiply on a work-group execution model: operands live in device
//! buffers, computations are submitted to an in-order queue, and every
//! submission returns an [`Event`](runtime::Event).
//!
//! ## Engines
//!
//! - **Expression trees**: elementwise chains such as `y := alpha * x + y` are
//!   compiled once and run as a single kernel, with no temporaries
//! - **Reductions**: sums and arg-max/arg-min in parallel stages over
//!   work-group local memory
//! - **GEMM**: blocked local-memory kernels (double buffering, conflict
//!   padding) and a global-memory fallback, monomorphized per transpose
//!   combination and tuned per device class
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use numblas::prelude::*;
//!
//! let ex = Executor::host()?;
//! let x = ex.allocate::<f32>(1024)?;
//! let y = ex.allocate::<f32>(1024)?;
//! ex.copy_to_device(&vec![1.0; 1024], &x.ptr())?;
//!
//! blas::axpy(&ex, 1024, 2.0, &x.ptr(), 1, &y.ptr(), 1)?.wait()?;
//! let d = blas::dot(&ex, 1024, &x.ptr(), 1, &y.ptr(), 1)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): run the work-groups of a launch on the rayon pool

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod blas;
pub mod dtype;
pub mod error;
pub mod expr;
pub mod gemm;
pub mod reduce;
pub mod runtime;
pub mod view;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::blas;
    pub use crate::dtype::{DType, Element, IndexValue};
    pub use crate::error::{Error, Result};
    pub use crate::expr::{BinaryOp, Expr, UnaryOp};
    pub use crate::gemm::{DeviceProfile, KernelVariant, Transpose, select_kernel};
    pub use crate::reduce::{AbsSum, MaxIndex, MinIndex, Reduction, Sum};
    pub use crate::runtime::{
        Buffer, Device, DeviceClass, DeviceKind, DevicePtr, Event, Executor, ExecutorConfig,
        LocalMemoryKind,
    };
    pub use crate::view::{MatrixView, VectorView};
}
