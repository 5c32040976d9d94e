//! BLAS-style entry points
//!
//! Thin wrappers that turn pointer/count/increment arguments into views and
//! hand them to the expression, reduction and GEMM engines. Naming follows the
//! reference interface without the precision prefix; the element type picks
//! single or double precision.

mod level1;
mod level3;

pub use level1::{
    Givens, asum, asum_into, axpy, copy, dot, dot_into, iamax, iamax_into, iamin, iamin_into,
    nrm2, nrm2_into, rot, rotg, rotmg, scal, swap,
};
pub use level3::gemm;
