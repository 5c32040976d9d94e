//! Matrix multiply kernel family
//!
//! `C := alpha * op(A) * op(B) + beta * C` on column-major matrix views. Each
//! call goes through [`select_kernel`], which picks a strategy for the device
//! and problem size, and [`KernelVariant::execute`], which validates the
//! operands and launches the matching monomorphized kernel:
//!
//! - **blocked**: work-groups stage K-tiles of A and B in local memory and keep
//!   a register tile of C per work-item; optional double buffering and
//!   conflict padding are compile-time parameters.
//! - **fallback**: one C element per work-item, read straight from global
//!   memory, for devices without usable local memory.
//!
//! Every strategy accumulates each C element over `k` in increasing order, so
//! results do not depend on the tile shape or strategy.

mod blocked;
mod dispatch;
mod fallback;
mod tile;

pub use dispatch::{DeviceProfile, KernelVariant, Strategy, select_kernel};
pub use tile::{BlockedParams, TileConfig, tuned_params};

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::view::MatrixView;

/// Operation applied to a GEMM input
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Transpose {
    /// op(X) = X
    NoTrans,
    /// op(X) = X^T
    Trans,
    /// op(X) = X^H, equal to X^T for real elements
    ConjTrans,
}

impl Transpose {
    /// Parse a BLAS transpose character (`n`, `t` or `c`, any case)
    ///
    /// `arg` names the parameter in the error.
    pub fn from_char(arg: &'static str, flag: char) -> Result<Self> {
        match flag.to_ascii_lowercase() {
            'n' => Ok(Self::NoTrans),
            't' => Ok(Self::Trans),
            'c' => Ok(Self::ConjTrans),
            _ => Err(Error::invalid_argument(
                arg,
                format!("expected one of 'n', 't', 'c', got {flag:?}"),
            )),
        }
    }

    /// True unless `NoTrans`
    pub fn is_transposed(self) -> bool {
        self != Self::NoTrans
    }
}

/// Validated operands of one launch
///
/// `a` and `b` carry op(A) and op(B) as transpose-tagged views; kernels read
/// them through the const-generic accessors, which must agree with the tags.
#[derive(Clone, Debug)]
pub(crate) struct GemmArgs<T: Element> {
    a: MatrixView<T>,
    b: MatrixView<T>,
    c: MatrixView<T>,
    pub(crate) m: usize,
    pub(crate) n: usize,
    pub(crate) k: usize,
    alpha: T,
    beta: T,
}

impl<T: Element> GemmArgs<T> {
    /// Element `(row, p)` of op(A)
    ///
    /// # Safety
    /// `row < m`, `p < k`.
    #[inline]
    pub(crate) unsafe fn load_a<const TRANS_A: bool>(&self, row: usize, p: usize) -> T {
        let index = if TRANS_A {
            self.a.physical_index(p, row)
        } else {
            self.a.physical_index(row, p)
        };
        unsafe { self.a.load(index) }
    }

    /// Element `(p, col)` of op(B)
    ///
    /// # Safety
    /// `p < k`, `col < n`.
    #[inline]
    pub(crate) unsafe fn load_b<const TRANS_B: bool>(&self, p: usize, col: usize) -> T {
        let index = if TRANS_B {
            self.b.physical_index(col, p)
        } else {
            self.b.physical_index(p, col)
        };
        unsafe { self.b.load(index) }
    }

    /// `C(row, col) := alpha * acc + beta * C(row, col)`; C is not read when
    /// `beta == 0`
    ///
    /// # Safety
    /// `row < m`, `col < n`, and the caller is the only writer of the element.
    #[inline]
    pub(crate) unsafe fn store_c(&self, row: usize, col: usize, acc: T) {
        let index = self.c.index(row, col);
        let value = if self.beta == T::zero() {
            self.alpha * acc
        } else {
            self.alpha * acc + self.beta * unsafe { self.c.load(index) }
        };
        unsafe { self.c.store(index, value) };
    }
}
