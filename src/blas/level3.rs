//! Matrix-matrix routines

use crate::dtype::Element;
use crate::error::Result;
use crate::gemm::{DeviceProfile, Transpose, select_kernel};
use crate::runtime::{DevicePtr, Event, Executor};
use crate::view::MatrixView;

/// `C := alpha * op(A) * op(B) + beta * C`, column-major
///
/// # Arguments
/// * `trans_a`, `trans_b` - `'n'`, `'t'` or `'c'` (any case)
/// * `m`, `n`, `k` - op(A) is `m x k`, op(B) is `k x n`, C is `m x n`
/// * `lda`, `ldb`, `ldc` - leading dimensions of the stored matrices
///
/// # Errors
/// Invalid transpose characters and leading dimensions are reported before
/// anything is submitted.
#[allow(clippy::too_many_arguments)]
pub fn gemm<T: Element>(
    ex: &Executor,
    trans_a: char,
    trans_b: char,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    a: &DevicePtr<T>,
    lda: usize,
    b: &DevicePtr<T>,
    ldb: usize,
    beta: T,
    c: &DevicePtr<T>,
    ldc: usize,
) -> Result<Event> {
    let op_a = Transpose::from_char("trans_a", trans_a)?;
    let op_b = Transpose::from_char("trans_b", trans_b)?;

    let (a_rows, a_cols) = if op_a.is_transposed() { (k, m) } else { (m, k) };
    let (b_rows, b_cols) = if op_b.is_transposed() { (n, k) } else { (k, n) };
    let va = MatrixView::from_ptr(a, a_rows, a_cols, lda)?;
    let vb = MatrixView::from_ptr(b, b_rows, b_cols, ldb)?;
    let vc = MatrixView::from_ptr(c, m, n, ldc)?;

    select_kernel(op_a, op_b, m, n, k, &DeviceProfile::of(ex)).execute(ex, &va, &vb, &vc, alpha, beta)
}
