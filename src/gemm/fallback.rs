//! GEMM kernels that read operands straight from global memory

use super::GemmArgs;
use crate::dtype::Element;
use crate::error::Result;
use crate::runtime::{Event, Executor, Kernel, NdRange, Schedule, WorkGroup};
use crate::view::MatrixView;

/// One C element per work-item, no local memory
pub(crate) struct FallbackGemm<T: Element, const TRANS_A: bool, const TRANS_B: bool> {
    args: GemmArgs<T>,
}

impl<T: Element, const TRANS_A: bool, const TRANS_B: bool> Kernel
    for FallbackGemm<T, TRANS_A, TRANS_B>
{
    type Local = ();

    fn name(&self) -> &'static str {
        "gemm_no_local_mem"
    }

    fn run_group(&self, group: &WorkGroup, _local: &mut [()]) {
        let args = &self.args;
        let total = args.m * args.n;
        for lid in 0..group.local_size() {
            let i = group.global_id(lid);
            if i >= total {
                break;
            }
            let (row, col) = (i % args.m, i / args.m);
            let mut sum = T::zero();
            for p in 0..args.k {
                // SAFETY: row < m, col < n, p < k.
                sum = sum + unsafe { args.load_a::<TRANS_A>(row, p) * args.load_b::<TRANS_B>(p, col) };
            }
            // SAFETY: element (row, col) belongs to this work-item only.
            unsafe { args.store_c(row, col, sum) };
        }
    }
}

/// Launch the fallback kernel for one transpose combination
pub(crate) fn launch<T: Element, const TRANS_A: bool, const TRANS_B: bool>(
    ex: &Executor,
    args: GemmArgs<T>,
    wg_size: usize,
) -> Result<Event> {
    let range = NdRange::covering(args.m * args.n, ex.clamp_local_size(wg_size));
    ex.launch(FallbackGemm::<T, TRANS_A, TRANS_B> { args }, range, Schedule::Parallel)
}

/// `C := beta * C` for the `alpha == 0` and `K == 0` cases
pub(crate) struct ScaleC<T: Element> {
    c: MatrixView<T>,
    beta: T,
}

impl<T: Element> Kernel for ScaleC<T> {
    type Local = ();

    fn name(&self) -> &'static str {
        "gemm_scale_c"
    }

    fn run_group(&self, group: &WorkGroup, _local: &mut [()]) {
        let (m, n) = (self.c.rows(), self.c.cols());
        for lid in 0..group.local_size() {
            let i = group.global_id(lid);
            if i >= m * n {
                break;
            }
            let index = self.c.index(i % m, i / m);
            // SAFETY: index is an in-range element owned by this work-item.
            unsafe {
                let value = if self.beta == T::zero() {
                    T::zero()
                } else {
                    self.beta * self.c.load(index)
                };
                self.c.store(index, value);
            }
        }
    }
}

/// Launch the scale-only kernel over all of `c`
pub(crate) fn launch_scale<T: Element>(
    ex: &Executor,
    c: MatrixView<T>,
    beta: T,
    wg_size: usize,
) -> Result<Event> {
    let range = NdRange::covering(c.rows() * c.cols(), ex.clamp_local_size(wg_size));
    ex.launch(ScaleC { c, beta }, range, Schedule::Parallel)
}
