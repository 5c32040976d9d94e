//! Kernel selection and the monomorphized launch table

use super::tile::{BlockedParams, tuned_params};
use super::{GemmArgs, Transpose, blocked, fallback};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::{DeviceClass, Event, Executor};
use crate::view::MatrixView;

/// What kernel selection needs to know about a device
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Tuning table key
    pub class: DeviceClass,
    /// Blocked kernels require fast local memory
    pub has_local_memory: bool,
    /// Work-group size of the fallback kernel
    pub fallback_wg_size: usize,
}

impl DeviceProfile {
    /// Profile of an executor's device and configuration
    pub fn of(ex: &Executor) -> Self {
        Self {
            class: ex.device_class(),
            has_local_memory: ex.has_local_memory(),
            fallback_wg_size: ex.config().gemm_wg_size,
        }
    }
}

/// How a GEMM is computed
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Local-memory tiling
    Blocked(BlockedParams),
    /// Direct global-memory kernel
    Fallback {
        /// Work-items per group
        wg_size: usize,
    },
}

/// A selected GEMM kernel for one problem shape
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KernelVariant {
    trans_a: Transpose,
    trans_b: Transpose,
    m: usize,
    n: usize,
    k: usize,
    strategy: Strategy,
}

/// Pick the kernel for `op(A)` (`m x k`) times `op(B)` (`k x n`)
pub fn select_kernel(
    trans_a: Transpose,
    trans_b: Transpose,
    m: usize,
    n: usize,
    k: usize,
    profile: &DeviceProfile,
) -> KernelVariant {
    let strategy = if profile.has_local_memory {
        Strategy::Blocked(tuned_params(profile.class, m, n, k))
    } else {
        Strategy::Fallback {
            wg_size: profile.fallback_wg_size,
        }
    };
    log::debug!("gemm {m}x{n}x{k} ({trans_a:?}, {trans_b:?}) on {:?}: {strategy:?}", profile.class);
    KernelVariant::new(trans_a, trans_b, m, n, k, strategy)
}

impl KernelVariant {
    /// A variant with an explicit strategy
    pub fn new(
        trans_a: Transpose,
        trans_b: Transpose,
        m: usize,
        n: usize,
        k: usize,
        strategy: Strategy,
    ) -> Self {
        Self {
            trans_a,
            trans_b,
            m,
            n,
            k,
            strategy,
        }
    }

    /// Chosen strategy
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Problem shape `(m, n, k)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.m, self.n, self.k)
    }

    /// Submit `C := alpha * op(A) * op(B) + beta * C`
    ///
    /// `a` and `b` describe the stored matrices; the variant's transpose flags
    /// are applied on top of their tags.
    ///
    /// # Errors
    /// - `ShapeMismatch` if op(A), op(B) or C disagree with the variant's shape
    /// - `InvalidArgument` if an operand belongs to another executor
    /// - `AliasedOperands` if C overlaps A or B
    pub fn execute<T: Element>(
        &self,
        ex: &Executor,
        a: &MatrixView<T>,
        b: &MatrixView<T>,
        c: &MatrixView<T>,
        alpha: T,
        beta: T,
    ) -> Result<Event> {
        let (m, n, k) = (self.m, self.n, self.k);
        let op_a = apply(a, self.trans_a);
        let op_b = apply(b, self.trans_b);
        check_shape(&op_a, m, k)?;
        check_shape(&op_b, k, n)?;
        check_shape(c, m, n)?;
        ex.check_owned("a", a.buffer())?;
        ex.check_owned("b", b.buffer())?;
        ex.check_owned("c", c.buffer())?;
        if c.overlaps(a) || c.overlaps(b) {
            return Err(Error::AliasedOperands { op: "gemm" });
        }

        if m == 0 || n == 0 {
            return Ok(Event::completed());
        }
        let wg_size = match self.strategy {
            Strategy::Fallback { wg_size } => wg_size,
            Strategy::Blocked(_) => ex.config().gemm_wg_size,
        };
        if alpha == T::zero() || k == 0 {
            if beta == T::one() {
                return Ok(Event::completed());
            }
            return fallback::launch_scale(ex, c.clone(), beta, wg_size);
        }

        let (ta, tb) = (op_a.is_transposed(), op_b.is_transposed());
        let args = GemmArgs {
            a: op_a,
            b: op_b,
            c: c.clone(),
            m,
            n,
            k,
            alpha,
            beta,
        };

        match self.strategy {
            Strategy::Blocked(params) => {
                let needed = params.local_memory_bytes::<T>(ex.config().cache_line_bytes);
                let device = ex.device();
                if needed > device.local_memory_bytes()
                    || params.tile.wg_size() > device.max_work_group_size()
                {
                    log::warn!(
                        "{} needs {} bytes of local memory and {} work-items; {} offers {} bytes and {}; using the no-local-memory kernel",
                        params.tile,
                        needed,
                        params.tile.wg_size(),
                        device.name(),
                        device.local_memory_bytes(),
                        device.max_work_group_size(),
                    );
                    fallback_kernel::<T>(ta, tb)(ex, args, wg_size)
                } else {
                    blocked_kernel::<T>(ta, tb, &params)(ex, args, params)
                }
            }
            Strategy::Fallback { wg_size } => fallback_kernel::<T>(ta, tb)(ex, args, wg_size),
        }
    }
}

fn apply<T: Element>(view: &MatrixView<T>, op: Transpose) -> MatrixView<T> {
    if op.is_transposed() {
        view.transposed()
    } else {
        view.clone()
    }
}

fn check_shape<T: Element>(view: &MatrixView<T>, rows: usize, cols: usize) -> Result<()> {
    if (view.rows(), view.cols()) != (rows, cols) {
        return Err(Error::shape_mismatch(&[rows, cols], &[view.rows(), view.cols()]));
    }
    Ok(())
}

type BlockedFn<T> = fn(&Executor, GemmArgs<T>, BlockedParams) -> Result<Event>;
type FallbackFn<T> = fn(&Executor, GemmArgs<T>, usize) -> Result<Event>;

fn fallback_kernel<T: Element>(trans_a: bool, trans_b: bool) -> FallbackFn<T> {
    match (trans_a, trans_b) {
        (false, false) => fallback::launch::<T, false, false>,
        (false, true) => fallback::launch::<T, false, true>,
        (true, false) => fallback::launch::<T, true, false>,
        (true, true) => fallback::launch::<T, true, true>,
    }
}

fn blocked_kernel<T: Element>(trans_a: bool, trans_b: bool, params: &BlockedParams) -> BlockedFn<T> {
    match (trans_a, trans_b) {
        (false, false) => blocked_flags::<T, false, false>(params),
        (false, true) => blocked_flags::<T, false, true>(params),
        (true, false) => blocked_flags::<T, true, false>(params),
        (true, true) => blocked_flags::<T, true, true>(params),
    }
}

fn blocked_flags<T: Element, const TA: bool, const TB: bool>(params: &BlockedParams) -> BlockedFn<T> {
    match (params.double_buffer, params.conflict_a, params.conflict_b) {
        (false, false, false) => blocked::launch::<T, TA, TB, false, false, false>,
        (false, false, true) => blocked::launch::<T, TA, TB, false, false, true>,
        (false, true, false) => blocked::launch::<T, TA, TB, false, true, false>,
        (false, true, true) => blocked::launch::<T, TA, TB, false, true, true>,
        (true, false, false) => blocked::launch::<T, TA, TB, true, false, false>,
        (true, false, true) => blocked::launch::<T, TA, TB, true, false, true>,
        (true, true, false) => blocked::launch::<T, TA, TB, true, true, false>,
        (true, true, true) => blocked::launch::<T, TA, TB, true, true, true>,
    }
}
