//! Vector routines built on expression trees and reductions
//!
//! Vectors are given BLAS style: a device pointer, an element count `n` and a
//! positive increment. Routines that produce a scalar come in two flavours:
//! `*_into` writes the result to device memory and returns the event, the plain
//! name waits and returns the value on the host.

use crate::dtype::{DeviceRepr, Element, IndexValue};
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::reduce::{AbsSum, MaxIndex, MinIndex, Reducer, Reduction, Sum};
use crate::runtime::{DevicePtr, Event, Executor};
use crate::view::VectorView;

fn vector<T: DeviceRepr>(
    arg: &'static str,
    n: usize,
    ptr: &DevicePtr<T>,
    inc: usize,
) -> Result<VectorView<T>> {
    if inc == 0 {
        return Err(Error::invalid_argument(arg, "increment must be at least 1"));
    }
    VectorView::from_ptr(ptr, n, inc)
}

fn leaf<T: Element>(view: &VectorView<T>) -> Expr<T> {
    Expr::leaf(view.clone())
}

/// `y := alpha * x + y`
pub fn axpy<T: Element>(
    ex: &Executor,
    n: usize,
    alpha: T,
    x: &DevicePtr<T>,
    incx: usize,
    y: &DevicePtr<T>,
    incy: usize,
) -> Result<Event> {
    let vx = vector("incx", n, x, incx)?;
    let vy = vector("incy", n, y, incy)?;
    if n == 0 || alpha == T::zero() {
        return Ok(Event::completed());
    }
    let source = Expr::scale(alpha, leaf(&vx)).add(leaf(&vy));
    ex.execute(Expr::assign(vy, source))
}

/// `y := x`
pub fn copy<T: Element>(
    ex: &Executor,
    n: usize,
    x: &DevicePtr<T>,
    incx: usize,
    y: &DevicePtr<T>,
    incy: usize,
) -> Result<Event> {
    let vx = vector("incx", n, x, incx)?;
    let vy = vector("incy", n, y, incy)?;
    ex.execute(Expr::assign(vy, Expr::leaf(vx)))
}

/// `x := alpha * x`
pub fn scal<T: Element>(
    ex: &Executor,
    n: usize,
    alpha: T,
    x: &DevicePtr<T>,
    incx: usize,
) -> Result<Event> {
    let vx = vector("incx", n, x, incx)?;
    let source = Expr::scale(alpha, leaf(&vx));
    ex.execute(Expr::assign(vx, source))
}

/// Exchange `x` and `y`
pub fn swap<T: Element>(
    ex: &Executor,
    n: usize,
    x: &DevicePtr<T>,
    incx: usize,
    y: &DevicePtr<T>,
    incy: usize,
) -> Result<Event> {
    let vx = vector("incx", n, x, incx)?;
    let vy = vector("incy", n, y, incy)?;
    let (to_x, to_y) = (leaf(&vy), leaf(&vx));
    ex.execute(Expr::dual_assign(vx, vy, to_x, to_y))
}

/// Apply a plane rotation: `(x, y) := (c*x + s*y, c*y - s*x)`
#[allow(clippy::too_many_arguments)]
pub fn rot<T: Element>(
    ex: &Executor,
    n: usize,
    x: &DevicePtr<T>,
    incx: usize,
    y: &DevicePtr<T>,
    incy: usize,
    c: T,
    s: T,
) -> Result<Event> {
    let vx = vector("incx", n, x, incx)?;
    let vy = vector("incy", n, y, incy)?;
    let new_x = Expr::scale(c, leaf(&vx)).add(Expr::scale(s, leaf(&vy)));
    let new_y = Expr::scale(-s, leaf(&vx)).add(Expr::scale(c, leaf(&vy)));
    ex.execute(Expr::dual_assign(vx, vy, new_x, new_y))
}

/// Parameters of a Givens rotation produced by [`rotg`]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Givens<T> {
    /// `±sqrt(a^2 + b^2)`, signed like the larger-magnitude input
    pub r: T,
    /// Reconstruction value from which `c` and `s` can be recovered
    pub z: T,
    /// Cosine of the rotation
    pub c: T,
    /// Sine of the rotation
    pub s: T,
}

/// Construct the Givens rotation that zeroes `b`
///
/// Follows reference `drotg`: with `scale = |a| + |b|`, a zero scale gives the
/// identity rotation (`c = 1`, `s = 0`, `r = z = 0`).
pub fn rotg<T: Element>(a: T, b: T) -> Givens<T> {
    let (abs_a, abs_b) = (a.abs(), b.abs());
    let roe = if abs_a > abs_b { a } else { b };
    let scale = abs_a + abs_b;
    if scale == T::zero() {
        return Givens {
            r: T::zero(),
            z: T::zero(),
            c: T::one(),
            s: T::zero(),
        };
    }

    let (sa, sb) = (a / scale, b / scale);
    let mut r = scale * (sa * sa + sb * sb).sqrt();
    if roe < T::zero() {
        r = -r;
    }
    let c = a / r;
    let s = b / r;
    let z = if abs_a > abs_b {
        s
    } else if c != T::zero() {
        T::one() / c
    } else {
        T::one()
    };
    Givens { r, z, c, s }
}

/// Modified Givens rotation parameters
///
/// # Errors
/// Always `NotImplemented`: no numerically verified implementation exists.
pub fn rotmg<T: Element>(_d1: T, _d2: T, _x1: T, _y1: T) -> Result<[T; 5]> {
    Err(Error::NotImplemented { feature: "rotmg" })
}

fn reduce_into<T: Element, R: Reducer<T>>(
    ex: &Executor,
    op: R,
    source: Expr<T>,
    result: &DevicePtr<R::Acc>,
) -> Result<Event> {
    let dest = VectorView::from_ptr(result, 1, 1)?;
    ex.reduce(Reduction::new(op, dest, source))
}

/// `result[0] := sum(x[i] * y[i])`
pub fn dot_into<T: Element>(
    ex: &Executor,
    n: usize,
    x: &DevicePtr<T>,
    incx: usize,
    y: &DevicePtr<T>,
    incy: usize,
    result: &DevicePtr<T>,
) -> Result<Event> {
    let vx = vector("incx", n, x, incx)?;
    let vy = vector("incy", n, y, incy)?;
    reduce_into(ex, Sum, Expr::leaf(vx).mul(Expr::leaf(vy)), result)
}

/// `result[0] := sqrt(sum(x[i]^2))`
///
/// Two launches: a sum of squares, then an in-place square root.
pub fn nrm2_into<T: Element>(
    ex: &Executor,
    n: usize,
    x: &DevicePtr<T>,
    incx: usize,
    result: &DevicePtr<T>,
) -> Result<Event> {
    let vx = vector("incx", n, x, incx)?;
    let sum = reduce_into(ex, Sum, Expr::leaf(vx).square(), result)?;
    let r = VectorView::from_ptr(result, 1, 1)?;
    let root = ex.execute(Expr::assign(r.clone(), Expr::leaf(r).sqrt()))?;
    ex.join("nrm2", vec![sum, root])
}

/// `result[0] := sum(|x[i]|)`
pub fn asum_into<T: Element>(
    ex: &Executor,
    n: usize,
    x: &DevicePtr<T>,
    incx: usize,
    result: &DevicePtr<T>,
) -> Result<Event> {
    let vx = vector("incx", n, x, incx)?;
    reduce_into(ex, AbsSum, Expr::leaf(vx), result)
}

/// `result[0] :=` position and magnitude of the first largest `|x[i]|`
///
/// An empty input leaves the empty pair (see [`IndexValue::is_empty`]).
pub fn iamax_into<T: Element>(
    ex: &Executor,
    n: usize,
    x: &DevicePtr<T>,
    incx: usize,
    result: &DevicePtr<IndexValue<T>>,
) -> Result<Event> {
    let vx = vector("incx", n, x, incx)?;
    reduce_into(ex, MaxIndex, Expr::leaf(vx), result)
}

/// `result[0] :=` position and magnitude of the first smallest `|x[i]|`
pub fn iamin_into<T: Element>(
    ex: &Executor,
    n: usize,
    x: &DevicePtr<T>,
    incx: usize,
    result: &DevicePtr<IndexValue<T>>,
) -> Result<Event> {
    let vx = vector("incx", n, x, incx)?;
    reduce_into(ex, MinIndex, Expr::leaf(vx), result)
}

/// Run `submit` against a one-element device buffer and read the result back
fn host_scalar<A: DeviceRepr>(
    ex: &Executor,
    submit: impl FnOnce(&DevicePtr<A>) -> Result<Event>,
) -> Result<A> {
    let buffer = ex.allocate::<A>(1)?;
    let ptr = buffer.ptr();
    submit(&ptr)?.wait()?;
    let mut out = [A::zeroed()];
    ex.copy_to_host(&ptr, &mut out)?;
    ex.deallocate(buffer);
    Ok(out[0])
}

/// Dot product of `x` and `y`
pub fn dot<T: Element>(
    ex: &Executor,
    n: usize,
    x: &DevicePtr<T>,
    incx: usize,
    y: &DevicePtr<T>,
    incy: usize,
) -> Result<T> {
    host_scalar(ex, |r| dot_into(ex, n, x, incx, y, incy, r))
}

/// Euclidean norm of `x`
pub fn nrm2<T: Element>(ex: &Executor, n: usize, x: &DevicePtr<T>, incx: usize) -> Result<T> {
    host_scalar(ex, |r| nrm2_into(ex, n, x, incx, r))
}

/// Sum of absolute values of `x`
pub fn asum<T: Element>(ex: &Executor, n: usize, x: &DevicePtr<T>, incx: usize) -> Result<T> {
    host_scalar(ex, |r| asum_into(ex, n, x, incx, r))
}

/// 0-based index of the first element with the largest magnitude (0 if `n == 0`)
pub fn iamax<T: Element>(ex: &Executor, n: usize, x: &DevicePtr<T>, incx: usize) -> Result<usize> {
    let pair = host_scalar(ex, |r| iamax_into(ex, n, x, incx, r))?;
    Ok(if pair.is_empty() { 0 } else { pair.index })
}

/// 0-based index of the first element with the smallest magnitude (0 if `n == 0`)
pub fn iamin<T: Element>(ex: &Executor, n: usize, x: &DevicePtr<T>, incx: usize) -> Result<usize> {
    let pair = host_scalar(ex, |r| iamin_into(ex, n, x, incx, r))?;
    Ok(if pair.is_empty() { 0 } else { pair.index })
}
