//! Fused elementwise expression trees
//!
//! An [`Expr`] describes a whole vector computation ending in an assignment,
//! e.g. `y := alpha * x + y`. The tree is validated and compiled on the host
//! once, then evaluated by a single kernel launch in which work-item `i`
//! computes element `i` of the destination. No temporaries are allocated for
//! interior nodes.
//!
//! ```ignore
//! use numblas::prelude::*;
//!
//! let x = VectorView::contiguous(&xs);
//! let y = VectorView::contiguous(&ys);
//! let axpy = Expr::assign(y.clone(), Expr::scale(2.0, Expr::leaf(x)).add(Expr::leaf(y)));
//! ex.execute(axpy)?.wait()?;
//! ```

mod compile;

pub(crate) use compile::{check_lengths, compile_value, source_leaves};

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::{Event, Executor, NdRange};
use crate::view::VectorView;
use compile::{ExprKernel, Program, operand_views};

/// Unary operation kind
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// Absolute value: |a|
    Abs,
    /// Square: a^2
    Square,
    /// Square root: sqrt(a), NaN for negative input
    Sqrt,
}

impl UnaryOp {
    #[inline]
    pub(crate) fn apply<T: Element>(self, a: T) -> T {
        match self {
            Self::Abs => a.abs(),
            Self::Square => a * a,
            Self::Sqrt => a.sqrt(),
        }
    }
}

/// Binary operation kind
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    /// Addition: a + b
    Add,
    /// Multiplication: a * b
    Mul,
}

impl BinaryOp {
    #[inline]
    pub(crate) fn apply<T: Element>(self, a: T, b: T) -> T {
        match self {
            Self::Add => a + b,
            Self::Mul => a * b,
        }
    }
}

/// Node of an elementwise expression tree
#[derive(Clone, Debug)]
pub enum Expr<T: Element> {
    /// Element `i` of a vector view
    Leaf(VectorView<T>),
    /// `op(child)`
    Unary(UnaryOp, Box<Expr<T>>),
    /// `op(lhs, rhs)`
    Binary(BinaryOp, Box<Expr<T>>, Box<Expr<T>>),
    /// `op(scalar, child)`, the scalar broadcast to every element
    Scalar(BinaryOp, T, Box<Expr<T>>),
    /// `dest[i] := source(i)`
    Assign(VectorView<T>, Box<Expr<T>>),
    /// `dest1[i], dest2[i] := source1(i), source2(i)`, both sources read
    /// before either destination is written
    DualAssign(VectorView<T>, VectorView<T>, Box<Expr<T>>, Box<Expr<T>>),
}

impl<T: Element> Expr<T> {
    /// Leaf reading a view
    pub fn leaf(view: VectorView<T>) -> Self {
        Self::Leaf(view)
    }

    /// Unary node
    pub fn unary(op: UnaryOp, child: Self) -> Self {
        Self::Unary(op, Box::new(child))
    }

    /// Binary node
    pub fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
        Self::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Scalar-broadcast node
    pub fn scalar(op: BinaryOp, scalar: T, child: Self) -> Self {
        Self::Scalar(op, scalar, Box::new(child))
    }

    /// Assignment root
    pub fn assign(dest: VectorView<T>, source: Self) -> Self {
        Self::Assign(dest, Box::new(source))
    }

    /// Dual assignment root
    pub fn dual_assign(
        dest1: VectorView<T>,
        dest2: VectorView<T>,
        source1: Self,
        source2: Self,
    ) -> Self {
        Self::DualAssign(dest1, dest2, Box::new(source1), Box::new(source2))
    }

    /// `scalar * child`
    pub fn scale(scalar: T, child: Self) -> Self {
        Self::scalar(BinaryOp::Mul, scalar, child)
    }

    /// `self + rhs`
    #[allow(clippy::should_implement_trait)]
    pub fn add(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Add, self, rhs)
    }

    /// `self * rhs`
    #[allow(clippy::should_implement_trait)]
    pub fn mul(self, rhs: Self) -> Self {
        Self::binary(BinaryOp::Mul, self, rhs)
    }

    /// `|self|`
    pub fn abs(self) -> Self {
        Self::unary(UnaryOp::Abs, self)
    }

    /// `self^2`
    pub fn square(self) -> Self {
        Self::unary(UnaryOp::Square, self)
    }

    /// `sqrt(self)`
    pub fn sqrt(self) -> Self {
        Self::unary(UnaryOp::Sqrt, self)
    }

    /// Number of elements the tree produces
    ///
    /// For value nodes this is the length of the leftmost leaf; for assignment
    /// roots it is the destination length.
    pub fn len(&self) -> usize {
        match self {
            Self::Leaf(v) | Self::Assign(v, _) | Self::DualAssign(v, _, _, _) => v.len(),
            Self::Unary(_, c) | Self::Scalar(_, _, c) | Self::Binary(_, c, _) => c.len(),
        }
    }

    /// True if the tree produces no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for `Assign` and `DualAssign` roots
    pub fn is_assignment(&self) -> bool {
        matches!(self, Self::Assign(..) | Self::DualAssign(..))
    }
}

impl Executor {
    /// Evaluate an assignment tree in one launch
    ///
    /// Uses the configured work-group size (clamped to the device limit).
    ///
    /// # Errors
    /// - `InvalidArgument` if the root is not an assignment or an assignment
    ///   appears below the root
    /// - `InvalidArgument` if a view belongs to another executor
    /// - `ShapeMismatch` if any leaf or destination length differs from the
    ///   first destination's
    pub fn execute<T: Element>(&self, expr: Expr<T>) -> Result<Event> {
        self.execute_with_local_size(expr, self.config().execute_local_size)
    }

    /// Evaluate an assignment tree with an explicit work-group size
    pub fn execute_with_local_size<T: Element>(
        &self,
        expr: Expr<T>,
        local_size: usize,
    ) -> Result<Event> {
        if !expr.is_assignment() {
            return Err(Error::invalid_argument(
                "expr",
                "root of an executed tree must be Assign or DualAssign",
            ));
        }
        for view in operand_views(&expr) {
            self.check_owned("expr", view.buffer())?;
        }
        let program = Program::compile(&expr)?;
        let len = program.len();
        if len == 0 {
            return Ok(Event::completed());
        }

        let local = self.clamp_local_size(local_size);
        let range = NdRange::covering(len, local);
        let schedule = program.schedule();
        self.launch(ExprKernel::new(program), range, schedule)
    }
}
