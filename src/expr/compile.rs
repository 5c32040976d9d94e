//! Host-side validation and closure compilation of expression trees

use super::Expr;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::{Kernel, Schedule, WorkGroup};
use crate::view::VectorView;

/// Compiled value node: element `i` of the subtree
pub(crate) type ValueFn<T> = Box<dyn Fn(usize) -> T + Send + Sync>;

/// Compile a value subtree into one closure
///
/// Leaf lengths are not checked here; callers validate them against the launch
/// length first and only invoke the closure with in-range indices.
pub(crate) fn compile_value<T: Element>(expr: &Expr<T>) -> Result<ValueFn<T>> {
    let f: ValueFn<T> = match expr {
        Expr::Leaf(view) => {
            let view = view.clone();
            // SAFETY: leaves were checked to hold every index the launch visits.
            Box::new(move |i| unsafe { view.read(i) })
        }
        Expr::Unary(op, child) => {
            let op = *op;
            let child = compile_value(child)?;
            Box::new(move |i| op.apply(child(i)))
        }
        Expr::Binary(op, lhs, rhs) => {
            let op = *op;
            let lhs = compile_value(lhs)?;
            let rhs = compile_value(rhs)?;
            Box::new(move |i| op.apply(lhs(i), rhs(i)))
        }
        Expr::Scalar(op, scalar, child) => {
            let (op, scalar) = (*op, *scalar);
            let child = compile_value(child)?;
            Box::new(move |i| op.apply(scalar, child(i)))
        }
        Expr::Assign(..) | Expr::DualAssign(..) => {
            return Err(Error::invalid_argument(
                "expr",
                "assignment nested inside a value expression",
            ));
        }
    };
    Ok(f)
}

/// Every leaf view of a value subtree, left to right
pub(crate) fn source_leaves<T: Element>(expr: &Expr<T>) -> Vec<&VectorView<T>> {
    fn walk<'a, T: Element>(expr: &'a Expr<T>, out: &mut Vec<&'a VectorView<T>>) {
        match expr {
            Expr::Leaf(v) => out.push(v),
            Expr::Unary(_, c) | Expr::Scalar(_, _, c) => walk(c, out),
            Expr::Binary(_, l, r) => {
                walk(l, out);
                walk(r, out);
            }
            Expr::Assign(_, s) => walk(s, out),
            Expr::DualAssign(_, _, s1, s2) => {
                walk(s1, out);
                walk(s2, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(expr, &mut out);
    out
}

/// Destinations and leaves of a tree
pub(crate) fn operand_views<T: Element>(expr: &Expr<T>) -> Vec<&VectorView<T>> {
    let mut views = match expr {
        Expr::Assign(dest, _) => vec![dest],
        Expr::DualAssign(dest1, dest2, _, _) => vec![dest1, dest2],
        _ => Vec::new(),
    };
    views.extend(source_leaves(expr));
    views
}

/// Check that every leaf of `expr` has exactly `len` elements
pub(crate) fn check_lengths<T: Element>(expr: &Expr<T>, len: usize) -> Result<()> {
    for leaf in source_leaves(expr) {
        if leaf.len() != len {
            return Err(Error::shape_mismatch(&[len], &[leaf.len()]));
        }
    }
    Ok(())
}

enum Body<T: Element> {
    Single {
        dest: VectorView<T>,
        source: ValueFn<T>,
    },
    Dual {
        dest1: VectorView<T>,
        dest2: VectorView<T>,
        source1: ValueFn<T>,
        source2: ValueFn<T>,
    },
}

/// A validated assignment tree ready to launch
pub(crate) struct Program<T: Element> {
    body: Body<T>,
    len: usize,
    schedule: Schedule,
}

impl<T: Element> Program<T> {
    pub(crate) fn compile(expr: &Expr<T>) -> Result<Self> {
        match expr {
            Expr::Assign(dest, source) => {
                let len = dest.len();
                check_lengths(source, len)?;
                let schedule = schedule_for(&[dest], &source_leaves(source));
                Ok(Self {
                    body: Body::Single {
                        dest: dest.clone(),
                        source: compile_value(source)?,
                    },
                    len,
                    schedule,
                })
            }
            Expr::DualAssign(dest1, dest2, source1, source2) => {
                let len = dest1.len();
                if dest2.len() != len {
                    return Err(Error::shape_mismatch(&[len], &[dest2.len()]));
                }
                check_lengths(source1, len)?;
                check_lengths(source2, len)?;
                let mut leaves = source_leaves(source1);
                leaves.extend(source_leaves(source2));
                let schedule = schedule_for(&[dest1, dest2], &leaves);
                Ok(Self {
                    body: Body::Dual {
                        dest1: dest1.clone(),
                        dest2: dest2.clone(),
                        source1: compile_value(source1)?,
                        source2: compile_value(source2)?,
                    },
                    len,
                    schedule,
                })
            }
            _ => Err(Error::invalid_argument(
                "expr",
                "root of an executed tree must be Assign or DualAssign",
            )),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn schedule(&self) -> Schedule {
        self.schedule
    }

    #[inline]
    fn eval(&self, i: usize) {
        match &self.body {
            Body::Single { dest, source } => {
                let v = source(i);
                // SAFETY: i < len == dest.len(); element i belongs to this work-item.
                unsafe { dest.write(i, v) };
            }
            Body::Dual {
                dest1,
                dest2,
                source1,
                source2,
            } => {
                let a = source1(i);
                let b = source2(i);
                // SAFETY: as above, for both destinations.
                unsafe {
                    dest1.write(i, a);
                    dest2.write(i, b);
                }
            }
        }
    }
}

/// Destinations overlapping another operand through a different element
/// mapping would race between work-items, so such launches run serially.
fn schedule_for<T: Element>(dests: &[&VectorView<T>], leaves: &[&VectorView<T>]) -> Schedule {
    fn conflict<T: Element>(a: &VectorView<T>, b: &VectorView<T>) -> bool {
        a.overlaps(b) && !a.same_mapping(b)
    }
    for (n, dest) in dests.iter().enumerate() {
        let hits_leaf = leaves.iter().any(|leaf| conflict(dest, leaf));
        let hits_dest = dests[n + 1..].iter().any(|other| conflict(dest, other));
        if hits_leaf || hits_dest {
            log::debug!("expression destination overlaps an operand; scheduling serially");
            return Schedule::Serial;
        }
    }
    Schedule::Parallel
}

/// One work-item per destination element
pub(crate) struct ExprKernel<T: Element> {
    program: Program<T>,
}

impl<T: Element> ExprKernel<T> {
    pub(crate) fn new(program: Program<T>) -> Self {
        Self { program }
    }
}

impl<T: Element> Kernel for ExprKernel<T> {
    type Local = ();

    fn name(&self) -> &'static str {
        "expr_assign"
    }

    fn run_group(&self, group: &WorkGroup, _local: &mut [()]) {
        for lid in 0..group.local_size() {
            let i = group.global_id(lid);
            if i >= self.program.len {
                break;
            }
            self.program.eval(i);
        }
    }
}
