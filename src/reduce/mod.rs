//! Multi-stage parallel reductions
//!
//! A [`Reduction`] folds a value expression into element 0 of a destination
//! view. The first stage spreads the input over `global_size` work-items in
//! groups of `local_size`. Every group consumes two blocks of `local_size`
//! elements per step, so it launches `ceil(global_size / (2 * local_size))`
//! groups (never more than the input needs), and each group writes one partial
//! into scratch. Further stages reduce the partials with the same kernel,
//! alternating between the two halves of the scratch buffer, until a single
//! group writes the destination.
//!
//! Stage sizes are planned on the host before anything is submitted, so the
//! whole reduction is a fixed sequence of launches on the queue.

mod kernel;
mod ops;

pub use ops::{AbsSum, MaxIndex, MinIndex, Reducer, Sum};

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::expr::{Expr, check_lengths, compile_value, source_leaves};
use crate::runtime::{Buffer, Event, Executor, NdRange, Schedule};
use crate::view::{Span, VectorView};
use kernel::{LoadFn, StageKernel, StoreFn};
use std::marker::PhantomData;

/// Reduction of `source` with operator `R` into `dest[0]`
#[derive(Clone, Debug)]
pub struct Reduction<T: Element, R: Reducer<T>> {
    dest: VectorView<R::Acc>,
    source: Expr<T>,
    local_size: Option<usize>,
    global_size: Option<usize>,
    _op: PhantomData<R>,
}

impl<T: Element, R: Reducer<T>> Reduction<T, R> {
    /// Describe `dest[0] := reduce(R, source)`
    pub fn new(_op: R, dest: VectorView<R::Acc>, source: Expr<T>) -> Self {
        Self {
            dest,
            source,
            local_size: None,
            global_size: None,
            _op: PhantomData,
        }
    }

    /// Override the configured work-group size
    pub fn with_local_size(mut self, local_size: usize) -> Self {
        self.local_size = Some(local_size);
        self
    }

    /// Override the first-stage global size
    ///
    /// Defaults to the work-group size times the configured `reduce_groups`.
    pub fn with_global_size(mut self, global_size: usize) -> Self {
        self.global_size = Some(global_size);
        self
    }

    /// Number of source elements
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// True if the source is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The destination view
    pub fn dest(&self) -> &VectorView<R::Acc> {
        &self.dest
    }
}

/// Work-group size and group count of every stage
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StagePlan {
    local_size: usize,
    /// `(input_len, groups)` per stage, first stage first
    stages: Vec<(usize, usize)>,
}

impl StagePlan {
    pub(crate) fn new(len: usize, local_size: usize, global_size: usize) -> Self {
        let local_size = local_size.max(1);
        let span = 2 * local_size;
        let mut groups = global_size.div_ceil(span).min(len.div_ceil(span)).max(1);
        let mut stages = Vec::new();
        let mut n = len;
        loop {
            stages.push((n, groups));
            if groups == 1 {
                break;
            }
            n = groups;
            groups = n.div_ceil(span).max(1);
        }
        Self { local_size, stages }
    }

    /// Groups launched by the first stage
    pub(crate) fn first_groups(&self) -> usize {
        self.stages[0].1
    }

    /// Scratch accumulators the plan needs (two regions of `first_groups`)
    pub(crate) fn scratch_len(&self) -> usize {
        2 * self.first_groups()
    }

    pub(crate) fn num_stages(&self) -> usize {
        self.stages.len()
    }
}

impl Executor {
    /// Submit a reduction, allocating scratch for the partial results
    ///
    /// # Errors
    /// - `InvalidArgument` if `dest` is empty or the source contains an assignment
    /// - `ShapeMismatch` if the source leaves differ in length
    /// - `OutOfMemory` if scratch cannot be allocated
    pub fn reduce<T: Element, R: Reducer<T>>(&self, reduction: Reduction<T, R>) -> Result<Event> {
        let plan = self.plan_reduction(&reduction)?;
        let scratch = if plan.num_stages() > 1 {
            Some(self.allocate::<R::Acc>(plan.scratch_len())?)
        } else {
            None
        };
        self.submit_reduction(reduction, plan, scratch)
    }

    /// Submit a reduction using caller-provided scratch
    ///
    /// `scratch` must hold at least `2 * num_groups` accumulators, where
    /// `num_groups` is the first-stage group count after capping by the input
    /// length.
    ///
    /// # Errors
    /// - `InvalidArgument` if `scratch` is too small or belongs to another executor
    /// - `AliasedOperands` if the used scratch region overlaps the source or `dest`
    pub fn reduce_with_scratch<T: Element, R: Reducer<T>>(
        &self,
        reduction: Reduction<T, R>,
        scratch: &Buffer<R::Acc>,
    ) -> Result<Event> {
        let plan = self.plan_reduction(&reduction)?;
        self.check_owned("scratch", scratch)?;
        if scratch.len() < plan.scratch_len() {
            return Err(Error::invalid_argument(
                "scratch",
                format!(
                    "holds {} accumulators, reduction over {} groups needs {}",
                    scratch.len(),
                    plan.first_groups(),
                    plan.scratch_len()
                ),
            ));
        }
        let used = Span::new(scratch.id(), 0, plan.scratch_len());
        let aliased = used.overlaps(&reduction.dest.span())
            || source_leaves(&reduction.source)
                .iter()
                .any(|leaf| used.overlaps(&leaf.span()));
        if aliased {
            return Err(Error::AliasedOperands { op: "reduce" });
        }
        self.submit_reduction(reduction, plan, Some(scratch.clone()))
    }

    fn plan_reduction<T: Element, R: Reducer<T>>(
        &self,
        reduction: &Reduction<T, R>,
    ) -> Result<StagePlan> {
        if reduction.dest.is_empty() {
            return Err(Error::invalid_argument(
                "dest",
                "reduction destination must hold at least one element",
            ));
        }
        if reduction.source.is_assignment() {
            return Err(Error::invalid_argument(
                "source",
                "reduction source must be a value expression",
            ));
        }
        self.check_owned("dest", reduction.dest.buffer())?;
        for leaf in source_leaves(&reduction.source) {
            self.check_owned("source", leaf.buffer())?;
        }
        let len = reduction.len();
        check_lengths(&reduction.source, len)?;

        let local = self.clamp_local_size(
            reduction
                .local_size
                .unwrap_or(self.config().reduce_local_size),
        );
        let global = reduction
            .global_size
            .unwrap_or_else(|| local.saturating_mul(self.config().reduce_groups));
        Ok(StagePlan::new(len, local, global))
    }

    fn submit_reduction<T: Element, R: Reducer<T>>(
        &self,
        reduction: Reduction<T, R>,
        plan: StagePlan,
        scratch: Option<Buffer<R::Acc>>,
    ) -> Result<Event> {
        let mut source = Some(compile_value(&reduction.source)?);
        let region = plan.first_groups();
        let mut events = Vec::with_capacity(plan.num_stages());

        for (stage, &(len, groups)) in plan.stages.iter().enumerate() {
            let load: LoadFn<R::Acc> = match (source.take(), &scratch) {
                (Some(value), _) => Box::new(move |i| R::lift(i, value(i))),
                (None, Some(scratch)) => {
                    let memory = scratch.memory().clone();
                    let base = ((stage - 1) % 2) * region;
                    // SAFETY: the previous stage wrote `len` partials at `base`.
                    Box::new(move |i| unsafe { memory.read(base + i) })
                }
                (None, None) => {
                    return Err(Error::invalid_argument("scratch", "missing for multi-stage reduction"));
                }
            };
            let store: StoreFn<R::Acc> = match (&scratch, groups) {
                (_, 1) => {
                    let dest = reduction.dest.clone();
                    // SAFETY: the only group of the final stage writes dest[0].
                    Box::new(move |_, acc| unsafe { dest.write(0, acc) })
                }
                (Some(scratch), _) => {
                    let memory = scratch.memory().clone();
                    let base = (stage % 2) * region;
                    // SAFETY: group g writes slot base + g only; base + g < 2 * region.
                    Box::new(move |g, acc| unsafe { memory.write(base + g, acc) })
                }
                (None, _) => {
                    return Err(Error::invalid_argument("scratch", "missing for multi-stage reduction"));
                }
            };

            log::trace!(
                "{} stage {}: {} inputs, {} groups of {}",
                R::NAME,
                stage,
                len,
                groups,
                plan.local_size
            );
            let kernel = StageKernel::<T, R>::new(len, load, store);
            let range = NdRange::from_groups(groups, plan.local_size);
            events.push(self.launch(kernel, range, Schedule::Parallel)?);
        }

        self.join(R::NAME, events)
    }
}
