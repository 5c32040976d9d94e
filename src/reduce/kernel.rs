//! Work-group kernel of one reduction stage

use super::ops::Reducer;
use crate::dtype::Element;
use crate::runtime::{Kernel, NdRange, WorkGroup};
use std::marker::PhantomData;

/// Produces accumulator `i` of the stage input
pub(crate) type LoadFn<A> = Box<dyn Fn(usize) -> A + Send + Sync>;
/// Stores the partial result of work-group `g`
pub(crate) type StoreFn<A> = Box<dyn Fn(usize, A) + Send + Sync>;

/// Reduces `len` inputs to one partial per work-group
///
/// Work-item `l` of group `g` starts at `g * 2L + l`, folds the pair
/// `(i, i + L)` and advances by `2 * global`. The group then halves its local
/// accumulators until element 0 holds the group result.
pub(crate) struct StageKernel<T: Element, R: Reducer<T>> {
    len: usize,
    load: LoadFn<R::Acc>,
    store: StoreFn<R::Acc>,
    _marker: PhantomData<fn() -> (T, R)>,
}

impl<T: Element, R: Reducer<T>> StageKernel<T, R> {
    pub(crate) fn new(len: usize, load: LoadFn<R::Acc>, store: StoreFn<R::Acc>) -> Self {
        Self {
            len,
            load,
            store,
            _marker: PhantomData,
        }
    }
}

impl<T: Element, R: Reducer<T>> Kernel for StageKernel<T, R> {
    type Local = R::Acc;

    fn name(&self) -> &'static str {
        R::NAME
    }

    fn local_len(&self, range: &NdRange) -> usize {
        range.local()
    }

    fn run_group(&self, group: &WorkGroup, local: &mut [R::Acc]) {
        let l = group.local_size();
        let step = 2 * group.global_size();

        for (lid, slot) in local.iter_mut().enumerate().take(l) {
            let mut acc = R::identity();
            let mut i = group.id() * 2 * l + lid;
            while i < self.len {
                acc = R::combine(acc, (self.load)(i));
                if i + l < self.len {
                    acc = R::combine(acc, (self.load)(i + l));
                }
                i += step;
            }
            *slot = acc;
        }

        // barrier
        let mut active = l;
        while active > 1 {
            let half = active.div_ceil(2);
            for lid in 0..active / 2 {
                local[lid] = R::combine(local[lid], local[lid + half]);
            }
            active = half;
        }

        (self.store)(group.id(), local[0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::IndexValue;
    use crate::reduce::ops::{MaxIndex, Sum};
    use crate::runtime::{Schedule, dispatch};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn run<R: Reducer<f64>>(data: Vec<f64>, groups: usize, local: usize) -> Vec<R::Acc> {
        let out = Arc::new(Mutex::new(vec![R::identity(); groups]));
        let sink = Arc::clone(&out);
        let data = Arc::new(data);
        let len = data.len();
        let kernel = StageKernel::<f64, R>::new(
            len,
            Box::new(move |i| R::lift(i, data[i])),
            Box::new(move |g, acc| sink.lock()[g] = acc),
        );
        dispatch(&kernel, NdRange::from_groups(groups, local), Schedule::Parallel);
        let result = out.lock().clone();
        result
    }

    #[test]
    fn test_stage_partials_cover_all_inputs() {
        let data: Vec<f64> = (1..=1000).map(f64::from).collect();
        let partials = run::<Sum>(data, 4, 32);
        assert_eq!(partials.iter().sum::<f64>(), 500_500.0);
    }

    #[test]
    fn test_non_power_of_two_local_size() {
        let data: Vec<f64> = (0..77).map(f64::from).collect();
        let partials = run::<Sum>(data, 1, 5);
        assert_eq!(partials, vec![(0..77).sum::<i32>() as f64]);
    }

    #[test]
    fn test_index_stage() {
        let mut data = vec![1.0; 300];
        data[123] = -9.0;
        data[200] = 9.0;
        let partials = run::<MaxIndex>(data, 3, 16);
        let best = partials
            .into_iter()
            .fold(IndexValue::empty(), |a, b| a.pick_max(b));
        assert_eq!(best.index, 123);
    }
}
