//! Reduction operators

use crate::dtype::{DeviceRepr, Element, IndexValue};

/// An associative, commutative combine step with an identity
///
/// `lift` turns source element `index` into an accumulator; the first stage of
/// a reduction lifts, later stages only combine partial accumulators.
pub trait Reducer<T: Element>: Copy + Send + Sync + 'static {
    /// Accumulator stored in local memory, scratch and the destination
    type Acc: DeviceRepr;

    /// Name used in logs
    const NAME: &'static str;

    /// Value that leaves any accumulator unchanged
    fn identity() -> Self::Acc;

    /// Accumulator for a single source element
    fn lift(index: usize, value: T) -> Self::Acc;

    /// Merge two accumulators
    fn combine(a: Self::Acc, b: Self::Acc) -> Self::Acc;
}

/// Sum of elements
#[derive(Copy, Clone, Debug, Default)]
pub struct Sum;

/// Sum of absolute values
#[derive(Copy, Clone, Debug, Default)]
pub struct AbsSum;

/// Position of the element with the largest absolute value
#[derive(Copy, Clone, Debug, Default)]
pub struct MaxIndex;

/// Position of the element with the smallest absolute value
#[derive(Copy, Clone, Debug, Default)]
pub struct MinIndex;

impl<T: Element> Reducer<T> for Sum {
    type Acc = T;
    const NAME: &'static str = "sum";

    #[inline]
    fn identity() -> T {
        T::zero()
    }

    #[inline]
    fn lift(_index: usize, value: T) -> T {
        value
    }

    #[inline]
    fn combine(a: T, b: T) -> T {
        a + b
    }
}

impl<T: Element> Reducer<T> for AbsSum {
    type Acc = T;
    const NAME: &'static str = "abs_sum";

    #[inline]
    fn identity() -> T {
        T::zero()
    }

    #[inline]
    fn lift(_index: usize, value: T) -> T {
        value.abs()
    }

    #[inline]
    fn combine(a: T, b: T) -> T {
        a + b
    }
}

impl<T: Element> Reducer<T> for MaxIndex {
    type Acc = IndexValue<T>;
    const NAME: &'static str = "max_index";

    #[inline]
    fn identity() -> IndexValue<T> {
        IndexValue::empty()
    }

    #[inline]
    fn lift(index: usize, value: T) -> IndexValue<T> {
        IndexValue::new(index, value.abs())
    }

    #[inline]
    fn combine(a: IndexValue<T>, b: IndexValue<T>) -> IndexValue<T> {
        a.pick_max(b)
    }
}

impl<T: Element> Reducer<T> for MinIndex {
    type Acc = IndexValue<T>;
    const NAME: &'static str = "min_index";

    #[inline]
    fn identity() -> IndexValue<T> {
        IndexValue::empty()
    }

    #[inline]
    fn lift(index: usize, value: T) -> IndexValue<T> {
        IndexValue::new(index, value.abs())
    }

    #[inline]
    fn combine(a: IndexValue<T>, b: IndexValue<T>) -> IndexValue<T> {
        a.pick_min(b)
    }
}
