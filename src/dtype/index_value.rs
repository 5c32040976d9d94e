//! Index-carrying accumulator for arg-max / arg-min reductions

use super::Element;
use std::cmp::Ordering;

/// An (index, value) pair reduced by `MaxIndex` / `MinIndex`
///
/// Combination keeps the pair with the extreme value and breaks ties toward the
/// lower index, so the reduction always reports the first occurrence no matter
/// how the work was split across work-groups.
///
/// NaN ranks above every number for both directions: the first NaN in the input
/// wins. Together with the index tie-break this is a total preorder, which keeps
/// the combine step associative and commutative.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Zeroable)]
pub struct IndexValue<T> {
    /// Position in the logical (strided) vector
    pub index: usize,
    /// Value observed at `index`
    pub value: T,
}

impl<T: Element> IndexValue<T> {
    const EMPTY_INDEX: usize = usize::MAX;

    /// Create a pair
    pub fn new(index: usize, value: T) -> Self {
        Self { index, value }
    }

    /// Identity of the combine step (no element seen yet)
    pub fn empty() -> Self {
        Self {
            index: Self::EMPTY_INDEX,
            value: T::zero(),
        }
    }

    /// True if this pair is the identity
    pub fn is_empty(&self) -> bool {
        self.index == Self::EMPTY_INDEX
    }

    /// Keep the pair with the larger value
    #[inline]
    pub fn pick_max(self, other: Self) -> Self {
        self.pick(other, Ordering::Greater)
    }

    /// Keep the pair with the smaller value
    #[inline]
    pub fn pick_min(self, other: Self) -> Self {
        self.pick(other, Ordering::Less)
    }

    #[inline]
    fn pick(self, other: Self, wanted: Ordering) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let ord = match (self.value.is_nan(), other.value.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => wanted,
            (false, true) => wanted.reverse(),
            (false, false) => self
                .value
                .partial_cmp(&other.value)
                .unwrap_or(Ordering::Equal),
        };
        if ord == wanted {
            self
        } else if ord == Ordering::Equal {
            if self.index <= other.index { self } else { other }
        } else {
            other
        }
    }
}
