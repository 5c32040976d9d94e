//! Work-group launch model
//!
//! A launch covers an [`NdRange`] of `global` work-items split into groups of
//! `local`. Work-groups are independent and run in parallel; each one gets its
//! own local-memory scratch of `Kernel::local_len` elements. Inside a group the
//! kernel walks its work-items itself, phase by phase, so a barrier is simply
//! the boundary between two loops over the local ids.

use crate::dtype::DeviceRepr;
use crate::error::{Error, Result};
use bytemuck::Zeroable;

/// Global and local extent of a one-dimensional launch
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NdRange {
    global: usize,
    local: usize,
}

impl NdRange {
    /// Create a range; `global` must be a non-zero multiple of `local`
    pub fn new(global: usize, local: usize) -> Result<Self> {
        if local == 0 {
            return Err(Error::invalid_argument("local_size", "must be at least 1"));
        }
        if global == 0 || global % local != 0 {
            return Err(Error::invalid_argument(
                "global_size",
                format!("{global} is not a non-zero multiple of local size {local}"),
            ));
        }
        Ok(Self { global, local })
    }

    /// Smallest range of `local`-sized groups covering `n` work-items (at least one group)
    pub fn covering(n: usize, local: usize) -> Self {
        let local = local.max(1);
        Self::from_groups(n.div_ceil(local).max(1), local)
    }

    /// Range of exactly `groups` groups
    pub fn from_groups(groups: usize, local: usize) -> Self {
        let local = local.max(1);
        Self {
            global: groups.max(1) * local,
            local,
        }
    }

    /// Total work-items
    pub fn global(&self) -> usize {
        self.global
    }

    /// Work-items per group
    pub fn local(&self) -> usize {
        self.local
    }

    /// Number of work-groups
    pub fn num_groups(&self) -> usize {
        self.global / self.local
    }
}

/// Position of a work-group inside its launch
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WorkGroup {
    id: usize,
    range: NdRange,
}

impl WorkGroup {
    /// Group index
    pub fn id(&self) -> usize {
        self.id
    }

    /// Work-items in this group
    pub fn local_size(&self) -> usize {
        self.range.local
    }

    /// Work-items in the whole launch
    pub fn global_size(&self) -> usize {
        self.range.global
    }

    /// Number of groups in the launch
    pub fn num_groups(&self) -> usize {
        self.range.num_groups()
    }

    /// Global id of local work-item `local_id`
    #[inline]
    pub fn global_id(&self, local_id: usize) -> usize {
        self.id * self.range.local + local_id
    }
}

/// How the groups of one launch are scheduled
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// Groups run concurrently on the thread pool
    Parallel,
    /// Groups run one after another (overlapping operands)
    Serial,
}

/// A kernel body executed once per work-group
pub trait Kernel: Send + Sync + 'static {
    /// Element type of the group's local memory
    type Local: DeviceRepr;

    /// Name used in logs and error reports
    fn name(&self) -> &'static str;

    /// Local memory elements needed per group
    fn local_len(&self, _range: &NdRange) -> usize {
        0
    }

    /// Run every work-item of `group`
    fn run_group(&self, group: &WorkGroup, local: &mut [Self::Local]);
}

/// Run all groups of a launch to completion on the calling thread's pool
pub(crate) fn dispatch<K: Kernel>(kernel: &K, range: NdRange, schedule: Schedule) {
    let local_len = kernel.local_len(&range);
    let groups = range.num_groups();

    let run = |local: &mut Vec<K::Local>, id: usize| {
        kernel.run_group(&WorkGroup { id, range }, local.as_mut_slice());
    };

    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;

        if schedule == Schedule::Parallel && groups > 1 {
            (0..groups)
                .into_par_iter()
                .for_each_init(|| vec![<K::Local as Zeroable>::zeroed(); local_len], run);
            return;
        }
    }

    let _ = schedule;
    let mut local = vec![<K::Local as Zeroable>::zeroed(); local_len];
    for id in 0..groups {
        run(&mut local, id);
    }
}
