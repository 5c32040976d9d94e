//! Device runtime: execution context, memory and kernel dispatch
//!
//! The runtime emulates an accelerator on the host. Kernels are written against
//! the work-group model of [`launch`] and run on the thread pool; every executor
//! serves its submissions through one in-order queue.
//!
//! # Architecture
//!
//! ```text
//! Executor (one per device)
//! ├── Device (capabilities: local memory, work-group limit, class)
//! ├── ExecutorConfig (launch defaults, memory budget)
//! ├── DeviceAllocator (aligned zeroed allocations, usage tracking)
//! └── CommandQueue (FIFO worker thread, returns Events)
//! ```

mod allocator;
mod config;
mod device;
mod executor;
mod launch;
mod memory;
mod queue;

pub use allocator::{ALLOC_ALIGN, Allocator, DeviceAllocator};
pub use config::{
    DEFAULT_CACHE_LINE_BYTES, DEFAULT_EXECUTE_LOCAL_SIZE, DEFAULT_GEMM_WG_SIZE,
    DEFAULT_REDUCE_GROUPS, DEFAULT_REDUCE_LOCAL_SIZE, ExecutorConfig,
};
pub use device::{Device, DeviceBuilder, DeviceClass, DeviceKind, LocalMemoryKind};
pub use executor::Executor;
pub use launch::{Kernel, NdRange, Schedule, WorkGroup};
pub use memory::{Buffer, BufferId, DevicePtr};
pub use queue::{Event, EventStatus};

#[cfg(test)]
pub(crate) use launch::dispatch;
