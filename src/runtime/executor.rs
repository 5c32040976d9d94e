//! Device execution context

use super::allocator::{Allocator, DeviceAllocator};
use super::config::ExecutorConfig;
use super::device::{Device, DeviceClass};
use super::launch::{Kernel, NdRange, Schedule, dispatch};
use super::memory::{Buffer, DevicePtr};
use super::queue::{CommandQueue, Event};
use crate::dtype::DeviceRepr;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Owns a device's command queue and allocator and dispatches kernels
///
/// Kernel submissions (`execute`, `reduce`, GEMM) return an [`Event`] without
/// waiting. Host transfers block until the transfer has run in queue order, so
/// they also observe every kernel submitted before them.
///
/// Buffers belong to the executor that allocated them; every other executor
/// rejects them with `InvalidArgument`. Submissions to one executor run in
/// order, so the executor does no locking on buffers.
pub struct Executor {
    device: Device,
    config: ExecutorConfig,
    allocator: DeviceAllocator,
    queue: CommandQueue,
}

impl Executor {
    /// Create an executor with configuration taken from the environment
    pub fn new(device: Device) -> Result<Self> {
        Self::with_config(device, ExecutorConfig::from_env())
    }

    /// Create an executor for the host device
    pub fn host() -> Result<Self> {
        Self::new(Device::host())
    }

    /// Create an executor with an explicit configuration
    pub fn with_config(device: Device, config: ExecutorConfig) -> Result<Self> {
        let queue = CommandQueue::new(&device.id().to_string())?;
        log::info!(
            "numblas executor on {device}: class {:?}, local memory {:?} ({} bytes), max work-group {}",
            device.class(),
            device.local_memory(),
            device.local_memory_bytes(),
            device.max_work_group_size(),
        );
        Ok(Self {
            allocator: DeviceAllocator::new(config.memory_limit),
            device,
            config,
            queue,
        })
    }

    /// The device this executor drives
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Launch configuration in effect
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Device family (key of the GEMM tuning table)
    pub fn device_class(&self) -> DeviceClass {
        self.device.class()
    }

    /// True if the device has dedicated local memory
    pub fn has_local_memory(&self) -> bool {
        self.device.has_local_memory()
    }

    /// Allocate `count` zero-initialised elements
    ///
    /// Fails with `OutOfMemory` when the system allocator refuses or the
    /// configured memory limit would be exceeded.
    pub fn allocate<T: DeviceRepr>(&self, count: usize) -> Result<Buffer<T>> {
        let buffer = Buffer::allocate(count, self.allocator.clone())?;
        log::trace!(
            "allocate {:?}: {} x {} bytes",
            buffer.id(),
            count,
            std::mem::size_of::<T>()
        );
        Ok(buffer)
    }

    /// Release a buffer handle
    ///
    /// Memory is reclaimed once kernels still using the buffer have finished.
    pub fn deallocate<T: DeviceRepr>(&self, buffer: Buffer<T>) {
        log::trace!("deallocate {:?}", buffer.id());
        drop(buffer);
    }

    /// Bytes currently allocated through this executor
    pub fn allocated_bytes(&self) -> usize {
        self.allocator.allocated_bytes()
    }

    /// Copy `src` to the device, starting at `dst`; blocks until done
    pub fn copy_to_device<T: DeviceRepr>(&self, src: &[T], dst: &DevicePtr<T>) -> Result<()> {
        self.check_owned("dst", dst.buffer())?;
        check_range(dst, src.len())?;
        let data = src.to_vec();
        let memory = Arc::clone(dst.buffer().memory());
        let offset = dst.offset();
        self.queue
            .submit("copy_to_device", move || {
                // SAFETY: range checked above; queue order excludes concurrent kernels.
                unsafe { memory.write_slice(offset, &data) };
                Ok(())
            })?
            .wait()
    }

    /// Copy `dst.len()` elements starting at `src` back to the host; blocks until done
    pub fn copy_to_host<T: DeviceRepr>(&self, src: &DevicePtr<T>, dst: &mut [T]) -> Result<()> {
        self.check_owned("src", src.buffer())?;
        check_range(src, dst.len())?;
        let slot = Arc::new(Mutex::new(Vec::<T>::new()));
        let memory = Arc::clone(src.buffer().memory());
        let offset = src.offset();
        let len = dst.len();
        let out = Arc::clone(&slot);
        self.queue
            .submit("copy_to_host", move || {
                let mut staged = vec![T::zeroed(); len];
                // SAFETY: range checked above; queue order excludes concurrent kernels.
                unsafe { memory.read_slice(offset, &mut staged) };
                *out.lock() = staged;
                Ok(())
            })?
            .wait()?;
        dst.copy_from_slice(&slot.lock());
        Ok(())
    }

    /// Block until all submitted work has finished
    pub fn synchronize(&self) -> Result<()> {
        self.queue.finish()
    }

    /// Reject buffers allocated by another executor
    ///
    /// Each executor serves its buffers from its own queue thread; a buffer
    /// reaching a second queue could be read and written concurrently.
    pub(crate) fn check_owned<T: DeviceRepr>(
        &self,
        arg: &'static str,
        buffer: &Buffer<T>,
    ) -> Result<()> {
        if buffer.is_from(&self.allocator) {
            Ok(())
        } else {
            Err(Error::invalid_argument(
                arg,
                format!("{:?} belongs to another executor", buffer.id()),
            ))
        }
    }

    /// Clamp a requested work-group size to the device limit
    pub(crate) fn clamp_local_size(&self, requested: usize) -> usize {
        let max = self.device.max_work_group_size();
        if requested > max {
            log::warn!("work-group size {requested} exceeds device limit {max}; clamping");
            max
        } else {
            requested.max(1)
        }
    }

    /// Submit a kernel launch
    ///
    /// The kernel runs on the queue thread once earlier submissions finish. A
    /// panic inside `run_group` fails the returned event and nothing else.
    pub fn launch<K: Kernel>(
        &self,
        kernel: K,
        range: NdRange,
        schedule: Schedule,
    ) -> Result<Event> {
        log::debug!(
            "launch {}: global {} local {} ({} groups, {:?})",
            kernel.name(),
            range.global(),
            range.local(),
            range.num_groups(),
            schedule,
        );
        let name = kernel.name();
        self.queue.submit(name, move || {
            dispatch(&kernel, range, schedule);
            Ok(())
        })
    }

    /// One event standing for a sequence of submissions
    ///
    /// The join runs after `events` in queue order and fails with the first of
    /// their errors, so a multi-launch operation reports a failure in any step.
    pub(crate) fn join(&self, name: &'static str, events: Vec<Event>) -> Result<Event> {
        if events.len() == 1 {
            return events.into_iter().next().ok_or(Error::QueueClosed);
        }
        self.queue.submit(name, move || Event::wait_all(&events))
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        log::debug!("numblas executor on {} shutting down", self.device);
    }
}

fn check_range<T: DeviceRepr>(ptr: &DevicePtr<T>, len: usize) -> Result<()> {
    let required = ptr.offset().checked_add(len).ok_or(Error::ViewOutOfBounds {
        required: usize::MAX,
        len: ptr.buffer().len(),
    })?;
    if required > ptr.buffer().len() {
        return Err(Error::ViewOutOfBounds {
            required,
            len: ptr.buffer().len(),
        });
    }
    Ok(())
}
