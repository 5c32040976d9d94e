//! Device description and capability queries

use std::fmt;

/// Broad hardware category of a device
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Host CPU
    Cpu,
    /// Discrete or integrated GPU
    Gpu,
    /// Other accelerator
    Accelerator,
}

/// Kind of work-group shared memory a device exposes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LocalMemoryKind {
    /// Dedicated fast on-chip memory
    Local,
    /// Emulated in global memory (no speedup from staging tiles)
    Global,
    /// No work-group memory at all
    None,
}

/// Device family used as the key of the GEMM tuning table
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// Intel GPU
    IntelGpu,
    /// AMD GPU
    AmdGpu,
    /// Anything without a dedicated tuning entry
    Unsupported,
}

/// A compute device and the limits kernels must respect
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Device {
    id: usize,
    name: String,
    platform: String,
    kind: DeviceKind,
    local_memory: LocalMemoryKind,
    max_work_group_size: usize,
    local_memory_bytes: usize,
}

impl Device {
    /// The host CPU, running work-groups on the thread pool
    ///
    /// Local memory is per-work-group scratch in host RAM, which is where the
    /// blocked GEMM stages its tiles.
    pub fn host() -> Self {
        DeviceBuilder::new("host").build()
    }

    /// Start describing a device
    pub fn builder(name: impl Into<String>) -> DeviceBuilder {
        DeviceBuilder::new(name)
    }

    /// Unique identifier for this device
    pub fn id(&self) -> usize {
        self.id
    }

    /// Human-readable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Platform (driver/vendor stack) name
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Hardware category
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Kind of work-group memory
    pub fn local_memory(&self) -> LocalMemoryKind {
        self.local_memory
    }

    /// True if the device has dedicated fast local memory
    pub fn has_local_memory(&self) -> bool {
        self.local_memory == LocalMemoryKind::Local
    }

    /// Largest work-group the device accepts
    pub fn max_work_group_size(&self) -> usize {
        self.max_work_group_size
    }

    /// Bytes of local memory available to one work-group
    pub fn local_memory_bytes(&self) -> usize {
        self.local_memory_bytes
    }

    /// Classify the device from its platform name
    ///
    /// Only GPUs get a vendor class; matching is case-insensitive.
    pub fn class(&self) -> DeviceClass {
        if self.kind != DeviceKind::Gpu {
            return DeviceClass::Unsupported;
        }
        let platform = self.platform.to_lowercase();
        if platform.contains("amd") {
            DeviceClass::AmdGpu
        } else if platform.contains("intel") {
            DeviceClass::IntelGpu
        } else {
            DeviceClass::Unsupported
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {:?})", self.name, self.platform, self.kind)
    }
}

/// Builder for [`Device`]
#[derive(Clone, Debug)]
pub struct DeviceBuilder {
    device: Device,
}

impl DeviceBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            device: Device {
                id: 0,
                name: name.into(),
                platform: "numblas host".to_string(),
                kind: DeviceKind::Cpu,
                local_memory: LocalMemoryKind::Local,
                max_work_group_size: 1024,
                local_memory_bytes: 64 * 1024,
            },
        }
    }

    /// Set the device id
    pub fn id(mut self, id: usize) -> Self {
        self.device.id = id;
        self
    }

    /// Set the platform name
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.device.platform = platform.into();
        self
    }

    /// Set the hardware category
    pub fn kind(mut self, kind: DeviceKind) -> Self {
        self.device.kind = kind;
        self
    }

    /// Set the kind of local memory
    pub fn local_memory(mut self, kind: LocalMemoryKind) -> Self {
        self.device.local_memory = kind;
        self
    }

    /// Set the maximum work-group size (at least 1)
    pub fn max_work_group_size(mut self, size: usize) -> Self {
        self.device.max_work_group_size = size.max(1);
        self
    }

    /// Set the local memory capacity per work-group in bytes
    pub fn local_memory_bytes(mut self, bytes: usize) -> Self {
        self.device.local_memory_bytes = bytes;
        self
    }

    /// Finish the description
    pub fn build(self) -> Device {
        self.device
    }
}
