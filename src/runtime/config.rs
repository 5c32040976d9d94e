//! Executor tuning configuration
//!
//! Every launch-geometry default is a starting point, not a correctness
//! requirement. Values can be set in code or overridden from the environment,
//! and the executor still clamps them to what the device reports.

use std::env;

/// Default work-group size for elementwise expression launches
pub const DEFAULT_EXECUTE_LOCAL_SIZE: usize = 128;
/// Default work-group size for reductions
pub const DEFAULT_REDUCE_LOCAL_SIZE: usize = 256;
/// Default number of work-groups a reduction is sized for (global size = groups x local size)
pub const DEFAULT_REDUCE_GROUPS: usize = 512;
/// Default work-group size of the GEMM fallback kernel
pub const DEFAULT_GEMM_WG_SIZE: usize = 128;
/// Default cache line size in bytes (sets the GEMM K-tile depth)
pub const DEFAULT_CACHE_LINE_BYTES: usize = 64;

/// Launch defaults and resource limits of an executor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Work-group size for `execute`
    pub execute_local_size: usize,
    /// Work-group size for `reduce`
    pub reduce_local_size: usize,
    /// Work-groups a reduction is sized for; the first-stage global size is
    /// `reduce_local_size * reduce_groups`, and each launched group covers two
    /// blocks of the input
    pub reduce_groups: usize,
    /// Work-group size of the no-local-memory GEMM kernel
    pub gemm_wg_size: usize,
    /// Cache line size in bytes used to size GEMM K-tiles
    pub cache_line_bytes: usize,
    /// Upper bound on bytes allocated through the executor (None = unbounded)
    pub memory_limit: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            execute_local_size: DEFAULT_EXECUTE_LOCAL_SIZE,
            reduce_local_size: DEFAULT_REDUCE_LOCAL_SIZE,
            reduce_groups: DEFAULT_REDUCE_GROUPS,
            gemm_wg_size: DEFAULT_GEMM_WG_SIZE,
            cache_line_bytes: DEFAULT_CACHE_LINE_BYTES,
            memory_limit: None,
        }
    }
}

impl ExecutorConfig {
    /// Defaults overridden by `NUMBLAS_*` environment variables
    ///
    /// - `NUMBLAS_EXECUTE_LOCAL_SIZE`
    /// - `NUMBLAS_REDUCE_LOCAL_SIZE`
    /// - `NUMBLAS_REDUCE_GROUPS`
    /// - `NUMBLAS_GEMM_WG_SIZE`
    /// - `NUMBLAS_CACHE_LINE_BYTES`
    /// - `NUMBLAS_MEMORY_LIMIT` (bytes)
    ///
    /// Unparsable or zero values are ignored.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|&v| v > 0)
        };
        if let Some(v) = get("NUMBLAS_EXECUTE_LOCAL_SIZE") {
            self.execute_local_size = v;
        }
        if let Some(v) = get("NUMBLAS_REDUCE_LOCAL_SIZE") {
            self.reduce_local_size = v;
        }
        if let Some(v) = get("NUMBLAS_REDUCE_GROUPS") {
            self.reduce_groups = v;
        }
        if let Some(v) = get("NUMBLAS_GEMM_WG_SIZE") {
            self.gemm_wg_size = v;
        }
        if let Some(v) = get("NUMBLAS_CACHE_LINE_BYTES") {
            self.cache_line_bytes = v;
        }
        if let Some(v) = get("NUMBLAS_MEMORY_LIMIT") {
            self.memory_limit = Some(v);
        }
        self
    }

    /// Set the elementwise work-group size
    pub fn with_execute_local_size(mut self, size: usize) -> Self {
        self.execute_local_size = size;
        self
    }

    /// Set the reduction work-group size and the group count its global size is built from
    pub fn with_reduce_geometry(mut self, local_size: usize, groups: usize) -> Self {
        self.reduce_local_size = local_size;
        self.reduce_groups = groups;
        self
    }

    /// Set the GEMM fallback work-group size
    pub fn with_gemm_wg_size(mut self, size: usize) -> Self {
        self.gemm_wg_size = size;
        self
    }

    /// Set the cache line size in bytes
    pub fn with_cache_line_bytes(mut self, bytes: usize) -> Self {
        self.cache_line_bytes = bytes;
        self
    }

    /// Cap total device allocations
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }
}
