//! Tile shapes and the per-device tuning table

use crate::runtime::DeviceClass;
use std::fmt;

/// Shape of the C block computed by one work-group
///
/// A work-group is `wg_rows x wg_cols` work-items and each work-item owns an
/// `item_rows x item_cols` register tile, so a group covers
/// `(item_rows * wg_rows) x (item_cols * wg_cols)` elements of C.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TileConfig {
    /// Rows of C per work-item
    pub item_rows: usize,
    /// Columns of C per work-item
    pub item_cols: usize,
    /// Work-items along M
    pub wg_rows: usize,
    /// Work-items along N
    pub wg_cols: usize,
}

impl TileConfig {
    /// Create a tile shape
    pub const fn new(item_rows: usize, item_cols: usize, wg_rows: usize, wg_cols: usize) -> Self {
        Self {
            item_rows,
            item_cols,
            wg_rows,
            wg_cols,
        }
    }

    /// Rows of C per work-group
    pub const fn block_rows(&self) -> usize {
        self.item_rows * self.wg_rows
    }

    /// Columns of C per work-group
    pub const fn block_cols(&self) -> usize {
        self.item_cols * self.wg_cols
    }

    /// Work-items per work-group
    pub const fn wg_size(&self) -> usize {
        self.wg_rows * self.wg_cols
    }
}

impl fmt::Display for TileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tile<{}, {}, {}, {}>",
            self.item_rows, self.item_cols, self.wg_rows, self.wg_cols
        )
    }
}

/// Parameters of the blocked local-memory kernel
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockedParams {
    /// Register and work-group tiling
    pub tile: TileConfig,
    /// Prefetch the next K-tile while computing the current one
    pub double_buffer: bool,
    /// Pad the A tile stride by one element
    pub conflict_a: bool,
    /// Pad the B tile stride by one element
    pub conflict_b: bool,
}

impl BlockedParams {
    /// Blocked parameters without double buffering or padding
    pub const fn new(tile: TileConfig) -> Self {
        Self {
            tile,
            double_buffer: false,
            conflict_a: false,
            conflict_b: false,
        }
    }

    /// Enable or disable double buffering
    pub const fn with_double_buffer(mut self, on: bool) -> Self {
        self.double_buffer = on;
        self
    }

    /// Enable or disable conflict padding of the A and B tiles
    pub const fn with_conflict_padding(mut self, a: bool, b: bool) -> Self {
        self.conflict_a = a;
        self.conflict_b = b;
        self
    }

    /// K-tile depth: elements of `T` per cache line (at least 1)
    pub fn k_tile<T>(&self, cache_line_bytes: usize) -> usize {
        (cache_line_bytes / std::mem::size_of::<T>()).max(1)
    }

    /// Elements of one A tile buffer
    pub(crate) fn a_tile_len(&self, k_tile: usize) -> usize {
        k_tile * (self.tile.block_rows() + usize::from(self.conflict_a))
    }

    /// Elements of one B tile buffer
    pub(crate) fn b_tile_len(&self, k_tile: usize) -> usize {
        self.tile.block_cols() * (k_tile + usize::from(self.conflict_b))
    }

    /// Local memory bytes the staged tiles occupy
    pub fn local_memory_bytes<T>(&self, cache_line_bytes: usize) -> usize {
        let k_tile = self.k_tile::<T>(cache_line_bytes);
        let buffers = if self.double_buffer { 2 } else { 1 };
        buffers * (self.a_tile_len(k_tile) + self.b_tile_len(k_tile)) * std::mem::size_of::<T>()
    }
}

/// Tuned blocked parameters for a device class and problem size
///
/// Sizes without a dedicated entry get the class default.
pub fn tuned_params(class: DeviceClass, m: usize, n: usize, k: usize) -> BlockedParams {
    match (class, (m, n, k)) {
        (DeviceClass::IntelGpu, (1024, 4096, 1024)) => {
            BlockedParams::new(TileConfig::new(4, 4, 16, 16))
        }
        (DeviceClass::IntelGpu, (10, 1024, 1024)) => BlockedParams::new(TileConfig::new(2, 2, 8, 8)),
        (DeviceClass::IntelGpu, _) => BlockedParams::new(TileConfig::new(8, 8, 8, 8)),
        (_, (10, 1024, 1024)) => {
            BlockedParams::new(TileConfig::new(1, 1, 16, 16)).with_double_buffer(true)
        }
        (_, _) => BlockedParams::new(TileConfig::new(8, 8, 16, 16)),
    }
}
