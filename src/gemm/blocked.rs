//! Blocked GEMM staging A and B tiles in local memory
//!
//! Local memory of a group, in elements of `T`:
//!
//! ```text
//! [ A tile x buffers | B tile x buffers | C accumulators ]
//! ```
//!
//! An A tile holds `k_tile` columns of the group's row block, stored
//! `[kk][row]` with stride `block_rows + CONFLICT_A`. A B tile holds the
//! group's column block stored `[col][kk]` with stride `k_tile + CONFLICT_B`.
//! With `DOUBLE_BUFFER` there are two of each and tile `t + 1` is loaded into
//! the idle pair before tile `t` is consumed.

use super::GemmArgs;
use super::tile::BlockedParams;
use crate::dtype::Element;
use crate::error::Result;
use crate::runtime::{Event, Executor, Kernel, NdRange, Schedule, WorkGroup};

/// The part of C owned by one work-group
#[derive(Copy, Clone, Debug)]
struct Block {
    row0: usize,
    col0: usize,
    rows: usize,
    cols: usize,
}

pub(crate) struct BlockedGemm<
    T: Element,
    const TRANS_A: bool,
    const TRANS_B: bool,
    const DOUBLE_BUFFER: bool,
    const CONFLICT_A: bool,
    const CONFLICT_B: bool,
> {
    args: GemmArgs<T>,
    params: BlockedParams,
    k_tile: usize,
    groups_m: usize,
}

impl<
    T: Element,
    const TRANS_A: bool,
    const TRANS_B: bool,
    const DOUBLE_BUFFER: bool,
    const CONFLICT_A: bool,
    const CONFLICT_B: bool,
> BlockedGemm<T, TRANS_A, TRANS_B, DOUBLE_BUFFER, CONFLICT_A, CONFLICT_B>
{
    const BUFFERS: usize = if DOUBLE_BUFFER { 2 } else { 1 };

    fn block_rows(&self) -> usize {
        self.params.tile.block_rows()
    }

    fn block_cols(&self) -> usize {
        self.params.tile.block_cols()
    }

    fn a_stride(&self) -> usize {
        self.block_rows() + usize::from(CONFLICT_A)
    }

    fn b_stride(&self) -> usize {
        self.k_tile + usize::from(CONFLICT_B)
    }

    fn a_len(&self) -> usize {
        self.k_tile * self.a_stride()
    }

    fn b_len(&self) -> usize {
        self.block_cols() * self.b_stride()
    }

    fn tiles_len(&self) -> usize {
        Self::BUFFERS * (self.a_len() + self.b_len())
    }

    fn a_base(&self, buffer: usize) -> usize {
        buffer * self.a_len()
    }

    fn b_base(&self, buffer: usize) -> usize {
        Self::BUFFERS * self.a_len() + buffer * self.b_len()
    }

    /// Stage K-tile `t` of the group's A rows and B columns into `buffer`
    fn load_tile(&self, tiles: &mut [T], buffer: usize, t: usize, block: Block) {
        let args = &self.args;
        let Block {
            row0,
            col0,
            rows,
            cols,
        } = block;
        let k0 = t * self.k_tile;
        let depth = self.k_tile.min(args.k - k0);

        let (a_base, a_stride) = (self.a_base(buffer), self.a_stride());
        for kk in 0..self.k_tile {
            for r in 0..self.block_rows() {
                tiles[a_base + kk * a_stride + r] = if r < rows && kk < depth {
                    // SAFETY: row0 + r < m and k0 + kk < k.
                    unsafe { args.load_a::<TRANS_A>(row0 + r, k0 + kk) }
                } else {
                    T::zero()
                };
            }
        }

        let (b_base, b_stride) = (self.b_base(buffer), self.b_stride());
        for c in 0..self.block_cols() {
            for kk in 0..self.k_tile {
                tiles[b_base + c * b_stride + kk] = if c < cols && kk < depth {
                    // SAFETY: k0 + kk < k and col0 + c < n.
                    unsafe { args.load_b::<TRANS_B>(k0 + kk, col0 + c) }
                } else {
                    T::zero()
                };
            }
        }
    }

    /// Every work-item folds the staged K-tile into its register tile
    fn compute_tile(&self, tiles: &[T], acc: &mut [T], buffer: usize, t: usize, block: Block) {
        let Block { rows, cols, .. } = block;
        let tile = self.params.tile;
        let depth = self.k_tile.min(self.args.k - t * self.k_tile);
        let (a_base, a_stride) = (self.a_base(buffer), self.a_stride());
        let (b_base, b_stride) = (self.b_base(buffer), self.b_stride());
        let block_rows = self.block_rows();

        for wc in 0..tile.wg_cols {
            for wr in 0..tile.wg_rows {
                for ic in 0..tile.item_cols {
                    let col = ic * tile.wg_cols + wc;
                    if col >= cols {
                        continue;
                    }
                    let b_col = &tiles[b_base + col * b_stride..][..depth];
                    for ir in 0..tile.item_rows {
                        let row = ir * tile.wg_rows + wr;
                        if row >= rows {
                            continue;
                        }
                        let mut sum = acc[col * block_rows + row];
                        for (kk, &b) in b_col.iter().enumerate() {
                            sum = sum + tiles[a_base + kk * a_stride + row] * b;
                        }
                        acc[col * block_rows + row] = sum;
                    }
                }
            }
        }
    }
}

impl<
    T: Element,
    const TRANS_A: bool,
    const TRANS_B: bool,
    const DOUBLE_BUFFER: bool,
    const CONFLICT_A: bool,
    const CONFLICT_B: bool,
> Kernel for BlockedGemm<T, TRANS_A, TRANS_B, DOUBLE_BUFFER, CONFLICT_A, CONFLICT_B>
{
    type Local = T;

    fn name(&self) -> &'static str {
        "gemm_blocked"
    }

    fn local_len(&self, _range: &NdRange) -> usize {
        self.tiles_len() + self.block_rows() * self.block_cols()
    }

    fn run_group(&self, group: &WorkGroup, local: &mut [T]) {
        let args = &self.args;
        let row0 = (group.id() % self.groups_m) * self.block_rows();
        let col0 = (group.id() / self.groups_m) * self.block_cols();
        let block = Block {
            row0,
            col0,
            rows: self.block_rows().min(args.m - row0),
            cols: self.block_cols().min(args.n - col0),
        };

        let (tiles, acc) = local.split_at_mut(self.tiles_len());
        acc.fill(T::zero());

        let num_tiles = args.k.div_ceil(self.k_tile);
        if DOUBLE_BUFFER {
            self.load_tile(tiles, 0, 0, block);
            for t in 0..num_tiles {
                let current = t % 2;
                if t + 1 < num_tiles {
                    self.load_tile(tiles, 1 - current, t + 1, block);
                }
                self.compute_tile(tiles, acc, current, t, block);
            }
        } else {
            for t in 0..num_tiles {
                self.load_tile(tiles, 0, t, block);
                self.compute_tile(tiles, acc, 0, t, block);
            }
        }

        let block_rows = self.block_rows();
        for col in 0..block.cols {
            for row in 0..block.rows {
                // SAFETY: this group is the only writer of its C block.
                unsafe { args.store_c(row0 + row, col0 + col, acc[col * block_rows + row]) };
            }
        }
    }
}

/// Launch the blocked kernel for one flag combination
pub(crate) fn launch<
    T: Element,
    const TRANS_A: bool,
    const TRANS_B: bool,
    const DOUBLE_BUFFER: bool,
    const CONFLICT_A: bool,
    const CONFLICT_B: bool,
>(
    ex: &Executor,
    args: GemmArgs<T>,
    params: BlockedParams,
) -> Result<Event> {
    let tile = params.tile;
    let groups_m = args.m.div_ceil(tile.block_rows());
    let groups_n = args.n.div_ceil(tile.block_cols());
    let k_tile = params.k_tile::<T>(ex.config().cache_line_bytes);
    let range = NdRange::from_groups(groups_m * groups_n, tile.wg_size());
    let kernel = BlockedGemm::<T, TRANS_A, TRANS_B, DOUBLE_BUFFER, CONFLICT_A, CONFLICT_B> {
        args,
        params,
        k_tile,
        groups_m,
    };
    ex.launch(kernel, range, Schedule::Parallel)
}
