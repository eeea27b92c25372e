//! Blocked buffer layout.
//!
//! A transform of depth `d` stores `2^d` doubles as `2^(d-8)` blocks of 256.
//! Block `I` starts at [`blk_offset`]`(I)`: blocks are contiguous except for
//! a four-double gap after every 4096 blocks, which keeps consecutive large
//! strides from mapping onto the same cache sets. [`BlockLayout`] is the only
//! place that turns a logical index into a buffer offset.

use crate::constants::{BLK_SHIFT, BLK_SZ, LG_BLK_SZ, VEC_SZ};

/// Physical offset of the first element of block `block`.
#[inline]
#[must_use]
pub const fn blk_offset(block: usize) -> usize {
    (block << LG_BLK_SZ) + VEC_SZ * (block >> (BLK_SHIFT + 2))
}

/// Position, inside its block, of the transform output with logical index `i`.
///
/// Forward transforms leave each 16-element group transposed as a 4x4 matrix;
/// this undoes that on read.
#[inline]
#[must_use]
pub const fn fft_slot(i: usize) -> usize {
    (i & (BLK_SZ - 16)) | ((i & 3) << 2) | ((i >> 2) & 3)
}

/// Geometry of a transform buffer of a given depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLayout {
    depth: u32,
}

impl BlockLayout {
    /// Layout for transforms of length `2^depth`, `depth >= 8`.
    #[must_use]
    pub fn new(depth: u32) -> Self {
        assert!(
            depth >= LG_BLK_SZ,
            "transform depth {depth} is below one block"
        );
        Self { depth }
    }

    /// Log2 of the transform length.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Transform length.
    #[must_use]
    pub fn len(&self) -> usize {
        1 << self.depth
    }

    /// Number of blocks.
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        1 << (self.depth - LG_BLK_SZ)
    }

    /// Number of doubles a buffer for this layout must hold.
    #[must_use]
    pub fn data_size(&self) -> usize {
        blk_offset(self.num_blocks())
    }

    /// Offset of logical (natural-order) index `i`.
    #[inline]
    #[must_use]
    pub fn offset(&self, i: usize) -> usize {
        blk_offset(i >> LG_BLK_SZ) + (i & (BLK_SZ - 1))
    }

    /// Offset of transform output `i`.
    #[inline]
    #[must_use]
    pub fn fft_offset(&self, i: usize) -> usize {
        blk_offset(i >> LG_BLK_SZ) + fft_slot(i & (BLK_SZ - 1))
    }

    /// Read logical index `i`.
    #[must_use]
    pub fn get(&self, data: &[f64], i: usize) -> f64 {
        data[self.offset(i)]
    }

    /// Write logical index `i`.
    pub fn set(&self, data: &mut [f64], i: usize, value: f64) {
        data[self.offset(i)] = value;
    }

    /// Read transform output `i`.
    #[must_use]
    pub fn get_fft(&self, data: &[f64], i: usize) -> f64 {
        data[self.fft_offset(i)]
    }
}

/// A run of consecutive blocks borrowed from a transform buffer.
///
/// Splitting yields disjoint views, so the two halves of a butterfly level
/// can be handed to separate tasks.
pub struct Blocks<'a> {
    data: &'a mut [f64],
    first: usize,
    count: usize,
}

impl<'a> Blocks<'a> {
    /// View all blocks of `layout` in `data`.
    pub fn new(data: &'a mut [f64], layout: BlockLayout) -> Self {
        assert!(
            data.len() >= layout.data_size(),
            "buffer of {} doubles is too small for depth {}",
            data.len(),
            layout.depth()
        );
        Self {
            data,
            first: 0,
            count: layout.num_blocks(),
        }
    }

    /// Number of blocks in the view.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the view holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    fn rel(&self, block: usize) -> usize {
        blk_offset(self.first + block) - blk_offset(self.first)
    }

    /// Mutable access to block `block` of the view.
    #[inline]
    pub fn block(&mut self, block: usize) -> &mut [f64] {
        debug_assert!(block < self.count);
        let start = self.rel(block);
        &mut self.data[start..start + BLK_SZ]
    }

    /// Split into blocks `[0, mid)` and `[mid, len)`.
    pub fn split(self, mid: usize) -> (Blocks<'a>, Blocks<'a>) {
        debug_assert!(mid <= self.count);
        let at = self.rel(mid);
        let (lo, hi) = self.data.split_at_mut(at);
        (
            Blocks {
                data: lo,
                first: self.first,
                count: mid,
            },
            Blocks {
                data: hi,
                first: self.first + mid,
                count: self.count - mid,
            },
        )
    }

    /// Shorter-lived view of the same blocks.
    pub fn reborrow(&mut self) -> Blocks<'_> {
        Blocks {
            data: &mut *self.data,
            first: self.first,
            count: self.count,
        }
    }
}
