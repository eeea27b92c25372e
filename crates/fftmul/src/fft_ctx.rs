//! Per-prime FFT context and transform plans.
//!
//! An [`FftContext`] owns one prime and two grow-only tables:
//!
//! - the root table `W`, with `W[0] = 1` and, for level `l >= 1`,
//!   `W[2^(l-1) + t] = W[t] * w_(2^(l+1))`, where `w_n` is a primitive
//!   `n`-th root of unity. Butterfly node `j` twists by `W[j]` and has
//!   children `2j` and `2j + 1`;
//! - the inverse powers of two `2^-k mod p`, used to scale inverse transforms.
//!
//! Tables cover a depth `d`; the root table then holds `2^(d-1)` entries.
//! [`FftContext::fit_depth`] grows them and hands out an [`FftPlan`], the
//! only way to run a transform, so a plan never sees a partially grown table.

use crate::constants::{BLK_SZ, INITIAL_DEPTH, LG_BLK_SZ, MAX_PRIME_BITS, MAX_TRANSFORM_DEPTH};
use crate::error::FftError;
use crate::fft_recursion;
use crate::layout::{blk_offset, BlockLayout, Blocks};
use crate::nmod;
use crate::vec4::{FloatModulus, Vec4};

/// How an inverse transform leaves its output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reduction {
    /// Values congruent to the result, bounded by about `p/2` in magnitude.
    Loose,
    /// Values folded into `[0, p)`.
    Canonical,
}

/// Transform tables for one prime.
#[derive(Debug, Clone)]
pub struct FftContext {
    prime: u64,
    modulus: FloatModulus,
    primitive_root: u64,
    max_depth: u32,
    depth: u32,
    roots: Vec<f64>,
    inv_pow2: Vec<f64>,
    half: f64,
}

impl FftContext {
    /// Validate `prime` and build tables for one-block transforms.
    pub fn new(prime: u64) -> Result<Self, FftError> {
        if prime < 3 || prime % 2 == 0 || !nmod::is_prime(prime) {
            return Err(FftError::NotPrime(prime));
        }
        if nmod::nbits(prime) > MAX_PRIME_BITS {
            return Err(FftError::PrimeTooLarge {
                prime,
                max_bits: MAX_PRIME_BITS,
            });
        }
        let valuation = (prime - 1).trailing_zeros();
        if valuation < LG_BLK_SZ {
            return Err(FftError::InsufficientRoots {
                prime,
                available: valuation,
                required: LG_BLK_SZ,
            });
        }

        let primitive_root = nmod::primitive_root(prime);
        let mut ctx = Self {
            prime,
            modulus: FloatModulus::new(prime),
            primitive_root,
            max_depth: valuation.min(MAX_TRANSFORM_DEPTH),
            depth: 0,
            roots: Vec::new(),
            inv_pow2: Vec::new(),
            half: nmod::to_symmetric(prime.div_ceil(2), prime),
        };
        ctx.grow(INITIAL_DEPTH);
        tracing::debug!(prime, primitive_root, max_depth = ctx.max_depth, "FFT context ready");
        Ok(ctx)
    }

    /// The prime modulus.
    #[must_use]
    pub fn prime(&self) -> u64 {
        self.prime
    }

    /// Reduction constants for the prime.
    #[must_use]
    pub fn modulus(&self) -> FloatModulus {
        self.modulus
    }

    /// Generator of the multiplicative group.
    #[must_use]
    pub fn primitive_root(&self) -> u64 {
        self.primitive_root
    }

    /// Deepest transform the prime supports.
    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Depth currently covered by the tables (0 after [`clear`](Self::clear)).
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The root table, in symmetric representation.
    #[must_use]
    pub fn roots(&self) -> &[f64] {
        &self.roots
    }

    /// Grow the tables to cover `depth` and return a plan for that depth.
    pub fn fit_depth(&mut self, depth: u32) -> Result<FftPlan<'_>, FftError> {
        self.check_depth(depth)?;
        if depth > self.depth {
            self.grow(depth);
        }
        Ok(FftPlan::new(self, depth))
    }

    /// Plan for `depth` if the tables already cover it.
    #[must_use]
    pub fn plan(&self, depth: u32) -> Option<FftPlan<'_>> {
        (depth >= LG_BLK_SZ && depth <= self.depth).then(|| FftPlan::new(self, depth))
    }

    /// Release the tables. A later [`fit_depth`](Self::fit_depth) rebuilds them.
    pub fn clear(&mut self) {
        self.roots = Vec::new();
        self.inv_pow2 = Vec::new();
        self.depth = 0;
    }

    fn check_depth(&self, depth: u32) -> Result<(), FftError> {
        if depth > self.max_depth {
            return Err(if depth > MAX_TRANSFORM_DEPTH {
                FftError::DepthTooLarge {
                    requested: depth,
                    max: MAX_TRANSFORM_DEPTH,
                }
            } else {
                FftError::InsufficientRoots {
                    prime: self.prime,
                    available: self.max_depth,
                    required: depth,
                }
            });
        }
        if depth < LG_BLK_SZ {
            return Err(FftError::DepthTooSmall {
                requested: depth,
                min: LG_BLK_SZ,
            });
        }
        Ok(())
    }

    /// Extend both tables to `depth`, keeping every existing entry.
    fn grow(&mut self, depth: u32) {
        let p = self.prime;
        let target = 1usize << (depth - 1);
        tracing::debug!(prime = p, from = self.depth, to = depth, "growing root table");

        if self.roots.is_empty() {
            self.roots.push(1.0);
        }
        self.roots.reserve(target - self.roots.len());
        while self.roots.len() < target {
            let len = self.roots.len();
            let level = len.trailing_zeros() + 2;
            let w = nmod::powmod(self.primitive_root, (p - 1) >> level, p);
            for t in 0..len {
                let x = nmod::mulmod(nmod::from_double(self.roots[t], p), w, p);
                self.roots.push(nmod::to_symmetric(x, p));
            }
        }

        let inv2 = p.div_ceil(2);
        if self.inv_pow2.is_empty() {
            self.inv_pow2.push(1.0);
        }
        let mut x = nmod::from_double(self.inv_pow2[self.inv_pow2.len() - 1], p);
        while self.inv_pow2.len() <= depth as usize {
            x = nmod::mulmod(x, inv2, p);
            self.inv_pow2.push(nmod::to_symmetric(x, p));
        }

        self.depth = depth;
    }
}

/// A capability to run transforms of one depth against tables that cover it.
#[derive(Clone, Copy, Debug)]
pub struct FftPlan<'a> {
    ctx: &'a FftContext,
    layout: BlockLayout,
    parallel_blocks: usize,
}

impl<'a> FftPlan<'a> {
    fn new(ctx: &'a FftContext, depth: u32) -> Self {
        Self {
            ctx,
            layout: BlockLayout::new(depth),
            parallel_blocks: usize::MAX,
        }
    }

    /// Run sub-transforms of at least `blocks` blocks on separate rayon tasks.
    #[must_use]
    pub fn with_parallel_threshold(mut self, blocks: usize) -> Self {
        self.parallel_blocks = blocks.max(2);
        self
    }

    /// Buffer geometry for this depth.
    #[must_use]
    pub fn layout(&self) -> BlockLayout {
        self.layout
    }

    /// Log2 of the transform length.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.layout.depth()
    }

    /// The prime modulus.
    #[must_use]
    pub fn prime(&self) -> u64 {
        self.ctx.prime
    }

    /// Reduction constants for the prime.
    #[must_use]
    pub fn modulus(&self) -> FloatModulus {
        self.ctx.modulus
    }

    /// Twiddle of butterfly node `j`.
    #[inline]
    pub(crate) fn root(&self, j: usize) -> f64 {
        self.ctx.roots[j]
    }

    /// Four consecutive twiddles starting at node `j`.
    #[inline]
    pub(crate) fn roots4(&self, j: usize) -> Vec4 {
        Vec4::load(&self.ctx.roots[j..])
    }

    /// Twiddles of nodes `j, j+2, j+4, j+6` and `j+1, j+3, j+5, j+7`.
    #[inline]
    pub(crate) fn roots8(&self, j: usize) -> (Vec4, Vec4) {
        Vec4::load_deinterleaved(&self.ctx.roots[j..j + 8])
    }

    /// Inverse twiddle of node `j`.
    ///
    /// Within level `l` the table lists `w * u` for a fixed `w` and all
    /// `u` of the level below, and the last entry of the level times `w`
    /// is `-1`; so the inverse sits at the mirrored position, negated.
    #[inline]
    pub(crate) fn inverse_root(&self, j: usize) -> f64 {
        if j == 0 {
            return 1.0;
        }
        let top = usize::BITS - 1 - j.leading_zeros();
        let mirrored = 3 * (1usize << top) - 1 - j;
        -self.ctx.roots[mirrored]
    }

    /// Inverse twiddles of four consecutive nodes.
    #[inline]
    pub(crate) fn inverse_roots4(&self, j: usize) -> Vec4 {
        Vec4([
            self.inverse_root(j),
            self.inverse_root(j + 1),
            self.inverse_root(j + 2),
            self.inverse_root(j + 3),
        ])
    }

    /// `1/2 mod p`, symmetric.
    #[inline]
    pub(crate) fn half(&self) -> f64 {
        self.ctx.half
    }

    /// Run `a` and `b`, concurrently when the sub-transform spans at least
    /// the parallel threshold.
    #[inline]
    pub(crate) fn join<A, B>(&self, blocks: usize, a: A, b: B)
    where
        A: FnOnce() + Send,
        B: FnOnce() + Send,
    {
        if blocks >= self.parallel_blocks {
            rayon::join(a, b);
        } else {
            a();
            b();
        }
    }

    fn check_trunc(&self, data: &[f64], trunc: usize) -> usize {
        assert!(
            trunc % BLK_SZ == 0 && trunc <= self.layout.len(),
            "truncation {trunc} must be a block multiple no larger than {}",
            self.layout.len()
        );
        assert!(data.len() >= self.layout.data_size());
        trunc / BLK_SZ
    }

    /// Truncated forward transform.
    ///
    /// Inputs `[itrunc, len)` are treated as zero and only outputs
    /// `[0, otrunc)` are produced; positions past `otrunc` are left
    /// unspecified. Inputs must be bounded by `p` in magnitude. Outputs are
    /// loose and ordered as read by [`BlockLayout::get_fft`].
    pub fn fft_trunc(&self, data: &mut [f64], itrunc: usize, otrunc: usize) {
        let it = self.check_trunc(data, itrunc);
        let ot = self.check_trunc(data, otrunc);
        let blocks = Blocks::new(data, self.layout);
        fft_recursion::fft_trunc(self, blocks, 0, it, ot);
    }

    /// Full-length forward transform.
    pub fn fft(&self, data: &mut [f64]) {
        let len = self.layout.len();
        self.fft_trunc(data, len, len);
    }

    /// Truncated inverse transform, scaled by `2^-depth`.
    ///
    /// Consumes transform outputs `[0, trunc)` as produced by
    /// [`fft_trunc`](Self::fft_trunc) and recovers inputs `[0, trunc)`,
    /// assuming the inputs past `trunc` were zero. The scaling is folded
    /// into the last butterfly stage; only [`Reduction::Canonical`] costs
    /// an extra pass.
    pub fn ifft_trunc(&self, data: &mut [f64], trunc: usize, reduction: Reduction) {
        let n = self.check_trunc(data, trunc);
        let scale = self.ctx.inv_pow2[self.depth() as usize];
        let blocks = Blocks::new(data, self.layout);
        fft_recursion::ifft_trunc(self, blocks, 0, n, n, Some(scale));
        if reduction == Reduction::Canonical {
            self.map_blocks(data, trunc, FloatModulus::canonical4);
        }
    }

    /// Truncated inverse transform without the final scaling: outputs are
    /// `2^depth` times the original inputs, as loose values.
    pub fn ifft_trunc_unscaled(&self, data: &mut [f64], trunc: usize) {
        let n = self.check_trunc(data, trunc);
        let blocks = Blocks::new(data, self.layout);
        fft_recursion::ifft_trunc(self, blocks, 0, n, n, None);
    }

    /// Full-length inverse transform, scaled by `2^-depth`.
    pub fn ifft(&self, data: &mut [f64], reduction: Reduction) {
        self.ifft_trunc(data, self.layout.len(), reduction);
    }

    /// `a[i] = a[i] * b[i] mod p` over the first `trunc` positions.
    ///
    /// Both operands are folded into `[-p/2, p/2]` first so the product is
    /// recovered exactly.
    pub fn pointwise_mul(&self, a: &mut [f64], b: &[f64], trunc: usize) {
        let nblocks = self.check_trunc(a, trunc);
        let m = self.ctx.modulus;
        for block in 0..nblocks {
            let start = blk_offset(block);
            let lhs = &mut a[start..start + BLK_SZ];
            let rhs = &b[start..start + BLK_SZ];
            for (x, y) in lhs.chunks_exact_mut(4).zip(rhs.chunks_exact(4)) {
                let u = m.reduce4(Vec4::load(x));
                let v = m.reduce4(Vec4::load(y));
                m.mulmod4(u, v).store(x);
            }
        }
    }

    /// `a[i] = a[i]^2 mod p` over the first `trunc` positions.
    pub fn pointwise_sqr(&self, a: &mut [f64], trunc: usize) {
        self.check_trunc(a, trunc);
        self.map_blocks(a, trunc, |m, x| {
            let u = m.reduce4(x);
            m.mulmod4(u, u)
        });
    }

    fn map_blocks(
        &self,
        data: &mut [f64],
        trunc: usize,
        f: impl Fn(&FloatModulus, Vec4) -> Vec4,
    ) {
        let m = self.ctx.modulus;
        for block in 0..trunc / BLK_SZ {
            let start = blk_offset(block);
            for x in data[start..start + BLK_SZ].chunks_exact_mut(4) {
                f(&m, Vec4::load(x)).store(x);
            }
        }
    }
}
