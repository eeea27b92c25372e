//! Operand splitting: limbs to per-prime transform inputs.
//!
//! An operand is cut into coefficients of `bits` bits each; coefficient `k`
//! covers bits `[k * bits, (k + 1) * bits)` of the limb array. A coefficient
//! is reduced modulo `p` by reading it as 32-bit pieces and summing
//! `piece_t * 2^(32t) mod p`.

use crate::constants::{MAX_PIECES, PIECE_BITS, VEC_SZ};
use crate::fft_ctx::FftPlan;
use crate::nmod;
use crate::vec4::{FloatModulus, Vec4};

/// Read `width <= 64` bits of `limbs` starting at bit `start`; bits past
/// the end read as zero.
#[inline]
#[must_use]
pub fn read_bits(limbs: &[u64], start: usize, width: u32) -> u64 {
    debug_assert!(width <= 64);
    if width == 0 {
        return 0;
    }
    let word = start / 64;
    let shift = start % 64;
    let lo = limbs.get(word).copied().unwrap_or(0) >> shift;
    let hi = if shift == 0 {
        0
    } else {
        limbs.get(word + 1).copied().unwrap_or(0) << (64 - shift)
    };
    let v = lo | hi;
    if width == 64 {
        v
    } else {
        v & ((1 << width) - 1)
    }
}

/// Number of 32-bit pieces in a coefficient of `bits` bits.
#[must_use]
pub fn pieces_for(bits: u32) -> usize {
    bits.div_ceil(PIECE_BITS) as usize
}

/// Table of `2^(32t) mod p` for one prime, grown as wider coefficients
/// are requested.
#[derive(Debug, Clone)]
pub struct PowersOfTwo {
    prime: u64,
    powers: Vec<f64>,
}

impl PowersOfTwo {
    /// Empty table for `prime`.
    #[must_use]
    pub fn new(prime: u64) -> Self {
        Self {
            prime,
            powers: Vec::new(),
        }
    }

    /// Number of pieces covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.powers.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.powers.is_empty()
    }

    /// Cover at least `pieces` pieces.
    pub fn fit(&mut self, pieces: usize) {
        debug_assert!(pieces <= MAX_PIECES);
        let p = self.prime;
        let step = nmod::powmod(2, u64::from(PIECE_BITS), p);
        let mut x = match self.powers.last() {
            Some(&w) => nmod::mulmod(nmod::from_double(w, p), step, p),
            None => 1,
        };
        while self.powers.len() < pieces {
            self.powers.push(nmod::to_symmetric(x, p));
            x = nmod::mulmod(x, step, p);
        }
    }

    /// `2^(32t) mod p`, symmetric.
    #[inline]
    #[must_use]
    pub fn get(&self, t: usize) -> f64 {
        self.powers[t]
    }

    /// Release the table.
    pub fn clear(&mut self) {
        self.powers = Vec::new();
    }
}

/// Residue of coefficients `k .. k + 4`, lane-wise.
#[inline]
#[allow(clippy::cast_precision_loss)]
fn coefficient4(
    m: &FloatModulus,
    powers: &PowersOfTwo,
    limbs: &[u64],
    bits: u32,
    k: usize,
) -> Vec4 {
    let start = |lane: usize| (k + lane) * bits as usize;
    let piece = |lane: usize, t: u32| {
        let offset = t * PIECE_BITS;
        let width = PIECE_BITS.min(bits - offset);
        read_bits(limbs, start(lane) + offset as usize, width) as f64
    };

    let mut sum = m.reduce4(Vec4(std::array::from_fn(|l| piece(l, 0))));
    let mut t = 1;
    while t * PIECE_BITS < bits {
        let x = m.reduce4(Vec4(std::array::from_fn(|l| piece(l, t))));
        sum = sum + m.mulmod4(x, Vec4::splat(powers.get(t as usize)));
        t += 1;
    }
    m.reduce4(sum)
}

/// Load the first `ncoeffs` coefficients of `limbs` into `data`, reduced
/// modulo the plan's prime, and zero positions `[ncoeffs, itrunc)`.
///
/// `powers` must cover [`pieces_for`]`(bits)` pieces.
pub fn split_operand(
    plan: &FftPlan<'_>,
    powers: &PowersOfTwo,
    limbs: &[u64],
    bits: u32,
    ncoeffs: usize,
    itrunc: usize,
    data: &mut [f64],
) {
    debug_assert!(powers.len() >= pieces_for(bits));
    debug_assert!(ncoeffs <= itrunc && itrunc <= plan.layout().len());
    let layout = plan.layout();
    let m = plan.modulus();

    let mut k = 0;
    while k < ncoeffs {
        let v = coefficient4(&m, powers, limbs, bits, k);
        // Groups of four never straddle a block.
        v.store(&mut data[layout.offset(k)..]);
        k += VEC_SZ;
    }
    for i in k..itrunc {
        layout.set(data, i, 0.0);
    }
}
