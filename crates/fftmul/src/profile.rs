//! Multiplication profiles: how many primes and how many bits per
//! coefficient to use for given operand lengths.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive};

use crate::constants::{BLK_SZ, LG_BLK_SZ, MAX_TRANSFORM_DEPTH};
use crate::crt::{self, CrtData};
use crate::error::FftError;
use crate::layout::BlockLayout;

/// `(primes, bits per coefficient)` pairs the profile table is built from.
pub const LADDER: [(usize, u32); 13] = [
    (3, 68),
    (4, 92),
    (3, 64),
    (4, 88),
    (5, 112),
    (3, 60),
    (4, 84),
    (5, 108),
    (4, 80),
    (5, 104),
    (6, 128),
    (7, 148),
    (8, 164),
];

/// Number of primes in a profile, bound to its reconstruction width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProfileKind {
    Primes3,
    Primes4,
    Primes5,
    Primes6,
    Primes7,
    Primes8,
}

impl ProfileKind {
    /// Every kind, by increasing prime count.
    pub const ALL: [ProfileKind; 6] = [
        ProfileKind::Primes3,
        ProfileKind::Primes4,
        ProfileKind::Primes5,
        ProfileKind::Primes6,
        ProfileKind::Primes7,
        ProfileKind::Primes8,
    ];

    /// Kind for `nprimes` primes, if supported.
    #[must_use]
    pub fn from_count(nprimes: usize) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.nprimes() == nprimes)
    }

    /// Number of primes.
    #[must_use]
    pub fn nprimes(self) -> usize {
        match self {
            ProfileKind::Primes3 => 3,
            ProfileKind::Primes4 => 4,
            ProfileKind::Primes5 => 5,
            ProfileKind::Primes6 => 6,
            ProfileKind::Primes7 => 7,
            ProfileKind::Primes8 => 8,
        }
    }

    /// Words in the reconstruction accumulator, which must hold
    /// `nprimes * P` for the prime product `P`. [`reconstruct`](Self::reconstruct)
    /// is instantiated at this width.
    #[must_use]
    pub fn limbs(self) -> usize {
        match self {
            ProfileKind::Primes3 => 3,
            ProfileKind::Primes4 | ProfileKind::Primes5 => 4,
            ProfileKind::Primes6 => 5,
            ProfileKind::Primes7 => 6,
            ProfileKind::Primes8 => 7,
        }
    }

    /// Rebuild the product from canonical per-prime residues.
    pub(crate) fn reconstruct(
        self,
        crt: &CrtData,
        layout: BlockLayout,
        residues: &[&[f64]],
        bits: u32,
        ncoeffs: usize,
        z: &mut [u64],
    ) {
        match self {
            ProfileKind::Primes3 => {
                crt::reconstruct::<3, 3>(crt, layout, residues, bits, ncoeffs, z);
            }
            ProfileKind::Primes4 => {
                crt::reconstruct::<4, 4>(crt, layout, residues, bits, ncoeffs, z);
            }
            ProfileKind::Primes5 => {
                crt::reconstruct::<5, 4>(crt, layout, residues, bits, ncoeffs, z);
            }
            ProfileKind::Primes6 => {
                crt::reconstruct::<6, 5>(crt, layout, residues, bits, ncoeffs, z);
            }
            ProfileKind::Primes7 => {
                crt::reconstruct::<7, 6>(crt, layout, residues, bits, ncoeffs, z);
            }
            ProfileKind::Primes8 => {
                crt::reconstruct::<8, 7>(crt, layout, residues, bits, ncoeffs, z);
            }
        }
    }
}

/// One row of the profile table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProfileEntry {
    pub kind: ProfileKind,
    /// Bits per coefficient.
    pub bits: u32,
    /// Largest smaller-operand length, in limbs, whose coefficients stay
    /// below the prime product, capped by [`depth_cap`].
    pub bn_bound: usize,
    /// Deepest transform all of the profile's primes support.
    pub max_depth: u32,
}

impl ProfileEntry {
    /// Whether this profile can multiply operands of `an >= bn` limbs.
    #[must_use]
    pub fn covers(&self, an: usize, bn: usize) -> bool {
        bn <= self.bn_bound
            && MulShape::new(an, bn, self.bits).is_ok_and(|s| s.depth <= self.max_depth)
    }
}

/// Largest smaller operand, in limbs, whose balanced product still fits a
/// transform of depth [`MAX_TRANSFORM_DEPTH`] at `bits` bits per coefficient.
///
/// At this length the operand splits into exactly `2^(MAX_TRANSFORM_DEPTH - 1)`
/// coefficients.
#[must_use]
pub fn depth_cap(bits: u32) -> BigUint {
    (BigUint::one() << (MAX_TRANSFORM_DEPTH - 1)) * bits / 64u32
}

/// Smaller-operand bound for `bits`-bit coefficients under the prime
/// product `product`.
///
/// A product coefficient is a sum of at most `ceil(64 * bn / bits)` terms
/// below `(2^bits - 1)^2`, which must stay below `product`. The largest
/// such `bn` is returned, clamped to [`depth_cap`] since no longer operand
/// can be transformed anyway.
#[must_use]
pub fn operand_bound(product: &BigUint, bits: u32) -> usize {
    let one = BigUint::one();
    let digit_max = (&one << bits) - &one;
    let terms = (product - &one) / (&digit_max * &digit_max);
    (terms * bits / 64u32)
        .min(depth_cap(bits))
        .to_usize()
        .unwrap_or(usize::MAX)
}

/// Profiles sorted by increasing operand bound.
#[derive(Clone, Debug)]
pub struct ProfileTable {
    entries: Vec<ProfileEntry>,
}

impl ProfileTable {
    /// Most entries a table holds.
    pub const CAPACITY: usize = LADDER.len();

    /// Build the table for a prime sequence. `max_depths[i]` is the
    /// deepest transform prime `i` supports.
    #[must_use]
    pub fn new(primes: &[u64], max_depths: &[u32]) -> Self {
        debug_assert_eq!(primes.len(), max_depths.len());
        let mut entries = Vec::with_capacity(Self::CAPACITY);
        for &(np, bits) in &LADDER {
            let Some(kind) = ProfileKind::from_count(np) else {
                continue;
            };
            if np > primes.len() {
                continue;
            }
            let product: BigUint = primes[..np].iter().map(|&p| BigUint::from(p)).product();
            let max_depth = max_depths[..np].iter().copied().min().unwrap_or(0);
            entries.push(ProfileEntry {
                kind,
                bits,
                bn_bound: operand_bound(&product, bits),
                max_depth,
            });
        }
        entries.sort_by_key(|e| e.bn_bound);
        Self { entries }
    }

    /// Entries in selection order.
    #[must_use]
    pub fn entries(&self) -> &[ProfileEntry] {
        &self.entries
    }

    /// First profile covering operands of `an` and `bn` limbs (either
    /// order), with the resulting transform shape.
    pub fn select(&self, an: usize, bn: usize) -> Result<(ProfileEntry, MulShape), FftError> {
        let (an, bn) = if an >= bn { (an, bn) } else { (bn, an) };
        for &e in &self.entries {
            if e.covers(an, bn) {
                return Ok((e, MulShape::new(an, bn, e.bits)?));
            }
        }
        Err(FftError::OperandTooLarge { an, bn })
    }
}

/// Transform geometry of one multiplication.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MulShape {
    /// Bits per coefficient.
    pub bits: u32,
    /// Coefficients of the larger operand.
    pub alen: usize,
    /// Coefficients of the smaller operand.
    pub blen: usize,
    /// Coefficients of the product.
    pub zlen: usize,
    /// Transform outputs computed, a block multiple.
    pub trunc: usize,
    /// Log2 of the transform length.
    pub depth: u32,
    /// Non-zero inputs of the larger operand, rounded to a block.
    pub itrunc_a: usize,
    /// Non-zero inputs of the smaller operand, rounded to a block.
    pub itrunc_b: usize,
}

impl MulShape {
    /// Shape for non-empty operands of `an >= bn` limbs.
    ///
    /// # Errors
    ///
    /// [`FftError::OperandTooLarge`] when the coefficient counts do not fit
    /// in a `usize`.
    pub fn new(an: usize, bn: usize, bits: u32) -> Result<Self, FftError> {
        let too_large = || FftError::OperandTooLarge { an, bn };
        let bits_us = bits as usize;
        let coeffs = |n: usize| n.checked_mul(64).map(|x| x.div_ceil(bits_us));
        let (Some(alen), Some(blen)) = (coeffs(an), coeffs(bn)) else {
            return Err(too_large());
        };
        let zlen = alen.checked_add(blen).ok_or_else(too_large)?.saturating_sub(1);
        let depth = zlen
            .checked_next_power_of_two()
            .ok_or_else(too_large)?
            .trailing_zeros()
            .max(LG_BLK_SZ);
        let block = |n: usize| n.checked_next_multiple_of(BLK_SZ).ok_or_else(too_large);
        Ok(Self {
            bits,
            alen,
            blen,
            zlen,
            trunc: block(zlen)?,
            depth,
            itrunc_a: block(alen)?,
            itrunc_b: block(blen)?,
        })
    }

    /// Buffer geometry for the transform.
    #[must_use]
    pub fn layout(&self) -> BlockLayout {
        BlockLayout::new(self.depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_PRIME, MAX_PRIMES, MAX_TRANSFORM_DEPTH};
    use crate::nmod;

    fn primes() -> Vec<u64> {
        let mut primes = vec![DEFAULT_PRIME];
        let mut p = DEFAULT_PRIME;
        while primes.len() < MAX_PRIMES {
            p = nmod::next_fft_number(p).unwrap();
            if nmod::is_prime(p) {
                primes.push(p);
            }
        }
        primes
    }

    fn table() -> ProfileTable {
        let primes = primes();
        let depths: Vec<u32> = primes
            .iter()
            .map(|&p| (p - 1).trailing_zeros().min(MAX_TRANSFORM_DEPTH))
            .collect();
        ProfileTable::new(&primes, &depths)
    }

    #[test]
    fn table_is_sorted_and_complete() {
        let t = table();
        assert_eq!(t.entries().len(), ProfileTable::CAPACITY);
        assert!(t.entries().windows(2).all(|w| w[0].bn_bound <= w[1].bn_bound));
        assert_eq!(t.entries()[0].kind, ProfileKind::Primes3);
        assert_eq!(t.entries()[0].bits, 68);
    }

    #[test]
    fn bound_is_exact_or_depth_capped() {
        let primes = primes();
        let one = BigUint::one();
        for e in table().entries() {
            let np = e.kind.nprimes();
            let product: BigUint = primes[..np].iter().map(|&p| BigUint::from(p)).product();
            let digit = (&one << e.bits) - &one;
            let largest_term = &digit * &digit;
            let terms = |bn: &BigUint| (bn * 64u32 + (e.bits - 1)) / e.bits;
            let bound = BigUint::from(e.bn_bound);
            assert!(terms(&bound) * &largest_term < product, "{e:?} admits overflow");
            let cap = depth_cap(e.bits);
            if bound < cap {
                assert!(
                    terms(&(&bound + &one)) * &largest_term >= product,
                    "{e:?} is not tight"
                );
            } else {
                assert_eq!(bound, cap, "{e:?} exceeds the depth cap");
            }
        }
    }

    #[test]
    fn bounds_are_finite_and_transformable() {
        let t = table();
        let widest = t.entries().last().unwrap();
        assert_eq!((widest.kind, widest.bits), (ProfileKind::Primes8, 164));
        assert_eq!(BigUint::from(widest.bn_bound), depth_cap(164));
        assert!(widest.bn_bound < usize::MAX);
        for e in t.entries() {
            let shape = MulShape::new(e.bn_bound, e.bn_bound, e.bits).unwrap();
            assert!(shape.depth <= MAX_TRANSFORM_DEPTH, "{e:?} gives {shape:?}");
        }
    }

    #[test]
    fn accumulator_width_holds_the_crt_sum() {
        let primes = primes();
        for kind in ProfileKind::ALL {
            let np = kind.nprimes();
            let crt = CrtData::new(&primes[..np]);
            assert!(crt.coeff_len() <= kind.limbs(), "{kind:?}");
            let product: BigUint = primes[..np].iter().map(|&p| BigUint::from(p)).product();
            let sum_bound = product * np;
            assert!(sum_bound.bits() <= 64 * kind.limbs() as u64, "{kind:?}");
            assert_eq!(ProfileKind::from_count(np), Some(kind));
        }
    }

    #[test]
    fn selection_is_first_covering_entry() {
        let t = table();
        let first = t.entries()[0];
        let (e, shape) = t.select(10, 10).unwrap();
        assert_eq!(e, first);
        assert_eq!(shape.bits, 68);
        assert_eq!(shape.alen, 10);
        assert_eq!(shape.zlen, 19);
        assert_eq!(shape.trunc, 256);
        assert_eq!(shape.depth, 8);

        let (e, _) = t.select(first.bn_bound + 1, first.bn_bound + 1).unwrap();
        assert_ne!(e, first);
        assert!(e.bn_bound > first.bn_bound);
    }

    #[test]
    fn selection_is_symmetric_and_monotone() {
        let t = table();
        let mut last = 0;
        for bn in [1, 100, 10_000, 1_000_000, 50_000_000] {
            let (e, _) = t.select(bn, bn).unwrap();
            assert_eq!(t.select(bn, 3 * bn).unwrap(), t.select(3 * bn, bn).unwrap());
            let rank = t.entries().iter().position(|x| *x == e).unwrap();
            assert!(rank >= last);
            last = rank;
        }
    }

    #[test]
    fn oversized_operands_are_rejected() {
        let t = table();
        let huge = usize::MAX / 256;
        assert_eq!(
            t.select(huge, huge),
            Err(FftError::OperandTooLarge { an: huge, bn: huge })
        );
    }

    #[test]
    fn overflowing_lengths_are_rejected() {
        let t = table();
        let long = 1 << 58;
        assert_eq!(
            t.select(long, 1),
            Err(FftError::OperandTooLarge { an: long, bn: 1 })
        );
        assert_eq!(
            t.select(1, long),
            Err(FftError::OperandTooLarge { an: long, bn: 1 })
        );
        assert_eq!(
            t.select(usize::MAX, usize::MAX),
            Err(FftError::OperandTooLarge { an: usize::MAX, bn: usize::MAX })
        );
        assert!(MulShape::new(usize::MAX, 1, 64).is_err());
        assert!(MulShape::new(usize::MAX / 64, usize::MAX / 64, 1).is_err());
        assert!(!t.entries()[0].covers(long, 1));
    }

    #[test]
    fn shape_geometry() {
        let s = MulShape::new(100, 30, 64).unwrap();
        assert_eq!((s.alen, s.blen, s.zlen), (100, 30, 129));
        assert_eq!(s.depth, 8);
        assert_eq!(s.itrunc_a, 256);
        let s = MulShape::new(1000, 1000, 92).unwrap();
        assert_eq!(s.alen, 696);
        assert_eq!(s.zlen, 1391);
        assert_eq!(s.trunc, 1536);
        assert_eq!(s.depth, 11);
    }
}
