//! Chinese remainder reconstruction over a fixed prime set.
//!
//! For primes `p_0 .. p_(n-1)` with product `P`, a value `x < P` is
//! recovered from its residues `r_i` as
//!
//! ```text
//! x = sum(t_i * (P / p_i)) - q * P,   t_i = r_i * (P / p_i)^-1 mod p_i
//! ```
//!
//! where `q = floor(sum(t_i / p_i))`. The quotient is estimated in double
//! precision and corrected by at most one multiple of `P`.

use std::cmp::Ordering;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};

use crate::fft::from_limbs;
use crate::layout::BlockLayout;
use crate::limb_arith::{add_n, add_shifted, cmp_n, mul_add_scalar, sub_mul_scalar, sub_n};
use crate::nmod;
use crate::profile::ProfileKind;

/// Precomputed combination data for one prime set.
///
/// `data` holds, in order: `P` (`coeff_len` words), each cofactor `P / p_i`
/// (`coeff_len` words each), then each `(P / p_i)^-1 mod p_i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrtData {
    prime: u64,
    coeff_len: usize,
    nprimes: usize,
    moduli: Vec<u64>,
    data: Vec<u64>,
}

impl CrtData {
    /// Combination data for `primes`, which must be distinct primes.
    #[must_use]
    pub fn new(primes: &[u64]) -> Self {
        assert!(!primes.is_empty(), "CRT needs at least one prime");
        debug_assert!(
            primes
                .iter()
                .enumerate()
                .all(|(i, p)| primes[..i].iter().all(|q| p.gcd(q) == 1)),
            "CRT moduli must be pairwise coprime"
        );
        let product: BigUint = primes.iter().map(|&p| BigUint::from(p)).product();
        let coeff_len = product.to_u64_digits().len();
        let nprimes = primes.len();

        let mut data = Vec::with_capacity((nprimes + 1) * coeff_len + nprimes);
        push_padded(&mut data, &product, coeff_len);
        let cofactors: Vec<BigUint> = primes.iter().map(|&p| &product / p).collect();
        for co in &cofactors {
            push_padded(&mut data, co, coeff_len);
        }
        for (co, &p) in cofactors.iter().zip(primes) {
            let reduced = (co % p).to_u64().unwrap_or(0);
            data.push(nmod::invmod(reduced, p));
        }

        Self {
            prime: primes[nprimes - 1],
            coeff_len,
            nprimes,
            moduli: primes.to_vec(),
            data,
        }
    }

    /// Last prime of the set.
    #[must_use]
    pub fn prime(&self) -> u64 {
        self.prime
    }

    /// Number of words in `P`.
    #[must_use]
    pub fn coeff_len(&self) -> usize {
        self.coeff_len
    }

    /// Number of primes.
    #[must_use]
    pub fn nprimes(&self) -> usize {
        self.nprimes
    }

    /// The primes, in order.
    #[must_use]
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// `P` as little-endian words.
    #[must_use]
    pub fn product(&self) -> &[u64] {
        &self.data[..self.coeff_len]
    }

    /// `P / p_i` as little-endian words.
    #[must_use]
    pub fn cofactor(&self, i: usize) -> &[u64] {
        let start = (i + 1) * self.coeff_len;
        &self.data[start..start + self.coeff_len]
    }

    /// `(P / p_i)^-1 mod p_i`.
    #[must_use]
    pub fn inverse_cofactor(&self, i: usize) -> u64 {
        self.data[(self.nprimes + 1) * self.coeff_len + i]
    }

    /// `P` as a big integer.
    #[must_use]
    pub fn product_big(&self) -> BigUint {
        from_limbs(self.product())
    }

    /// Reference reconstruction of the value `< P` with the given residues.
    #[must_use]
    pub fn combine(&self, residues: &[u64]) -> BigUint {
        assert_eq!(residues.len(), self.nprimes);
        let product = self.product_big();
        let mut acc = BigUint::zero();
        for (i, (&r, &p)) in residues.iter().zip(&self.moduli).enumerate() {
            let t = nmod::mulmod(r % p, self.inverse_cofactor(i), p);
            acc += from_limbs(self.cofactor(i)) * t;
        }
        acc % product
    }
}

fn push_padded(data: &mut Vec<u64>, x: &BigUint, len: usize) {
    let digits = x.to_u64_digits();
    data.extend_from_slice(&digits);
    data.resize(data.len() + len - digits.len(), 0);
}

fn padded<const LIMBS: usize>(words: &[u64]) -> [u64; LIMBS] {
    let mut out = [0; LIMBS];
    out[..words.len()].copy_from_slice(words);
    out
}

/// Recombine `ncoeffs` coefficients from the canonical residue buffers and
/// write `sum(c_k * 2^(k * bits))` into `z`.
///
/// Every coefficient must be below `P`; `LIMBS` words must hold
/// `NP * P`. The product must fit in `z`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn reconstruct<const NP: usize, const LIMBS: usize>(
    crt: &CrtData,
    layout: BlockLayout,
    residues: &[&[f64]],
    bits: u32,
    ncoeffs: usize,
    z: &mut [u64],
) {
    assert_eq!(crt.nprimes(), NP);
    assert_eq!(residues.len(), NP);
    debug_assert!(crt.coeff_len() <= LIMBS);
    debug_assert_eq!(ProfileKind::from_count(NP).map(ProfileKind::limbs), Some(LIMBS));

    let product: [u64; LIMBS] = padded(crt.product());
    let cofactors: [[u64; LIMBS]; NP] = std::array::from_fn(|i| padded(crt.cofactor(i)));
    let inverses: [u64; NP] = std::array::from_fn(|i| crt.inverse_cofactor(i));
    let primes: [u64; NP] = std::array::from_fn(|i| crt.moduli()[i]);
    let recips: [f64; NP] = std::array::from_fn(|i| 1.0 / primes[i] as f64);

    z.fill(0);
    let bits = bits as usize;
    for k in 0..ncoeffs {
        let mut acc = [0u64; LIMBS];
        let mut estimate = 0.0;
        for i in 0..NP {
            let r = nmod::from_double(layout.get(residues[i], k), primes[i]);
            let t = nmod::mulmod(r, inverses[i], primes[i]);
            estimate += t as f64 * recips[i];
            let carry = mul_add_scalar(&mut acc, &cofactors[i], t);
            debug_assert_eq!(carry, 0, "CRT accumulator overflow");
        }

        let q = estimate.floor() as u64;
        if sub_mul_scalar(&mut acc, &product, q) != 0 {
            add_n(&mut acc, &product);
        }
        if cmp_n(&acc, &product) != Ordering::Less {
            sub_n(&mut acc, &product);
        }

        let carry = add_shifted(z, k * bits, &acc);
        debug_assert_eq!(carry, 0, "product overflows the output");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_PRIME;

    fn default_primes(n: usize) -> Vec<u64> {
        let mut primes = vec![DEFAULT_PRIME];
        let mut p = DEFAULT_PRIME;
        while primes.len() < n {
            p = nmod::next_fft_number(p).unwrap();
            if nmod::is_prime(p) {
                primes.push(p);
            }
        }
        primes
    }

    fn big(words: &[u64]) -> BigUint {
        from_limbs(words)
    }

    fn residues_of(x: &BigUint, primes: &[u64]) -> Vec<u64> {
        primes.iter().map(|&p| (x % p).to_u64().unwrap()).collect()
    }

    #[test]
    fn layout_of_combination_data() {
        let primes = default_primes(3);
        let crt = CrtData::new(&primes);
        assert_eq!(crt.nprimes(), 3);
        assert_eq!(crt.prime(), primes[2]);
        assert_eq!(crt.coeff_len(), 3);
        let p = crt.product_big();
        for (i, &q) in primes.iter().enumerate() {
            assert_eq!(big(crt.cofactor(i)), &p / q);
            let co = (&p / q % q).to_u64().unwrap();
            assert_eq!(nmod::mulmod(co, crt.inverse_cofactor(i), q), 1);
        }
    }

    #[test]
    fn combine_recovers_values_below_product() {
        let primes = default_primes(5);
        let crt = CrtData::new(&primes);
        let p = crt.product_big();
        let samples = [
            BigUint::zero(),
            BigUint::from(1u32),
            &p - 1u32,
            &p / 3u32 + 12_345u32,
        ];
        for x in &samples {
            assert_eq!(&crt.combine(&residues_of(x, &primes)), x);
        }
    }

    fn check_reconstruct<const NP: usize, const LIMBS: usize>() {
        let primes = default_primes(NP);
        let crt = CrtData::new(&primes);
        let p = crt.product_big();
        let values = [
            &p - 1u32,
            BigUint::zero(),
            &p >> 1u32,
            BigUint::from(u64::MAX) * 977u32,
        ];
        let layout = BlockLayout::new(8);
        let buffers: Vec<Vec<f64>> = primes
            .iter()
            .map(|&q| {
                let mut buf = vec![0.0; layout.data_size()];
                for (k, x) in values.iter().enumerate() {
                    #[allow(clippy::cast_precision_loss)]
                    layout.set(&mut buf, k, (x % q).to_u64().unwrap() as f64);
                }
                buf
            })
            .collect();
        let refs: Vec<&[f64]> = buffers.iter().map(Vec::as_slice).collect();

        // Coefficients one full accumulator apart cannot overlap.
        let bits = u32::try_from(64 * LIMBS).unwrap();
        let mut z = vec![u64::MAX; LIMBS * values.len()];
        reconstruct::<NP, LIMBS>(&crt, layout, &refs, bits, values.len(), &mut z);
        for (k, x) in values.iter().enumerate() {
            assert_eq!(&big(&z[k * LIMBS..(k + 1) * LIMBS]), x, "{NP} primes, value {k}");
        }
    }

    #[test]
    fn reconstruct_is_exact_for_every_prime_count() {
        check_reconstruct::<3, 3>();
        check_reconstruct::<4, 4>();
        check_reconstruct::<5, 4>();
        check_reconstruct::<6, 5>();
        check_reconstruct::<7, 6>();
        check_reconstruct::<8, 7>();
    }

    #[test]
    fn reconstruct_overlaps_and_carries() {
        let primes = default_primes(3);
        let crt = CrtData::new(&primes);
        let layout = BlockLayout::new(8);
        let c = [0x0123_4567_89ab_cdefu64, 0xffff_ffff, 42];
        let buffers: Vec<Vec<f64>> = primes
            .iter()
            .map(|&q| {
                let mut buf = vec![0.0; layout.data_size()];
                for (k, &x) in c.iter().enumerate() {
                    #[allow(clippy::cast_precision_loss)]
                    layout.set(&mut buf, k, (x % q) as f64);
                }
                buf
            })
            .collect();
        let refs: Vec<&[f64]> = buffers.iter().map(Vec::as_slice).collect();
        let mut z = vec![0u64; 3];
        reconstruct::<3, 3>(&crt, layout, &refs, 40, 3, &mut z);
        let want = BigUint::from(c[0])
            + (BigUint::from(c[1]) << 40usize)
            + (BigUint::from(c[2]) << 80usize);
        assert_eq!(big(&z), want);
    }
}
