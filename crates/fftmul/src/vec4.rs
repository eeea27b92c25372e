//! Four-lane double vectors and FMA-based modular reduction.
//!
//! Residues are kept as doubles in a symmetric window around zero. For a
//! prime `p < 2^50`, `mulmod` recovers the exact product of two residues
//! from `a*b` and its FMA rounding error, then subtracts a rounded quotient
//! estimate. Results are loose representatives: congruent to the true value
//! and bounded by a little more than `p/2` in magnitude.

use std::ops::{Add, Mul, Neg, Sub};

use crate::constants::VEC_SZ;

/// Four doubles processed as one unit.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C, align(32))]
pub struct Vec4(pub [f64; VEC_SZ]);

impl Vec4 {
    /// All lanes set to `x`.
    #[inline]
    #[must_use]
    pub const fn splat(x: f64) -> Self {
        Self([x; VEC_SZ])
    }

    /// Load the first four values of `src`.
    #[inline]
    #[must_use]
    pub fn load(src: &[f64]) -> Self {
        let mut lanes = [0.0; VEC_SZ];
        lanes.copy_from_slice(&src[..VEC_SZ]);
        Self(lanes)
    }

    /// Store into the first four values of `dst`.
    #[inline]
    pub fn store(self, dst: &mut [f64]) {
        dst[..VEC_SZ].copy_from_slice(&self.0);
    }

    /// Load lanes `0, 2, 4, 6` and `1, 3, 5, 7` of an eight-value slice.
    #[inline]
    #[must_use]
    pub fn load_deinterleaved(src: &[f64]) -> (Self, Self) {
        (
            Self([src[0], src[2], src[4], src[6]]),
            Self([src[1], src[3], src[5], src[7]]),
        )
    }

    #[inline]
    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        let [a, b, c, d] = self.0;
        Self([f(a), f(b), f(c), f(d)])
    }

    #[inline]
    fn zip(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        let [a, b, c, d] = self.0;
        let [e, g, h, i] = other.0;
        Self([f(a, e), f(b, g), f(c, h), f(d, i)])
    }

    /// Lane-wise fused `self * b + c`.
    #[inline]
    #[must_use]
    pub fn mul_add(self, b: Self, c: Self) -> Self {
        let [x0, x1, x2, x3] = self.0;
        let [y0, y1, y2, y3] = b.0;
        let [z0, z1, z2, z3] = c.0;
        Self([
            x0.mul_add(y0, z0),
            x1.mul_add(y1, z1),
            x2.mul_add(y2, z2),
            x3.mul_add(y3, z3),
        ])
    }

    /// Lane-wise round to nearest, ties to even.
    #[inline]
    #[must_use]
    pub fn round(self) -> Self {
        self.map(f64::round_ties_even)
    }

    /// Transpose a 4x4 matrix held as four row vectors.
    #[inline]
    #[must_use]
    pub fn transpose(rows: [Self; 4]) -> [Self; 4] {
        let [a, b, c, d] = rows.map(|r| r.0);
        [
            Self([a[0], b[0], c[0], d[0]]),
            Self([a[1], b[1], c[1], d[1]]),
            Self([a[2], b[2], c[2], d[2]]),
            Self([a[3], b[3], c[3], d[3]]),
        ]
    }
}

impl Add for Vec4 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a + b)
    }
}

impl Sub for Vec4 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a - b)
    }
}

impl Mul for Vec4 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a * b)
    }
}

impl Neg for Vec4 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        self.map(|a| -a)
    }
}

/// A prime modulus with its reciprocal, for double-precision reduction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatModulus {
    p: f64,
    pinv: f64,
}

impl FloatModulus {
    /// Wrap a prime below `2^50`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(prime: u64) -> Self {
        let p = prime as f64;
        Self { p, pinv: 1.0 / p }
    }

    /// The prime as a double.
    #[inline]
    #[must_use]
    pub fn p(&self) -> f64 {
        self.p
    }

    /// Reduce `x` (with `|x|` up to a few multiples of `p`) into `[-p/2, p/2]`.
    #[inline]
    #[must_use]
    pub fn reduce(&self, x: f64) -> f64 {
        let q = (x * self.pinv).round_ties_even();
        (-q).mul_add(self.p, x)
    }

    /// `a * b mod p` for `|a|, |b|` around `p`, as a loose representative.
    #[inline]
    #[must_use]
    pub fn mulmod(&self, a: f64, b: f64) -> f64 {
        let h = a * b;
        let l = a.mul_add(b, -h);
        let q = (h * self.pinv).round_ties_even();
        (-q).mul_add(self.p, h) + l
    }

    /// Fold `x` into `[0, p)`.
    #[inline]
    #[must_use]
    pub fn canonical(&self, x: f64) -> f64 {
        let r = self.reduce(x);
        if r < 0.0 {
            r + self.p
        } else {
            r
        }
    }

    /// Lane-wise [`reduce`](Self::reduce).
    #[inline]
    #[must_use]
    pub fn reduce4(&self, x: Vec4) -> Vec4 {
        let q = (x * Vec4::splat(self.pinv)).round();
        (-q).mul_add(Vec4::splat(self.p), x)
    }

    /// Lane-wise [`mulmod`](Self::mulmod).
    #[inline]
    #[must_use]
    pub fn mulmod4(&self, a: Vec4, b: Vec4) -> Vec4 {
        let h = a * b;
        let l = a.mul_add(b, -h);
        let q = (h * Vec4::splat(self.pinv)).round();
        (-q).mul_add(Vec4::splat(self.p), h) + l
    }

    /// Lane-wise [`canonical`](Self::canonical).
    #[inline]
    #[must_use]
    pub fn canonical4(&self, x: Vec4) -> Vec4 {
        let r = self.reduce4(x);
        r.map(|v| if v < 0.0 { v + self.p } else { v })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_PRIME;
    use crate::nmod;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn to_u64(x: f64, p: u64) -> u64 {
        (x as i64).rem_euclid(p as i64) as u64
    }

    #[test]
    fn reduce_stays_in_symmetric_window() {
        let m = FloatModulus::new(DEFAULT_PRIME);
        let p = m.p();
        for &x in &[0.0, 1.0, p, -p, 2.5 * p, -3.7 * p, p / 2.0 + 1.0] {
            let r = m.reduce(x);
            assert!(r.abs() <= p / 2.0 + 1.0, "reduce({x}) = {r}");
        }
    }

    #[test]
    fn mulmod_matches_integer_arithmetic() {
        let prime = DEFAULT_PRIME;
        let m = FloatModulus::new(prime);
        #[allow(clippy::cast_precision_loss)]
        let half = (prime / 2) as f64;
        let samples = [1.0, -1.0, half, -half, 12_345_678_901.0, -987_654_321_987.0];
        for &a in &samples {
            for &b in &samples {
                let got = m.mulmod(a, b);
                assert!(got.abs() <= m.p());
                let want = nmod::mulmod(to_u64(a, prime), to_u64(b, prime), prime);
                assert_eq!(to_u64(got, prime), want, "{a} * {b}");
            }
        }
    }

    #[test]
    fn canonical_is_in_range() {
        let m = FloatModulus::new(DEFAULT_PRIME);
        for &x in &[-1.0, 0.0, m.p() - 1.0, m.p(), -m.p() / 2.0] {
            let c = m.canonical(x);
            assert!((0.0..m.p()).contains(&c), "canonical({x}) = {c}");
        }
    }

    #[test]
    fn vector_ops_match_scalar_ops() {
        let m = FloatModulus::new(DEFAULT_PRIME);
        let a = Vec4([3.0, -5.0e14, 7.0e13, -1.0]);
        let b = Vec4([1.0e14, 2.0, -9.0e14, 4.0e14]);
        let prod = m.mulmod4(a, b);
        let red = m.reduce4(a + b);
        let can = m.canonical4(a - b);
        for i in 0..VEC_SZ {
            assert_eq!(prod.0[i], m.mulmod(a.0[i], b.0[i]));
            assert_eq!(red.0[i], m.reduce(a.0[i] + b.0[i]));
            assert_eq!(can.0[i], m.canonical(a.0[i] - b.0[i]));
        }
    }

    #[test]
    fn transpose_and_deinterleave() {
        let rows = [
            Vec4([0.0, 1.0, 2.0, 3.0]),
            Vec4([4.0, 5.0, 6.0, 7.0]),
            Vec4([8.0, 9.0, 10.0, 11.0]),
            Vec4([12.0, 13.0, 14.0, 15.0]),
        ];
        let t = Vec4::transpose(rows);
        assert_eq!(t[1], Vec4([1.0, 5.0, 9.0, 13.0]));
        assert_eq!(Vec4::transpose(t), rows);

        let src = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let (even, odd) = Vec4::load_deinterleaved(&src);
        assert_eq!(even, Vec4([0.0, 2.0, 4.0, 6.0]));
        assert_eq!(odd, Vec4([1.0, 3.0, 5.0, 7.0]));
    }
}
