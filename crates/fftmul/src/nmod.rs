//! Exact word-size modular arithmetic used to set up transform tables.
//!
//! Nothing here is on the transform hot path; table construction, prime
//! search and CRT reconstruction use these routines.

use crate::constants::MIN_PRIME_BITS;
use crate::error::FftError;

/// `a * b mod n` through a 128-bit product.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn mulmod(a: u64, b: u64, n: u64) -> u64 {
    (u128::from(a) * u128::from(b) % u128::from(n)) as u64
}

/// `base^exp mod n` by binary exponentiation.
#[must_use]
pub fn powmod(base: u64, mut exp: u64, n: u64) -> u64 {
    if n == 1 {
        return 0;
    }
    let mut result = 1;
    let mut base = base % n;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mulmod(result, base, n);
        }
        base = mulmod(base, base, n);
        exp >>= 1;
    }
    result
}

/// Inverse of `a` modulo the prime `p` (Fermat's little theorem).
#[must_use]
pub fn invmod(a: u64, p: u64) -> u64 {
    powmod(a, p - 2, p)
}

/// Number of significant bits in `x`.
#[inline]
#[must_use]
pub const fn nbits(x: u64) -> u32 {
    u64::BITS - x.leading_zeros()
}

/// Deterministic Miller-Rabin test, exact for every `u64`.
#[must_use]
pub fn is_prime(n: u64) -> bool {
    const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

    if n < 2 {
        return false;
    }
    for &w in &WITNESSES {
        if n % w == 0 {
            return n == w;
        }
    }

    let r = (n - 1).trailing_zeros();
    let d = (n - 1) >> r;
    'witness: for &a in &WITNESSES {
        let mut x = powmod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..r {
            x = mulmod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Distinct prime factors of `n`, by trial division.
///
/// FFT primes have `p - 1 = 2^k * small`, so this terminates quickly for
/// every modulus the engine uses.
#[must_use]
pub fn prime_factors(mut n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    if n % 2 == 0 {
        factors.push(2);
        n >>= n.trailing_zeros();
    }
    let mut f = 3;
    while f <= n / f {
        if n % f == 0 {
            factors.push(f);
            while n % f == 0 {
                n /= f;
            }
        }
        f += 2;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// Smallest generator of the multiplicative group modulo the prime `p`.
#[must_use]
pub fn primitive_root(p: u64) -> u64 {
    if p == 2 {
        return 1;
    }
    let factors = prime_factors(p - 1);
    (2..p)
        .find(|&g| factors.iter().all(|&q| powmod(g, (p - 1) / q, p) != 1))
        .unwrap_or(1)
}

/// Next candidate in the descending sequence of numbers of the form
/// `c * 2^k + 1` with the same bit length as `p` and large `k`.
///
/// Candidates are not necessarily prime; callers filter with [`is_prime`].
pub fn next_fft_number(p: u64) -> Result<u64, FftError> {
    let bits = nbits(p);
    if !(MIN_PRIME_BITS..u64::BITS - 1).contains(&bits) {
        return Err(FftError::PrimeSearchExhausted(p));
    }
    let l = (p - 1).trailing_zeros();
    if let Some(q) = p.checked_sub(2 << l) {
        if nbits(q) == bits {
            return Ok(q);
        }
    }
    if l < 5 {
        Ok((1 << (bits - 2)) + 1)
    } else {
        Ok((1 << bits) - (1 << (l - 1)) + 1)
    }
}

/// Map a canonical residue to its symmetric representative as a double.
#[inline]
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
pub fn to_symmetric(x: u64, p: u64) -> f64 {
    if x > p / 2 {
        (x as i64 - p as i64) as f64
    } else {
        x as f64
    }
}

/// Map a double congruent to some residue back to its canonical `u64`.
#[inline]
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
pub fn from_double(x: f64, p: u64) -> u64 {
    (x as i64).rem_euclid(p as i64) as u64
}
