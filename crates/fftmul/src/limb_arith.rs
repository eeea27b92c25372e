//! Fixed-width limb arithmetic for CRT reconstruction.
//!
//! Limbs are little-endian `u64` words. The slice routines return the
//! carry or borrow out of the top word.

use std::cmp::Ordering;

/// Add with carry: a + b + carry -> (sum, `new_carry`)
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn add_with_carry(a: u64, b: u64, carry: u64) -> (u64, u64) {
    let sum = u128::from(a) + u128::from(b) + u128::from(carry);
    (sum as u64, (sum >> 64) as u64)
}

/// Subtract with borrow: a - b - borrow -> (diff, `new_borrow`)
#[inline]
#[must_use]
pub fn sub_with_borrow(a: u64, b: u64, borrow: u64) -> (u64, u64) {
    let (d, b1) = a.overflowing_sub(b);
    let (d, b2) = d.overflowing_sub(borrow);
    (d, u64::from(b1 | b2))
}

/// Multiply: a * b -> (low, high)
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn mul_wide(a: u64, b: u64) -> (u64, u64) {
    let prod = u128::from(a) * u128::from(b);
    (prod as u64, (prod >> 64) as u64)
}

/// `acc += src`, over `acc.len()` words (`src` zero-extended).
pub fn add_n(acc: &mut [u64], src: &[u64]) -> u64 {
    debug_assert!(src.len() <= acc.len());
    let mut carry = 0;
    for (i, limb) in acc.iter_mut().enumerate() {
        let (sum, c) = add_with_carry(*limb, src.get(i).copied().unwrap_or(0), carry);
        *limb = sum;
        carry = c;
    }
    carry
}

/// `acc -= src`, over `acc.len()` words (`src` zero-extended).
pub fn sub_n(acc: &mut [u64], src: &[u64]) -> u64 {
    debug_assert!(src.len() <= acc.len());
    let mut borrow = 0;
    for (i, limb) in acc.iter_mut().enumerate() {
        let (diff, b) = sub_with_borrow(*limb, src.get(i).copied().unwrap_or(0), borrow);
        *limb = diff;
        borrow = b;
    }
    borrow
}

/// `acc += src * k`; returns the word carried out of `acc`.
#[allow(clippy::cast_possible_truncation)]
pub fn mul_add_scalar(acc: &mut [u64], src: &[u64], k: u64) -> u64 {
    debug_assert!(src.len() <= acc.len());
    let mut carry = 0u64;
    for (i, limb) in acc.iter_mut().enumerate() {
        let s = src.get(i).copied().unwrap_or(0);
        let t = u128::from(s) * u128::from(k) + u128::from(*limb) + u128::from(carry);
        *limb = t as u64;
        carry = (t >> 64) as u64;
    }
    carry
}

/// `acc -= src * k`; returns the word borrowed past the top of `acc`.
#[allow(clippy::cast_possible_truncation)]
pub fn sub_mul_scalar(acc: &mut [u64], src: &[u64], k: u64) -> u64 {
    debug_assert!(src.len() <= acc.len());
    let mut borrow = 0u64;
    for (i, limb) in acc.iter_mut().enumerate() {
        let s = src.get(i).copied().unwrap_or(0);
        let (lo, hi) = mul_wide(s, k);
        let (lo, c1) = lo.overflowing_add(borrow);
        let (diff, c2) = limb.overflowing_sub(lo);
        *limb = diff;
        borrow = hi + u64::from(c1) + u64::from(c2);
    }
    borrow
}

/// Compare two equal-length numbers.
#[must_use]
pub fn cmp_n(a: &[u64], b: &[u64]) -> Ordering {
    debug_assert_eq!(a.len(), b.len());
    a.iter().rev().cmp(b.iter().rev())
}

/// Add a slice of u64 values with a scalar, returning carry.
pub fn add_scalar(data: &mut [u64], scalar: u64) -> u64 {
    let mut carry = scalar;
    for limb in data.iter_mut() {
        let (sum, c) = add_with_carry(*limb, carry, 0);
        *limb = sum;
        carry = c;
        if carry == 0 {
            break;
        }
    }
    carry
}

/// `z += x << shift`, with the carry propagated through the rest of `z`.
///
/// Words of the shifted value that fall past the end of `z` must be zero;
/// the return value is the carry out of the top of `z`.
pub fn add_shifted(z: &mut [u64], shift: usize, x: &[u64]) -> u64 {
    let word = shift / 64;
    let bit = shift % 64;
    if word >= z.len() {
        debug_assert!(x.iter().all(|&w| w == 0));
        return 0;
    }
    let rest = &mut z[word..];
    let mut carry = 0;
    let mut prev = 0u64;
    let mut i = 0;
    while i <= x.len() {
        let cur = x.get(i).copied().unwrap_or(0);
        let w = if bit == 0 {
            cur
        } else {
            (cur << bit) | (prev >> (64 - bit))
        };
        prev = cur;
        match rest.get_mut(i) {
            Some(limb) => {
                let (sum, c) = add_with_carry(*limb, w, carry);
                *limb = sum;
                carry = c;
            }
            None => {
                debug_assert_eq!(w, 0, "shifted value overflows the output");
            }
        }
        i += 1;
    }
    if carry != 0 && i < rest.len() {
        carry = add_scalar(&mut rest[i..], carry);
    }
    carry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_carry() {
        let (sum, carry) = add_with_carry(u64::MAX, 1, 0);
        assert_eq!(sum, 0);
        assert_eq!(carry, 1);
        assert_eq!(add_with_carry(u64::MAX, u64::MAX, 1), (u64::MAX, 1));
    }

    #[test]
    fn sub_borrow() {
        assert_eq!(sub_with_borrow(0, 1, 0), (u64::MAX, 1));
        assert_eq!(sub_with_borrow(0, 0, 1), (u64::MAX, 1));
        assert_eq!(sub_with_borrow(1, u64::MAX, 0), (2, 1));
        assert_eq!(sub_with_borrow(500, 200, 0), (300, 0));
    }

    #[test]
    fn multiply_wide() {
        assert_eq!(mul_wide(u64::MAX, 2), (u64::MAX - 1, 1));
        assert_eq!(mul_wide(u64::MAX, u64::MAX), (1, u64::MAX - 1));
    }

    #[test]
    fn slice_add_and_sub_invert() {
        let mut acc = vec![u64::MAX, 5, 0];
        let src = [1, u64::MAX];
        assert_eq!(add_n(&mut acc, &src), 0);
        assert_eq!(acc, vec![0, 5, 1]);
        assert_eq!(sub_n(&mut acc, &src), 0);
        assert_eq!(acc, vec![u64::MAX, 5, 0]);
        assert_eq!(sub_n(&mut acc, &[0, 6]), 1);
    }

    #[test]
    fn scalar_multiply_accumulate() {
        let mut acc = vec![0, 0, 0];
        assert_eq!(mul_add_scalar(&mut acc, &[u64::MAX, u64::MAX], 3), 0);
        // (2^128 - 1) * 3 = 2^129 + 2^128 - 3
        assert_eq!(acc, vec![u64::MAX - 2, u64::MAX, 2]);
        assert_eq!(sub_mul_scalar(&mut acc, &[u64::MAX, u64::MAX], 3), 0);
        assert_eq!(acc, vec![0, 0, 0]);
        assert_eq!(sub_mul_scalar(&mut acc, &[1], 1), 1);
        assert_eq!(acc, vec![u64::MAX; 3]);
    }

    #[test]
    fn compare_from_the_top() {
        assert_eq!(cmp_n(&[5, 1], &[7, 0]), Ordering::Greater);
        assert_eq!(cmp_n(&[5, 1], &[5, 1]), Ordering::Equal);
        assert_eq!(cmp_n(&[0, 0], &[1, 0]), Ordering::Less);
    }

    #[test]
    fn add_scalar_carry_propagates_through_all() {
        let mut data = vec![u64::MAX, u64::MAX, u64::MAX];
        let carry = add_scalar(&mut data, 1);
        assert_eq!(data, vec![0, 0, 0]);
        assert_eq!(carry, 1);
    }

    #[test]
    fn add_scalar_empty() {
        let mut data: Vec<u64> = vec![];
        assert_eq!(add_scalar(&mut data, 42), 42);
    }

    #[test]
    fn shifted_add_straddles_words() {
        let mut z = vec![0u64; 4];
        assert_eq!(add_shifted(&mut z, 60, &[0xff, 1]), 0);
        assert_eq!(z, vec![0xf000_0000_0000_0000, 0x1000_0000_0000_000f, 0, 0]);

        let mut z = vec![u64::MAX, u64::MAX, 0];
        assert_eq!(add_shifted(&mut z, 64, &[1]), 0);
        assert_eq!(z, vec![u64::MAX, 0, 1]);
    }

    #[test]
    fn shifted_add_truncates_zero_tail() {
        let mut z = vec![0u64; 2];
        assert_eq!(add_shifted(&mut z, 64, &[7, 0, 0]), 0);
        assert_eq!(z, vec![0, 7]);
        assert_eq!(add_shifted(&mut z, 200, &[0, 0]), 0);
    }

    #[test]
    fn shifted_add_reports_carry_out() {
        let mut z = vec![u64::MAX, u64::MAX];
        assert_eq!(add_shifted(&mut z, 0, &[1]), 1);
        assert_eq!(z, vec![0, 0]);
    }
}
