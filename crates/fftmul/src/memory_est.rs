//! Memory estimation for NTT multiplications.

use crate::profile::MulShape;

/// Bytes of scratch needed by one multiplication with `nprimes` primes.
#[must_use]
pub fn scratch_bytes(shape: &MulShape, nprimes: usize, square: bool) -> usize {
    let buffers = if square { 1 } else { 2 };
    nprimes * buffers * shape.layout().data_size() * std::mem::size_of::<f64>()
}

/// Bytes of root and scaling tables for `nprimes` primes at the shape's depth.
#[must_use]
pub fn table_bytes(shape: &MulShape, nprimes: usize) -> usize {
    let roots = 1usize << (shape.depth - 1);
    let inverse_powers = shape.depth as usize + 1;
    nprimes * (roots + inverse_powers) * std::mem::size_of::<f64>()
}

/// Estimate the memory a multiplication of the given shape uses: scratch,
/// tables and the output limbs.
#[must_use]
pub fn estimate_mul_memory(shape: &MulShape, nprimes: usize, square: bool) -> usize {
    let output_limbs = (shape.zlen * shape.bits as usize).div_ceil(64);
    scratch_bytes(shape, nprimes, square)
        + table_bytes(shape, nprimes)
        + output_limbs * std::mem::size_of::<u64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_small() {
        let shape = MulShape::new(10, 10, 68).unwrap();
        // One block per buffer, two buffers per prime.
        assert_eq!(scratch_bytes(&shape, 3, false), 3 * 2 * 256 * 8);
        assert_eq!(scratch_bytes(&shape, 3, true), 3 * 256 * 8);
        assert!(estimate_mul_memory(&shape, 3, false) > scratch_bytes(&shape, 3, false));
    }

    #[test]
    fn estimate_grows_with_size() {
        let small = estimate_mul_memory(&MulShape::new(1000, 1000, 92).unwrap(), 4, false);
        let large = MulShape::new(1_000_000, 1_000_000, 92).unwrap();
        let large = estimate_mul_memory(&large, 4, false);
        assert!(large > small);
    }
}
