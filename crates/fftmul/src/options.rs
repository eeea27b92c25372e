//! Multiplication context options.

use crate::constants::{
    DEFAULT_FFT_THRESHOLD, DEFAULT_MAX_PER_CLASS, DEFAULT_MAX_POOLED_LEN,
    DEFAULT_PARALLEL_THRESHOLD, DEFAULT_PRIME,
};

/// Options for a multiplication context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulOptions {
    /// First prime of the sequence (0 = default). If it is not prime, the
    /// first prime after it along the FFT-prime sequence is used.
    pub first_prime: u64,
    /// Block count at which transform halves run on separate rayon tasks.
    pub parallel_threshold: usize,
    /// Smaller-operand limb count at which the `BigUint` API uses the engine.
    pub fft_threshold: usize,
    /// Largest scratch buffer, in doubles, a shared context keeps pooled.
    pub max_pooled_len: usize,
    /// Pooled scratch buffers kept per size class.
    pub max_per_class: usize,
}

impl Default for MulOptions {
    fn default() -> Self {
        Self {
            first_prime: DEFAULT_PRIME,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            fft_threshold: DEFAULT_FFT_THRESHOLD,
            max_pooled_len: DEFAULT_MAX_POOLED_LEN,
            max_per_class: DEFAULT_MAX_PER_CLASS,
        }
    }
}

impl MulOptions {
    /// Normalize options, applying defaults where values are zero.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        if self.first_prime == 0 {
            self.first_prime = DEFAULT_PRIME;
        }
        if self.parallel_threshold == 0 {
            self.parallel_threshold = DEFAULT_PARALLEL_THRESHOLD;
        }
        if self.fft_threshold == 0 {
            self.fft_threshold = DEFAULT_FFT_THRESHOLD;
        }
        if self.max_pooled_len == 0 {
            self.max_pooled_len = DEFAULT_MAX_POOLED_LEN;
        }
        if self.max_per_class == 0 {
            self.max_per_class = DEFAULT_MAX_PER_CLASS;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let opts = MulOptions::default();
        assert_eq!(opts.first_prime, DEFAULT_PRIME);
        assert_eq!(opts.parallel_threshold, DEFAULT_PARALLEL_THRESHOLD);
        assert_eq!(opts.fft_threshold, DEFAULT_FFT_THRESHOLD);
    }

    #[test]
    fn normalize_zero_fields() {
        let opts = MulOptions {
            first_prime: 0,
            parallel_threshold: 0,
            max_per_class: 0,
            ..Default::default()
        };
        let normalized = opts.normalize();
        assert_eq!(normalized, MulOptions::default());
    }

    #[test]
    fn normalize_keeps_explicit_values() {
        let opts = MulOptions {
            parallel_threshold: 4,
            fft_threshold: 64,
            ..Default::default()
        }
        .normalize();
        assert_eq!(opts.parallel_threshold, 4);
        assert_eq!(opts.fft_threshold, 64);
    }
}
