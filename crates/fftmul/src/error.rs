//! Error type for context construction and multiplication.

/// Errors reported by FFT and multiplication contexts.
///
/// Every variant is a configuration or caller-contract violation: retrying
/// the same call against the same context yields the same error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FftError {
    /// The modulus is even or composite.
    #[error("modulus {0} is not an odd prime")]
    NotPrime(u64),

    /// The prime is too wide for exact double-precision products.
    #[error("prime {prime} does not fit in {max_bits} bits")]
    PrimeTooLarge { prime: u64, max_bits: u32 },

    /// The multiplicative group lacks the 2-power roots of unity needed.
    #[error("prime {prime} supports transforms of depth {available}, depth {required} is required")]
    InsufficientRoots {
        prime: u64,
        available: u32,
        required: u32,
    },

    /// The prime sequence ran below the minimum width before enough primes were found.
    #[error("no further FFT prime below {0}")]
    PrimeSearchExhausted(u64),

    /// A transform deeper than the context supports was requested.
    #[error("transform depth {requested} exceeds the supported maximum {max}")]
    DepthTooLarge { requested: u32, max: u32 },

    /// A transform shorter than one block was requested.
    #[error("transform depth {requested} is below the one-block minimum {min}")]
    DepthTooSmall { requested: u32, min: u32 },

    /// The prime sequence supports no profile beyond a single block.
    #[error("primes starting at {prime:#x} leave no profile that multiplies past one block")]
    NoUsableProfile { prime: u64 },

    /// No profile covers the operand lengths.
    #[error("operands of {an} and {bn} limbs exceed every multiplication profile")]
    OperandTooLarge { an: usize, bn: usize },

    /// The output slice does not have `a.len() + b.len()` limbs.
    #[error("output holds {actual} limbs, the product needs {expected}")]
    OutputLength { expected: usize, actual: usize },
}
