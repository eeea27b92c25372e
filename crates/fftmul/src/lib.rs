//! # fftmul
//!
//! Multi-modulus floating-point NTT multiplication of large unsigned
//! integers.
//!
//! Operands are split into coefficients, transformed modulo several
//! word-size primes with FMA-based double arithmetic, multiplied
//! pointwise, transformed back, and recombined by the Chinese remainder
//! theorem. [`MulContext`] is the single-owner entry point,
//! [`SharedMulContext`] the thread-safe one, and [`mul`] / [`sqr`] wrap
//! both behind `num_bigint::BigUint`.

pub mod constants;
pub mod context;
pub mod convert;
pub mod crt;
pub mod error;
pub mod fft;
mod fft_core;
pub mod fft_ctx;
mod fft_recursion;
pub mod layout;
pub mod limb_arith;
pub mod memory_est;
pub mod nmod;
pub mod options;
pub mod profile;
pub mod shared;
pub mod vec4;

// Re-exports
pub use context::MulContext;
pub use error::FftError;
pub use fft::{from_limbs, mul, mul_to, set_default_context, sqr, sqr_to, with_default_context};
pub use fft_ctx::{FftContext, FftPlan, Reduction};
pub use layout::BlockLayout;
pub use options::MulOptions;
pub use profile::{MulShape, ProfileEntry, ProfileKind};
pub use shared::SharedMulContext;
