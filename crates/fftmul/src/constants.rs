//! Block geometry, prime limits and default thresholds.

/// Log2 of the block size.
pub const LG_BLK_SZ: u32 = 8;

/// Number of doubles in one block; every truncation length is a multiple of it.
pub const BLK_SZ: usize = 1 << LG_BLK_SZ;

/// Log2 of the number of blocks between two layout gaps, minus two.
pub const BLK_SHIFT: u32 = 10;

/// Lanes per vector.
pub const VEC_SZ: usize = 4;

/// First prime of the default prime sequence (`63 * 2^44 + 1`).
pub const DEFAULT_PRIME: u64 = 0x0003_f000_0000_0001;

/// Primes must stay below `2^MAX_PRIME_BITS` so that products of two
/// symmetric residues are recovered exactly by a double plus its FMA error.
pub const MAX_PRIME_BITS: u32 = 50;

/// Primes narrower than this are rejected by the prime search.
pub const MIN_PRIME_BITS: u32 = 15;

/// Number of primes a multiplication context owns.
pub const MAX_PRIMES: usize = 8;

/// Hard cap on transform depth regardless of the primes' 2-adic valuation.
pub const MAX_TRANSFORM_DEPTH: u32 = 40;

/// Depth of the tables built when an FFT context is created.
pub const INITIAL_DEPTH: u32 = LG_BLK_SZ;

/// Bits per conversion piece.
pub const PIECE_BITS: u32 = 32;

/// Maximum number of conversion pieces per coefficient.
pub const MAX_PIECES: usize = 6;

/// Default block count above which sub-transforms run on separate rayon tasks.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 32;

/// Default smaller-operand limb count at which the `BigUint` API
/// switches from num-bigint to the NTT engine.
pub const DEFAULT_FFT_THRESHOLD: usize = 1500;

/// Default largest scratch buffer (in doubles) kept by a shared context's pool.
pub const DEFAULT_MAX_POOLED_LEN: usize = 1 << 30;

/// Default number of pooled scratch buffers per size class.
pub const DEFAULT_MAX_PER_CLASS: usize = 8;
