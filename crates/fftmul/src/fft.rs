//! Public `BigUint` multiplication API.
//!
//! Routes to the multi-prime NTT pipeline for large operands, and falls
//! back to standard num-bigint multiplication for small ones. Each thread
//! lazily builds its own default [`MulContext`].

use std::cell::RefCell;

use num_bigint::BigUint;

use crate::context::MulContext;

thread_local! {
    static DEFAULT_CONTEXT: RefCell<Option<MulContext>> = const { RefCell::new(None) };
}

/// Run `f` on this thread's default context, creating it on first use.
///
/// `f` must not call back into this module's multiplication functions.
pub fn with_default_context<R>(f: impl FnOnce(&mut MulContext) -> R) -> R {
    DEFAULT_CONTEXT.with(|cell| {
        let mut slot = cell.borrow_mut();
        f(slot.get_or_insert_with(MulContext::new))
    })
}

/// Replace this thread's default context, e.g. to change its thresholds.
pub fn set_default_context(ctx: MulContext) {
    DEFAULT_CONTEXT.with(|cell| *cell.borrow_mut() = Some(ctx));
}

/// Build a `BigUint` from little-endian `u64` limbs.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn from_limbs(limbs: &[u64]) -> BigUint {
    let digits: Vec<u32> = limbs
        .iter()
        .flat_map(|&w| [w as u32, (w >> 32) as u32])
        .collect();
    BigUint::new(digits)
}

fn limb_len(x: &BigUint) -> usize {
    usize::try_from(x.bits().div_ceil(64)).unwrap_or(usize::MAX)
}

fn fft_threshold() -> usize {
    with_default_context(|ctx| ctx.options().fft_threshold)
}

/// Multiply two `BigUints`, using the NTT engine for large operands.
#[must_use]
pub fn mul(a: &BigUint, b: &BigUint) -> BigUint {
    if limb_len(a).min(limb_len(b)) < fft_threshold() {
        return a * b;
    }
    let (x, y) = (a.to_u64_digits(), b.to_u64_digits());
    match with_default_context(|ctx| ctx.mul_vec(&x, &y)) {
        Ok(z) => from_limbs(&z),
        Err(err) => {
            tracing::warn!(
                %err,
                an = x.len(),
                bn = y.len(),
                "NTT multiplication failed, using num-bigint"
            );
            a * b
        }
    }
}

/// Square a `BigUint`, transforming the operand once for large inputs.
#[must_use]
pub fn sqr(a: &BigUint) -> BigUint {
    if limb_len(a) < fft_threshold() {
        return a * a;
    }
    let x = a.to_u64_digits();
    match with_default_context(|ctx| ctx.sqr_vec(&x)) {
        Ok(z) => from_limbs(&z),
        Err(err) => {
            tracing::warn!(%err, an = x.len(), "NTT squaring failed, using num-bigint");
            a * a
        }
    }
}

/// Multiply and store result in destination.
pub fn mul_to(dst: &mut BigUint, a: &BigUint, b: &BigUint) {
    *dst = mul(a, b);
}

/// Square and store result in destination.
pub fn sqr_to(dst: &mut BigUint, a: &BigUint) {
    *dst = sqr(a);
}
