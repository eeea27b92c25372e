//! Butterflies and single-block transforms.
//!
//! Forward butterflies map `(a, b)` to `(a + w*b, a - w*b)`; inverse ones
//! map `(u, v)` to `(u + v, (u - v) / w)`, so every inverse level doubles
//! its inputs. All outputs are reduced to loose representatives.
//!
//! The inverse steps that write final outputs take a `scale`: when set,
//! the length normalisation is multiplied in as the values are written.

use crate::fft_ctx::FftPlan;
use crate::vec4::{FloatModulus, Vec4};

#[inline]
fn vbfly(m: &FloatModulus, a: &mut Vec4, b: &mut Vec4, w: Vec4) {
    let t = m.mulmod4(*b, w);
    let x = *a;
    *a = m.reduce4(x + t);
    *b = m.reduce4(x - t);
}

#[inline]
fn vibfly(m: &FloatModulus, a: &mut Vec4, b: &mut Vec4, wi: Vec4) {
    let (u, v) = (*a, *b);
    *a = m.reduce4(u + v);
    *b = m.mulmod4(m.reduce4(u - v), wi);
}

#[inline]
fn pairs<'s>(
    lo: &'s mut [f64],
    hi: &'s mut [f64],
) -> impl Iterator<Item = (&'s mut [f64], &'s mut [f64])> {
    debug_assert_eq!(lo.len(), hi.len());
    lo.chunks_exact_mut(4).zip(hi.chunks_exact_mut(4))
}

/// `(lo, hi) = (lo + w*hi, lo - w*hi)`.
pub(crate) fn butterfly(m: &FloatModulus, lo: &mut [f64], hi: &mut [f64], w: f64) {
    let w = Vec4::splat(w);
    for (x, y) in pairs(lo, hi) {
        let (mut a, mut b) = (Vec4::load(x), Vec4::load(y));
        vbfly(m, &mut a, &mut b, w);
        a.store(x);
        b.store(y);
    }
}

/// `lo = lo + w*hi`, when the difference output is not needed.
pub(crate) fn butterfly_sum(m: &FloatModulus, lo: &mut [f64], hi: &[f64], w: f64) {
    let w = Vec4::splat(w);
    for (x, y) in lo.chunks_exact_mut(4).zip(hi.chunks_exact(4)) {
        let t = m.mulmod4(Vec4::load(y), w);
        m.reduce4(Vec4::load(x) + t).store(x);
    }
}

/// `(lo, hi) = (lo + hi, (lo - hi) * wi)`.
pub(crate) fn inverse_butterfly(m: &FloatModulus, lo: &mut [f64], hi: &mut [f64], wi: f64) {
    let wi = Vec4::splat(wi);
    for (x, y) in pairs(lo, hi) {
        let (mut a, mut b) = (Vec4::load(x), Vec4::load(y));
        vibfly(m, &mut a, &mut b, wi);
        a.store(x);
        b.store(y);
    }
}

/// [`inverse_butterfly`] for the last level, scaled by `c`:
/// `(lo, hi) = (c*(lo + hi), c*wi*(lo - hi))`.
pub(crate) fn inverse_butterfly_scaled(
    m: &FloatModulus,
    lo: &mut [f64],
    hi: &mut [f64],
    wi: f64,
    c: f64,
) {
    let cwi = Vec4::splat(m.reduce(m.mulmod(wi, c)));
    let c = Vec4::splat(c);
    for (x, y) in pairs(lo, hi) {
        let (u, v) = (Vec4::load(x), Vec4::load(y));
        m.reduce4(m.mulmod4(m.reduce4(u + v), c)).store(x);
        m.reduce4(m.mulmod4(m.reduce4(u - v), cwi)).store(y);
    }
}

#[inline]
fn finish(m: &FloatModulus, x: Vec4, scale: Option<Vec4>) -> Vec4 {
    match scale {
        Some(c) => m.reduce4(m.mulmod4(x, c)),
        None => x,
    }
}

/// Truncated inverse, before the upper child: `t = lo - s*hi` (or `lo` when
/// `hi` is not a known input), then `(lo, hi) = (lo + t, t)`.
pub(crate) fn itft_cross(
    m: &FloatModulus,
    lo: &mut [f64],
    hi: &mut [f64],
    s: f64,
    known: bool,
    scale: Option<f64>,
) {
    let s = Vec4::splat(s);
    let scale = scale.map(Vec4::splat);
    for (x, y) in pairs(lo, hi) {
        let a = Vec4::load(x);
        let t = if known {
            m.reduce4(a - m.mulmod4(s, Vec4::load(y)))
        } else {
            a
        };
        t.store(y);
        finish(m, m.reduce4(a + t), scale).store(x);
    }
}

/// Truncated inverse, before the lower child: `lo = (lo + s*hi) / 2`, with
/// `hi` taken as zero unless `known`.
pub(crate) fn itft_fold(
    m: &FloatModulus,
    lo: &mut [f64],
    hi: &[f64],
    s: f64,
    half: f64,
    known: bool,
) {
    let s = Vec4::splat(s);
    let half = Vec4::splat(half);
    for (x, y) in lo.chunks_exact_mut(4).zip(hi.chunks_exact(4)) {
        let a = Vec4::load(x);
        let sum = if known {
            m.reduce4(a + m.mulmod4(s, Vec4::load(y)))
        } else {
            m.reduce4(a)
        };
        m.mulmod4(half, sum).store(x);
    }
}

/// Truncated inverse, after the lower child: `lo = 2*lo - s*hi`, with `hi`
/// taken as zero unless `known`.
pub(crate) fn itft_unfold(
    m: &FloatModulus,
    lo: &mut [f64],
    hi: &[f64],
    s: f64,
    known: bool,
    scale: Option<f64>,
) {
    let s = Vec4::splat(s);
    let scale = scale.map(Vec4::splat);
    for (x, y) in lo.chunks_exact_mut(4).zip(hi.chunks_exact(4)) {
        let a = Vec4::load(x);
        let t = if known {
            m.mulmod4(s, Vec4::load(y))
        } else {
            Vec4::splat(0.0)
        };
        finish(m, m.reduce4(a + a - t), scale).store(x);
    }
}

/// Forward transform of 16 values at node `j`, leaving each output in
/// its transposed slot.
fn kernel16(plan: &FftPlan<'_>, x: &mut [f64], j: usize) {
    let m = plan.modulus();
    let mut v0 = Vec4::load(&x[0..]);
    let mut v1 = Vec4::load(&x[4..]);
    let mut v2 = Vec4::load(&x[8..]);
    let mut v3 = Vec4::load(&x[12..]);

    let w = Vec4::splat(plan.root(j));
    vbfly(&m, &mut v0, &mut v2, w);
    vbfly(&m, &mut v1, &mut v3, w);
    vbfly(&m, &mut v0, &mut v1, Vec4::splat(plan.root(2 * j)));
    vbfly(&m, &mut v2, &mut v3, Vec4::splat(plan.root(2 * j + 1)));

    let [mut v0, mut v1, mut v2, mut v3] = Vec4::transpose([v0, v1, v2, v3]);

    let w = plan.roots4(4 * j);
    vbfly(&m, &mut v0, &mut v2, w);
    vbfly(&m, &mut v1, &mut v3, w);
    let (even, odd) = plan.roots8(8 * j);
    vbfly(&m, &mut v0, &mut v1, even);
    vbfly(&m, &mut v2, &mut v3, odd);

    v0.store(&mut x[0..]);
    v1.store(&mut x[4..]);
    v2.store(&mut x[8..]);
    v3.store(&mut x[12..]);
}

/// Inverse of [`kernel16`], without the `1/16` scaling.
fn inverse_kernel16(plan: &FftPlan<'_>, x: &mut [f64], j: usize) {
    let m = plan.modulus();
    let mut v0 = Vec4::load(&x[0..]);
    let mut v1 = Vec4::load(&x[4..]);
    let mut v2 = Vec4::load(&x[8..]);
    let mut v3 = Vec4::load(&x[12..]);

    let even = Vec4(std::array::from_fn(|l| plan.inverse_root(8 * j + 2 * l)));
    let odd = Vec4(std::array::from_fn(|l| plan.inverse_root(8 * j + 2 * l + 1)));
    vibfly(&m, &mut v0, &mut v1, even);
    vibfly(&m, &mut v2, &mut v3, odd);
    let w = plan.inverse_roots4(4 * j);
    vibfly(&m, &mut v0, &mut v2, w);
    vibfly(&m, &mut v1, &mut v3, w);

    let [mut v0, mut v1, mut v2, mut v3] = Vec4::transpose([v0, v1, v2, v3]);

    vibfly(&m, &mut v0, &mut v1, Vec4::splat(plan.inverse_root(2 * j)));
    vibfly(&m, &mut v2, &mut v3, Vec4::splat(plan.inverse_root(2 * j + 1)));
    let w = Vec4::splat(plan.inverse_root(j));
    vibfly(&m, &mut v0, &mut v2, w);
    vibfly(&m, &mut v1, &mut v3, w);

    v0.store(&mut x[0..]);
    v1.store(&mut x[4..]);
    v2.store(&mut x[8..]);
    v3.store(&mut x[12..]);
}

/// Forward transform of one block (or any power-of-two run of at least 16
/// values) rooted at node `j`.
pub(crate) fn fft_block(plan: &FftPlan<'_>, x: &mut [f64], j: usize) {
    if x.len() == 16 {
        kernel16(plan, x, j);
        return;
    }
    let half = x.len() / 2;
    let (lo, hi) = x.split_at_mut(half);
    butterfly(&plan.modulus(), lo, hi, plan.root(j));
    fft_block(plan, lo, 2 * j);
    fft_block(plan, hi, 2 * j + 1);
}

/// Inverse of [`fft_block`], scaled by the run length, then by `scale`
/// when given.
pub(crate) fn ifft_block(plan: &FftPlan<'_>, x: &mut [f64], j: usize, scale: Option<f64>) {
    let m = plan.modulus();
    if x.len() == 16 {
        inverse_kernel16(plan, x, j);
        if let Some(c) = scale {
            let c = Vec4::splat(c);
            for v in x.chunks_exact_mut(4) {
                m.reduce4(m.mulmod4(Vec4::load(v), c)).store(v);
            }
        }
        return;
    }
    let half = x.len() / 2;
    let (lo, hi) = x.split_at_mut(half);
    ifft_block(plan, lo, 2 * j, None);
    ifft_block(plan, hi, 2 * j + 1, None);
    match scale {
        Some(c) => inverse_butterfly_scaled(&m, lo, hi, plan.inverse_root(j), c),
        None => inverse_butterfly(&m, lo, hi, plan.inverse_root(j)),
    }
}
