//! Block-level recursive transforms with truncation and parallelism.
//!
//! Each call works on a run of `L` blocks rooted at butterfly node `j`; the
//! lower half is node `2j`, the upper half `2j + 1`. Truncation arguments
//! are in blocks. Independent halves run through [`FftPlan::join`].
//!
//! The inverse entry points take an optional `scale` that the root call
//! folds into whichever step writes its final outputs; recursive calls
//! pass `None`.

use crate::fft_core::{
    butterfly, butterfly_sum, fft_block, ifft_block, inverse_butterfly, inverse_butterfly_scaled,
    itft_cross, itft_fold, itft_unfold,
};
use crate::fft_ctx::FftPlan;
use crate::layout::Blocks;

/// Full forward transform of `blocks`.
pub(crate) fn fft_full(plan: &FftPlan<'_>, mut blocks: Blocks<'_>, j: usize) {
    let count = blocks.len();
    if count == 1 {
        fft_block(plan, blocks.block(0), j);
        return;
    }
    let m = plan.modulus();
    let w = plan.root(j);
    let half = count / 2;
    let (mut lo, mut hi) = blocks.split(half);
    for b in 0..half {
        butterfly(&m, lo.block(b), hi.block(b), w);
    }
    plan.join(
        half,
        move || fft_full(plan, lo, 2 * j),
        move || fft_full(plan, hi, 2 * j + 1),
    );
}

/// Full inverse transform of `blocks`, scaled by its length and then by
/// `scale` when given.
pub(crate) fn ifft_full(plan: &FftPlan<'_>, mut blocks: Blocks<'_>, j: usize, scale: Option<f64>) {
    let count = blocks.len();
    if count == 1 {
        ifft_block(plan, blocks.block(0), j, scale);
        return;
    }
    let half = count / 2;
    let (mut lo, mut hi) = blocks.split(half);
    plan.join(
        half,
        || ifft_full(plan, lo.reborrow(), 2 * j, None),
        || ifft_full(plan, hi.reborrow(), 2 * j + 1, None),
    );
    let m = plan.modulus();
    let wi = plan.inverse_root(j);
    for b in 0..half {
        match scale {
            Some(c) => inverse_butterfly_scaled(&m, lo.block(b), hi.block(b), wi, c),
            None => inverse_butterfly(&m, lo.block(b), hi.block(b), wi),
        }
    }
}

/// Forward transform of the first `itrunc` input blocks (the rest taken as
/// zero), producing only the first `otrunc` output blocks.
pub(crate) fn fft_trunc(
    plan: &FftPlan<'_>,
    mut blocks: Blocks<'_>,
    j: usize,
    itrunc: usize,
    otrunc: usize,
) {
    let count = blocks.len();
    if otrunc == 0 {
        return;
    }
    if itrunc == count && otrunc == count {
        fft_full(plan, blocks, j);
        return;
    }
    if itrunc == 0 {
        for b in 0..otrunc {
            blocks.block(b).fill(0.0);
        }
        return;
    }

    let m = plan.modulus();
    let w = plan.root(j);
    let half = count / 2;
    let (mut lo, mut hi) = blocks.split(half);

    let lower_in = if itrunc <= half {
        if otrunc > half {
            for b in 0..itrunc {
                hi.block(b).copy_from_slice(lo.block(b));
            }
        }
        itrunc
    } else {
        let spill = itrunc - half;
        if otrunc > half {
            for b in 0..spill {
                butterfly(&m, lo.block(b), hi.block(b), w);
            }
            for b in spill..half {
                hi.block(b).copy_from_slice(lo.block(b));
            }
        } else {
            for b in 0..spill {
                butterfly_sum(&m, lo.block(b), hi.block(b), w);
            }
        }
        half
    };

    if otrunc > half {
        plan.join(
            half,
            move || fft_trunc(plan, lo, 2 * j, lower_in, half),
            move || fft_trunc(plan, hi, 2 * j + 1, lower_in, otrunc - half),
        );
    } else {
        fft_trunc(plan, lo, 2 * j, lower_in, otrunc);
    }
}

/// Inverse of [`fft_trunc`] with `itrunc = otrunc = n`, generalised so that
/// time-domain blocks `[n, z)` hold known inputs rather than zeros.
///
/// On return blocks `[0, n)` hold `count` times the recovered inputs,
/// multiplied by `scale` when given.
pub(crate) fn ifft_trunc(
    plan: &FftPlan<'_>,
    blocks: Blocks<'_>,
    j: usize,
    n: usize,
    z: usize,
    scale: Option<f64>,
) {
    let count = blocks.len();
    if n == count {
        ifft_full(plan, blocks, j, scale);
        return;
    }
    if n == 0 {
        return;
    }

    let m = plan.modulus();
    let s = plan.root(j);
    let half = count / 2;
    let (mut lo, mut hi) = blocks.split(half);

    if n >= half {
        ifft_full(plan, lo.reborrow(), 2 * j, None);
        for b in (n - half)..half {
            itft_cross(&m, lo.block(b), hi.block(b), s, b + half < z, scale);
        }
        ifft_trunc(plan, hi.reborrow(), 2 * j + 1, n - half, half, None);
        let wi = plan.inverse_root(j);
        for b in 0..(n - half) {
            match scale {
                Some(c) => inverse_butterfly_scaled(&m, lo.block(b), hi.block(b), wi, c),
                None => inverse_butterfly(&m, lo.block(b), hi.block(b), wi),
            }
        }
    } else {
        let zz = z.min(half);
        let inv2 = plan.half();
        for b in n..zz {
            itft_fold(&m, lo.block(b), hi.block(b), s, inv2, b + half < z);
        }
        ifft_trunc(plan, lo.reborrow(), 2 * j, n, zz, None);
        for b in 0..n {
            itft_unfold(&m, lo.block(b), hi.block(b), s, b + half < z, scale);
        }
    }
}
