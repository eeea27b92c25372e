#![no_main]

use libfuzzer_sys::fuzz_target;

use fftmul::{from_limbs, MulContext};

fuzz_target!(|data: &[u8]| {
    let a: Vec<u64> = data
        .chunks(8)
        .map(|c| {
            let mut w = [0u8; 8];
            w[..c.len()].copy_from_slice(c);
            u64::from_le_bytes(w)
        })
        .collect();

    let mut ctx = MulContext::new();
    let sq = ctx.sqr_vec(&a).expect("operand within the largest profile");
    let x = from_limbs(&a);
    assert_eq!(from_limbs(&sq), &x * &x, "an={}", a.len());
    assert_eq!(ctx.mul_vec(&a, &a).expect("same operand twice"), sq);
});
