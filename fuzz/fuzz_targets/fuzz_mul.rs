#![no_main]

use libfuzzer_sys::fuzz_target;
use num_bigint::BigUint;

use fftmul::{from_limbs, MulContext};

fn words(bytes: &[u8]) -> Vec<u64> {
    bytes
        .chunks(8)
        .map(|c| {
            let mut w = [0u8; 8];
            w[..c.len()].copy_from_slice(c);
            u64::from_le_bytes(w)
        })
        .collect()
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    // First two bytes pick the split point and a repetition factor so that
    // short inputs still reach multi-block transforms.
    let split = usize::from(data[0]) * data.len() / 256;
    let repeat = usize::from(data[1] % 16) + 1;
    let body = &data[2..];
    let split = split.min(body.len());
    let a: Vec<u64> = words(&body[..split]).repeat(repeat);
    let b: Vec<u64> = words(&body[split..]);

    let mut ctx = MulContext::new();
    let z = ctx.mul_vec(&a, &b).expect("operands within the largest profile");
    let want: BigUint = from_limbs(&a) * from_limbs(&b);
    assert_eq!(from_limbs(&z), want, "an={} bn={}", a.len(), b.len());
});
