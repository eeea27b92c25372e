//! Property-based tests for the multi-prime multiplication engine.
//!
//! Every product is checked against num-bigint's schoolbook/Karatsuba
//! multiplication.

use num_bigint::BigUint;
use proptest::prelude::*;

use fftmul::{from_limbs, MulContext, SharedMulContext};

fn reference(a: &[u64], b: &[u64]) -> Vec<u64> {
    let mut z = (from_limbs(a) * from_limbs(b)).to_u64_digits();
    z.resize(a.len() + b.len(), 0);
    z
}

fn operand(max_len: usize) -> impl Strategy<Value = Vec<u64>> {
    prop_oneof![
        prop::collection::vec(any::<u64>(), 0..max_len),
        prop::collection::vec(Just(u64::MAX), 1..max_len),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Products of random operands match num-bigint.
    #[test]
    fn products_match_reference(a in operand(2500), b in operand(2500)) {
        let mut ctx = MulContext::new();
        prop_assert_eq!(ctx.mul_vec(&a, &b).unwrap(), reference(&a, &b));
    }

    /// Squares match products of an operand with a copy of itself.
    #[test]
    fn squares_match_reference(a in operand(3000)) {
        let mut ctx = MulContext::new();
        prop_assert_eq!(ctx.sqr_vec(&a).unwrap(), reference(&a, &a));
    }

    /// Operand order never changes the product.
    #[test]
    fn product_is_commutative(a in operand(800), b in operand(40)) {
        let mut ctx = MulContext::new();
        let ab = ctx.mul_vec(&a, &b).unwrap();
        prop_assert_eq!(ctx.mul_vec(&b, &a).unwrap(), ab);
    }

    /// The shared context agrees with the exclusive one.
    #[test]
    fn shared_context_agrees(a in operand(1500), b in operand(1500)) {
        let shared = SharedMulContext::new();
        let mut single = MulContext::new();
        prop_assert_eq!(shared.mul_vec(&a, &b).unwrap(), single.mul_vec(&a, &b).unwrap());
    }

    /// Results do not depend on what the context computed before.
    #[test]
    fn results_ignore_history(a in operand(600), b in operand(600), warm in 1000usize..6000) {
        let mut warmed = MulContext::new();
        let big = vec![u64::MAX; warm];
        warmed.mul_vec(&big, &big).unwrap();
        let mut fresh = MulContext::new();
        prop_assert_eq!(warmed.mul_vec(&a, &b).unwrap(), fresh.mul_vec(&a, &b).unwrap());
    }

    /// The `BigUint` wrappers agree with num-bigint.
    #[test]
    fn biguint_api_matches(a in operand(2000), b in operand(2000)) {
        let (x, y) = (from_limbs(&a), from_limbs(&b));
        prop_assert_eq!(fftmul::mul(&x, &y), &x * &y);
        prop_assert_eq!(fftmul::sqr(&x), &x * &x);
    }
}

#[test]
fn table_depth_grows_then_holds() {
    let mut ctx = MulContext::new();
    let initial = ctx.table_depth();
    let a = vec![0x5555_5555_5555_5555; 20_000];
    ctx.mul_vec(&a, &a).unwrap();
    let grown = ctx.table_depth();
    assert!(grown > initial);
    ctx.mul_vec(&a[..10], &a[..10]).unwrap();
    assert_eq!(ctx.table_depth(), grown);
}

#[test]
fn largest_power_of_two_limb_product() {
    let mut ctx = MulContext::new();
    let mut a = vec![0u64; 4096];
    a[4095] = 1 << 63;
    let z = ctx.sqr_vec(&a).unwrap();
    let want = BigUint::from(1u32) << (2 * (4096 * 64 - 1usize));
    assert_eq!(from_limbs(&z), want);
}
