//! Criterion benchmarks for NTT multiplication.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use num_bigint::BigUint;

use fftmul::{from_limbs, MulContext, SharedMulContext};

fn limbs(n: usize, seed: u64) -> Vec<u64> {
    (0..n as u64)
        .map(|i| (i ^ seed).wrapping_mul(0x9e37_79b9_7f4a_7c15).rotate_left(29))
        .collect()
}

fn bench_engine(c: &mut Criterion) {
    let sizes: Vec<usize> = vec![1_000, 10_000, 100_000, 1_000_000];

    let mut ctx = MulContext::new();
    let mut group = c.benchmark_group("MulContext");
    for &n in &sizes {
        let (a, b) = (limbs(n, 1), limbs(n, 2));
        let mut z = vec![0; 2 * n];
        ctx.reserve(n, n).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, _| {
            bench.iter(|| ctx.mul(&mut z, black_box(&a), black_box(&b)).unwrap());
        });
    }
    group.finish();

    let mut group = c.benchmark_group("MulContextSquare");
    for &n in &sizes {
        let a = limbs(n, 3);
        let mut z = vec![0; 2 * n];
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, _| {
            bench.iter(|| ctx.sqr(&mut z, black_box(&a)).unwrap());
        });
    }
    group.finish();

    let shared = SharedMulContext::new();
    let mut group = c.benchmark_group("SharedMulContext");
    for &n in &sizes {
        let (a, b) = (limbs(n, 4), limbs(n, 5));
        let mut z = vec![0; 2 * n];
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, _| {
            bench.iter(|| shared.mul(&mut z, black_box(&a), black_box(&b)).unwrap());
        });
    }
    group.finish();
}

fn bench_vs_num_bigint(c: &mut Criterion) {
    let mut group = c.benchmark_group("NumBigint");
    for &n in &[1_000usize, 10_000, 100_000] {
        let a: BigUint = from_limbs(&limbs(n, 6));
        let b: BigUint = from_limbs(&limbs(n, 7));
        group.bench_with_input(BenchmarkId::new("num-bigint", n), &n, |bench, _| {
            bench.iter(|| black_box(&a) * black_box(&b));
        });
        group.bench_with_input(BenchmarkId::new("fftmul", n), &n, |bench, _| {
            bench.iter(|| fftmul::mul(black_box(&a), black_box(&b)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_engine, bench_vs_num_bigint);
criterion_main!(benches);
