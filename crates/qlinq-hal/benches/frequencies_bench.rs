//! Benchmarks for the frequency codec
//!
//! Run with: cargo bench -p qlinq-hal

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use num_complex::Complex64;
use qlinq_hal::StatevectorOrder;
use qlinq_hal::frequencies::{exact_frequencies, sample_frequencies};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Uniform superposition over `n` qubits.
fn uniform(n: u32) -> Vec<Complex64> {
    let amp = Complex64::new(((1u64 << n) as f64).sqrt().recip(), 0.0);
    vec![amp; 1 << n]
}

/// Benchmark exact conversion
fn bench_exact(c: &mut Criterion) {
    let mut group = c.benchmark_group("exact_frequencies");

    for n in [4u32, 10, 16] {
        let sv = uniform(n);
        group.bench_with_input(BenchmarkId::new("uniform", n), &sv, |b, sv| {
            b.iter(|| exact_frequencies(black_box(sv), StatevectorOrder::MsqFirst, 1e-10).unwrap());
        });
    }

    group.finish();
}

/// Benchmark shot sampling
fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_frequencies");
    let exact = exact_frequencies(&uniform(8), StatevectorOrder::MsqFirst, 1e-10).unwrap();

    for shots in [1_000u64, 100_000] {
        group.bench_with_input(BenchmarkId::new("shots", shots), &shots, |b, &shots| {
            let mut rng = StdRng::seed_from_u64(0);
            b.iter(|| sample_frequencies(black_box(&exact), shots, &mut rng).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_exact, bench_sampling);
criterion_main!(benches);
