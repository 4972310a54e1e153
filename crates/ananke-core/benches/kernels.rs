//! Criterion benchmarks for fresh kernel derivation and reconstruction.

use ananke_core::{
    DensityEstimate, KernelConvention, KernelNormalization, KernelSet, Scale, dummy_densities,
    reconstruct,
};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::SmallRng;

const N: usize = 100_000;

fn densities() -> DensityEstimate {
    let (pos, vel) = dummy_densities(N, &mut SmallRng::seed_from_u64(7));
    DensityEstimate::new(pos, Some(vel)).expect("dummy densities are positive")
}

fn bench_derive_100k(c: &mut Criterion) {
    let d = densities();
    let k = Scale::Uniform(1.0);
    c.bench_function("derive_kernels_100k", |b| {
        b.iter(|| KernelSet::derive(black_box(&d), black_box(&k)).unwrap())
    });
}

fn bench_reconstruct_current_100k(c: &mut Criterion) {
    let d = densities();
    let h = KernelSet::derive(&d, &Scale::Uniform(1.0)).unwrap().to_column();
    c.bench_function("reconstruct_current_100k", |b| {
        b.iter(|| reconstruct(black_box(d.rho_pos()), black_box(&h), 64, KernelConvention::Current).unwrap())
    });
}

fn bench_reconstruct_former_100k(c: &mut Criterion) {
    let d = densities();
    let k = KernelNormalization::former().k_factor(64);
    let h = KernelSet::derive(&d, &k).unwrap().to_column();
    c.bench_function("reconstruct_former_100k", |b| {
        b.iter(|| reconstruct(black_box(d.rho_pos()), black_box(&h), 64, KernelConvention::Former).unwrap())
    });
}

criterion_group!(
    benches,
    bench_derive_100k,
    bench_reconstruct_current_100k,
    bench_reconstruct_former_100k
);
criterion_main!(benches);
