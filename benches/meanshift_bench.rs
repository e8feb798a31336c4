//! Benchmarks for bandwidth estimation and full clustering runs.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use forge_meanshift::{
    estimate_bandwidth, DenseMatrix, MeanShift, MeanShiftConfig, ParallelMap, PoolSize,
    SeedSelection,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn benchmark_bandwidth(c: &mut Criterion) {
    let sequential = ParallelMap::sequential();
    let global = ParallelMap::global();

    for n in [250, 1000] {
        let matrix = DenseMatrix::random_symmetric(n, &mut StdRng::seed_from_u64(n as u64));

        let mut group = c.benchmark_group(format!("bandwidth_{}", n));
        group.bench_function("sequential", |b| {
            b.iter(|| estimate_bandwidth(black_box(&matrix), 0.3, &sequential))
        });
        group.bench_function("parallel", |b| {
            b.iter(|| estimate_bandwidth(black_box(&matrix), 0.3, &global))
        });
        group.finish();
    }
}

fn benchmark_cluster(c: &mut Criterion) {
    let n = 500;
    let matrix = DenseMatrix::random_symmetric(n, &mut StdRng::seed_from_u64(42));

    let mut group = c.benchmark_group("cluster_500");
    group.sample_size(20);

    for (name, pool) in [
        ("sequential", PoolSize::Sequential),
        ("fixed_4", PoolSize::Fixed(4)),
        ("global", PoolSize::Global),
    ] {
        let engine = MeanShift::new(MeanShiftConfig::default().with_pool(pool));
        group.bench_function(name, |b| b.iter(|| engine.cluster(black_box(&matrix))));
    }
    group.finish();

    // Seed sampling: cost should scale with the number of seeds
    let mut group = c.benchmark_group("cluster_500_sampled");
    group.sample_size(20);
    for seeds in [50, 100, 250] {
        let engine = MeanShift::new(
            MeanShiftConfig::default().with_seeds(SeedSelection::Sample(seeds)),
        );
        group.bench_with_input(BenchmarkId::from_parameter(seeds), &seeds, |b, _| {
            b.iter(|| engine.cluster_with_rng(black_box(&matrix), &mut StdRng::seed_from_u64(7)))
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_bandwidth, benchmark_cluster);
criterion_main!(benches);
