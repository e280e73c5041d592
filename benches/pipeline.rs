//! Benchmark suite for the cross-impact pipeline.
//!
//! Run with: `cargo bench`
//!
//! This benchmark measures:
//! - Multi-level OFI throughput
//! - PCA integration
//! - Lasso coordinate descent (single alpha and full path)
//! - Design matrix construction and panel-wide fitting

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cross_impact::{
    compute_level_ofi, compute_log_returns,
    design::{AlignedPanel, DesignMatrixBuilder},
    estimator::{alpha_max, AlphaGrid, CrossImpactEstimator, LassoSolver, RegressionConfig},
    integration::{IntegratedOfiSeries, PcaConfig, PcaIntegrator},
    BookLevel, ReturnSeries, Snapshot,
};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Random-walk book with `levels` levels, one-second spacing.
fn create_snapshots(symbol: &str, count: usize, levels: usize, seed: u64) -> Vec<Snapshot> {
    let mut rng = StdRng::seed_from_u64(seed);
    let tick = 0.01;
    let mut mid = 100.0;
    let mut rows = Vec::with_capacity(count);

    for i in 0..count {
        mid += tick * (rng.gen_range(-2i32..=2) as f64);
        let book = (0..levels)
            .map(|l| {
                let offset = tick * (l as f64 + 0.5);
                BookLevel::new(
                    mid - offset,
                    mid + offset,
                    rng.gen_range(100.0..1000.0),
                    rng.gen_range(100.0..1000.0),
                )
            })
            .collect();
        rows.push(Snapshot::new(symbol, i as i64 * 1_000_000_000, book));
    }
    rows
}

fn create_regression(n: usize, p: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let x = Array2::from_shape_fn((n, p), |_| normal.sample(&mut rng));
    let y = Array1::from_shape_fn(n, |i| {
        0.8 * x[[i, 0]] - 0.3 * x[[i, 1 % p]] + 0.1 * normal.sample(&mut rng)
    });
    (x, y)
}

fn create_panel(symbols: usize, count: usize) -> AlignedPanel {
    let levels = 5;
    let integrator = PcaIntegrator::new(PcaConfig::default());
    let mut ofi: Vec<IntegratedOfiSeries> = Vec::new();
    let mut returns: Vec<ReturnSeries> = Vec::new();

    for s in 0..symbols {
        let symbol = format!("S{s:02}");
        let rows = create_snapshots(&symbol, count, levels, s as u64);
        let level_ofi = compute_level_ofi(&symbol, &rows, levels);
        let (integrated, _) = integrator.fit_transform(&level_ofi).unwrap();
        ofi.push(integrated);
        returns.push(compute_log_returns(&symbol, &rows));
    }
    AlignedPanel::new(&ofi, &returns).unwrap()
}

fn bench_level_ofi(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_ofi");

    for levels in [1, 5, 10] {
        let rows = create_snapshots("AAA", 10_000, levels, 7);
        group.throughput(Throughput::Elements(rows.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(levels), &rows, |b, rows| {
            b.iter(|| compute_level_ofi(black_box("AAA"), black_box(rows), levels))
        });
    }
    group.finish();
}

fn bench_pca(c: &mut Criterion) {
    let rows = create_snapshots("AAA", 10_000, 10, 11);
    let level_ofi = compute_level_ofi("AAA", &rows, 10);
    let integrator = PcaIntegrator::new(PcaConfig::default());

    c.bench_function("pca_fit_transform_10_levels", |b| {
        b.iter(|| integrator.fit_transform(black_box(&level_ofi)).unwrap())
    });
}

fn bench_lasso(c: &mut Criterion) {
    let mut group = c.benchmark_group("lasso");
    let solver = LassoSolver::default();

    for p in [10, 50] {
        let (x, y) = create_regression(2_000, p, 3);
        let amax = alpha_max(&x, &y).unwrap();
        let path = AlphaGrid::default().resolve(amax);

        group.bench_with_input(BenchmarkId::new("single_alpha", p), &p, |b, _| {
            b.iter(|| solver.fit(black_box(&x), black_box(&y), amax * 0.01).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("path", p), &p, |b, _| {
            b.iter(|| solver.fit_path(black_box(&x), black_box(&y), &path).unwrap())
        });
    }
    group.finish();
}

fn bench_design_and_fit(c: &mut Criterion) {
    let panel = create_panel(10, 2_000);
    let builder = DesignMatrixBuilder::new();

    c.bench_function("design_build_all_3_horizons", |b| {
        b.iter(|| builder.build_all(black_box(&panel), &[0, 1, 5]).unwrap())
    });

    let config = RegressionConfig {
        alpha_grid: AlphaGrid::Auto {
            n_alphas: 20,
            eps: 1e-3,
        },
        ..RegressionConfig::default()
    };
    let estimator = CrossImpactEstimator::new(config);
    let mut group = c.benchmark_group("fit_panel");
    group.sample_size(10);
    group.bench_function("10_symbols_3_horizons", |b| {
        b.iter(|| estimator.fit_panel(black_box(&panel), &[0, 1, 5]).unwrap())
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_level_ofi,
    bench_pca,
    bench_lasso,
    bench_design_and_fit
);
criterion_main!(benches);
