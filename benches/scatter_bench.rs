//! Criterion micro-benchmarks for the hot paths the interactive target (§1,
//! ">=60 FPS up to 2x10^7 points") actually exercises per frame: projection,
//! hit-test, lasso construction, and spatial index build/query. Kept
//! separate from [`hyperscatter::perf`]'s harness (which measures
//! whole-operation wall-clock behavior for reporting) — these drill into
//! the individual functions criterion needs to size iteration counts for.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use hyperscatter::dataset::{synth, Geometry};
use hyperscatter::geometry::{euclidean, poincare, ViewState};
use hyperscatter::spatial_index::SpatialIndex;

const WIDTH: f32 = 1200.0;
const HEIGHT: f32 = 800.0;
const SEED: u64 = 42;
const LABEL_COUNT: u16 = 10;

fn bench_euclidean_projection(c: &mut Criterion) {
    let view = ViewState::euclidean(0.0, 0.0, 1.5);
    let mut group = c.benchmark_group("euclidean_projection");
    for &n in &[1_000u32, 100_000, 1_000_000] {
        let dataset = synth::generate(n, Geometry::Euclidean, SEED, LABEL_COUNT).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for i in 0..dataset.n() {
                    let (x, y) = dataset.point(i);
                    let (sx, sy) = euclidean::project(&view, WIDTH, HEIGHT, x, y);
                    acc += sx + sy;
                }
                acc
            })
        });
    }
    group.finish();
}

fn bench_poincare_projection(c: &mut Criterion) {
    let view = ViewState::poincare(0.1, -0.2, 1.3);
    let mut group = c.benchmark_group("poincare_projection");
    for &n in &[1_000u32, 100_000, 1_000_000] {
        let dataset = synth::generate(n, Geometry::Poincare, SEED, LABEL_COUNT).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for i in 0..dataset.n() {
                    let (x, y) = dataset.point(i);
                    let (sx, sy) = poincare::project(&view, WIDTH, HEIGHT, x, y);
                    acc += sx + sy;
                }
                acc
            })
        });
    }
    group.finish();
}

fn bench_spatial_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_index_build");
    for &n in &[100_000u32, 1_000_000] {
        let dataset = synth::generate(n, Geometry::Euclidean, SEED, LABEL_COUNT).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| SpatialIndex::build(&dataset))
        });
    }
    group.finish();
}

fn bench_spatial_index_aabb_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_index_aabb_query");
    for &n in &[100_000u32, 1_000_000] {
        let dataset = synth::generate(n, Geometry::Euclidean, SEED, LABEL_COUNT).unwrap();
        let index = SpatialIndex::build(&dataset);
        let bounds = index.bounds();
        let query = hyperscatter::geometry::Aabb {
            xmin: bounds.xmin + (bounds.xmax - bounds.xmin) * 0.3,
            ymin: bounds.ymin + (bounds.ymax - bounds.ymin) * 0.3,
            xmax: bounds.xmin + (bounds.xmax - bounds.xmin) * 0.6,
            ymax: bounds.ymin + (bounds.ymax - bounds.ymin) * 0.6,
        };
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut count = 0usize;
                index.for_each_in_aabb(query, |_| count += 1);
                count
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_euclidean_projection,
    bench_poincare_projection,
    bench_spatial_index_build,
    bench_spatial_index_aabb_query,
);
criterion_main!(benches);
