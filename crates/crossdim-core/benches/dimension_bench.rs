//! # Dimension Benchmarks
//!
//! Performance benchmarks for crossdim-core ingestion and filtering.
//!
//! Run with: `cargo bench -p crossdim-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use crossdim_core::{Dimension, DimensionManager, Filter, Key};
use std::hint::black_box;

type Row = (u32, u32, i64);

/// Records spread over 10 series and 100 buckets per series.
fn records(size: usize) -> Vec<Row> {
    (0..size)
        .map(|i| ((i % 10) as u32, (i % 100) as u32, i as i64))
        .collect()
}

fn summing(id: &str, reprocess: bool) -> Dimension<Row, i64> {
    Dimension::<Row, i64>::builder()
        .id(id)
        .series_key(|r: &Row| Key::new(r.0.to_string()))
        .bucket_key(|r: &Row| Key::new(r.1.to_string()))
        .reducer(|_| 0, |acc, r| *acc += r.2, |acc, r| *acc -= r.2)
        .reprocess_all_on_filter(reprocess)
        .build()
        .expect("build")
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_ingestion(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingestion");

    for size in [1000, 10000, 100000].iter() {
        let data = records(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| {
                let mut dim = summing("bench", false);
                dim.add_many(data.iter().cloned());
                black_box(dim)
            });
        });
    }

    group.finish();
}

fn bench_filter_toggle(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_toggle");

    for size in [1000, 10000, 100000].iter() {
        for (label, reprocess) in [("incremental", false), ("reprocess", true)] {
            let mut dim = summing("bench", reprocess);
            dim.add_many(records(*size));

            group.bench_function(BenchmarkId::new(label, size), |b| {
                b.iter(|| {
                    dim.add_filter(Filter::new("half", |r: &Row| r.0 < 5));
                    dim.remove_filter("half");
                    black_box(dim.included_count())
                });
            });
        }
    }

    group.finish();
}

fn bench_cross_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("cross_selection");

    for size in [1000, 10000].iter() {
        let mut manager = DimensionManager::new();
        manager
            .add_dimension(summing("series", false))
            .expect("add");
        manager.add_dimension(summing("peer", false)).expect("add");
        manager.add_data(records(*size));

        group.bench_function(BenchmarkId::from_parameter(size), |b| {
            b.iter(|| {
                manager.select("series", ["3"]).expect("select");
                manager.clear_selection("series").expect("clear");
                black_box(manager.len())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_ingestion,
    bench_filter_toggle,
    bench_cross_selection
);
criterion_main!(benches);
