//! Criterion benchmarks for the reconciliation hot paths.
//!
//! Benchmarks:
//! 1. Average aggregation over several vendor series
//! 2. Reference combination against a long stored reference
//! 3. CSV encode/decode of a long series

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stockcache_core::data::cache::{read_csv, write_csv};
use stockcache_core::data::synthetic::generate_synthetic_series;
use stockcache_core::data::{combine_reference, AggregationStrategy, AverageStrategy, Source};

// ── Helpers ──────────────────────────────────────────────────────────

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn bench_average(c: &mut Criterion) {
    let mut group = c.benchmark_group("average_aggregation");
    for years in [1, 10, 30] {
        let start = d(2020 - years, 1, 1);
        let inputs: Vec<_> = [Source::Yahoo, Source::Google, Source::Quandl]
            .into_iter()
            .map(|s| generate_synthetic_series("SPY", s, start, d(2019, 12, 31)))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(years), &inputs, |b, inputs| {
            b.iter(|| AverageStrategy.aggregate(black_box(inputs)))
        });
    }
    group.finish();
}

fn bench_reference(c: &mut Criterion) {
    let reference = generate_synthetic_series("SPY", Source::Yahoo, d(1995, 1, 1), d(2019, 6, 30));
    let raw = generate_synthetic_series("SPY", Source::Quandl, d(1990, 1, 1), d(2019, 12, 31));

    c.bench_function("combine_reference_30y", |b| {
        b.iter(|| combine_reference(Some(black_box(reference.clone())), black_box(&raw)))
    });
}

fn bench_csv(c: &mut Criterion) {
    let series = generate_synthetic_series("SPY", Source::Yahoo, d(1990, 1, 1), d(2019, 12, 31));
    let mut encoded = Vec::new();
    write_csv(&mut encoded, &series).unwrap();

    c.bench_function("csv_write_30y", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(encoded.len());
            write_csv(&mut buf, black_box(&series)).unwrap();
            buf
        })
    });
    c.bench_function("csv_read_30y", |b| {
        b.iter(|| read_csv(black_box(encoded.as_slice())).unwrap())
    });
}

criterion_group!(benches, bench_average, bench_reference, bench_csv);
criterion_main!(benches);
