//! Cursor decorator benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use featurekit_bench::{columns, generate_rows, record_type};
use featurekit_core::cursor::{
    AttributeCursor, FilteringCursor, JoiningCursor, MaxCountCursor, RecordCursor, RowCursor, TypedRecordCursor,
};
use featurekit_core::lock::generate_token;
use featurekit_core::{Filter, Value};
use std::time::Duration;

fn even_rank() -> Filter {
    Filter::matching("even rank", |r| {
        r.get(1).ok().and_then(Value::as_i64).is_some_and(|rank| rank % 2 == 0)
    })
}

/// Benchmark reading through a typed cursor, bare and decorated.
fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");

    for count in [100, 1_000, 10_000] {
        let rows = generate_rows(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("typed", count), &rows, |b, rows| {
            b.iter(|| {
                let cursor = TypedRecordCursor::with_type(RowCursor::new(columns(), rows.clone()), record_type());
                black_box(cursor.into_records().count());
            });
        });

        group.bench_with_input(BenchmarkId::new("filtered", count), &rows, |b, rows| {
            b.iter(|| {
                let typed = TypedRecordCursor::with_type(RowCursor::new(columns(), rows.clone()), record_type());
                let cursor = FilteringCursor::new(typed, even_rank()).unwrap();
                black_box(cursor.into_records().count());
            });
        });

        group.bench_with_input(BenchmarkId::new("filtered_max_10", count), &rows, |b, rows| {
            b.iter(|| {
                let typed = TypedRecordCursor::with_type(RowCursor::new(columns(), rows.clone()), record_type());
                let filtered = FilteringCursor::new(typed, even_rank()).unwrap();
                let cursor = MaxCountCursor::new(filtered, 10);
                black_box(cursor.into_records().count());
            });
        });
    }

    group.finish();
}

/// Benchmark reading every column through a joined cursor.
fn bench_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("join");

    for parts in [2, 4, 8] {
        let rows = generate_rows(1_000);
        group.bench_with_input(BenchmarkId::new("constituents", parts), &rows, |b, rows| {
            b.iter(|| {
                let cursors: Vec<Box<dyn AttributeCursor + Send>> = (0..parts)
                    .map(|_| Box::new(RowCursor::new(columns(), rows.clone())) as Box<dyn AttributeCursor + Send>)
                    .collect();
                let mut joined = JoiningCursor::new(cursors);
                let width = joined.column_count();
                while joined.has_next().unwrap() {
                    joined.advance().unwrap();
                    for i in 0..width {
                        black_box(joined.read(i).unwrap());
                    }
                }
                joined.close().unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark lock token generation.
fn bench_tokens(c: &mut Criterion) {
    c.bench_function("generate_token", |b| {
        b.iter(|| black_box(generate_token(black_box("bench"), Duration::from_secs(60))));
    });
}

criterion_group!(benches, bench_read, bench_join, bench_tokens);
criterion_main!(benches);
