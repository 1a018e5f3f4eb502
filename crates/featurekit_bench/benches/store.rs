//! In-memory store benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use featurekit_bench::{columns, generate_rows};
use featurekit_core::cursor::RecordCursor;
use featurekit_core::{Filter, RecordType, Transaction, Value};
use featurekit_memory::{MemoryStore, Query};

fn store_with(count: usize) -> MemoryStore {
    let store = MemoryStore::default();
    store.create_type(RecordType::new("parcel", columns())).unwrap();
    store
        .add_records("parcel", generate_rows(count), &Transaction::auto_commit())
        .unwrap();
    store
}

/// Benchmark appending records, directly and through a transaction.
fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");

    for count in [100, 1_000] {
        let rows = generate_rows(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("auto_commit", count), &rows, |b, rows| {
            b.iter(|| {
                let store = store_with(0);
                store.add_records("parcel", rows.clone(), &Transaction::auto_commit()).unwrap();
                black_box(store.count("parcel").unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("transaction", count), &rows, |b, rows| {
            b.iter(|| {
                let store = store_with(0);
                let txn = Transaction::new();
                let _rx = store.subscribe("parcel", &Transaction::auto_commit());
                store.add_records("parcel", rows.clone(), &txn).unwrap();
                txn.commit().unwrap();
                black_box(store.count("parcel").unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark filtered queries against a populated store.
fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    let store = store_with(10_000);
    let auto = Transaction::auto_commit();

    group.bench_function("all", |b| {
        b.iter(|| black_box(store.query("parcel", &Query::all(), &auto).unwrap().into_records().count()));
    });

    group.bench_function("rank_below_100", |b| {
        b.iter(|| {
            let filter = Filter::matching("rank < 100", |r| {
                r.get(1).ok().and_then(Value::as_i64).is_some_and(|rank| rank < 100)
            });
            let cursor = store.query("parcel", &Query::filtered(filter), &auto).unwrap();
            black_box(cursor.into_records().count());
        });
    });

    group.bench_function("first_10", |b| {
        b.iter(|| {
            let cursor = store.query("parcel", &Query::all().max_records(10), &auto).unwrap();
            black_box(cursor.into_records().count());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_append, bench_query);
criterion_main!(benches);
