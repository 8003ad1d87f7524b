//! Store operation benchmarks
//!
//! Rough targets on laptop hardware:
//! - create: >100K ops/sec
//! - get (identity-map hit): >500K ops/sec
//! - indexed point query: >50K ops/sec
//! - indexed range query over 10K records: >5K ops/sec
//! - transaction commit of 10 writes: >20K ops/sec

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use lode_engine::{Record, Rid, Store};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};

fn rec(v: serde_json::Value) -> Record {
    Record::try_from(v).unwrap()
}

fn populated_store(n: i64) -> Store {
    let store = Store::new();
    let records: Vec<Record> = (0..n)
        .map(|i| {
            rec(json!({
                "id": i,
                "name": format!("user{}", i),
                "score": i % 100,
                "group": i % 7,
            }))
        })
        .collect();
    store.create_many(records).unwrap();
    store
}

fn bench_create(c: &mut Criterion) {
    let store = Store::new();
    let mut group = c.benchmark_group("store");
    group.throughput(Throughput::Elements(1));

    let counter = AtomicU64::new(0);
    group.bench_function("create", |b| {
        b.iter(|| {
            let i = counter.fetch_add(1, Ordering::SeqCst);
            store
                .create(rec(json!({"id": i, "score": i % 100})))
                .unwrap()
        })
    });
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let store = populated_store(1000);
    let mut group = c.benchmark_group("store");
    group.throughput(Throughput::Elements(1));

    let counter = AtomicU64::new(0);
    group.bench_function("get", |b| {
        b.iter(|| {
            let i = (counter.fetch_add(1, Ordering::SeqCst) % 1000) as i64;
            store.get(&Rid::from(i)).unwrap()
        })
    });
    group.finish();
}

fn bench_point_query(c: &mut Criterion) {
    let store = populated_store(10_000);
    let row = Store::symbol();
    let mut group = c.benchmark_group("query");
    group.throughput(Throughput::Elements(1));

    group.bench_function("point", |b| {
        b.iter(|| {
            store
                .select([])
                .where_(row.attr("name").eq("user5000"))
                .count()
                .unwrap()
        })
    });
    group.finish();
}

fn bench_range_query(c: &mut Criterion) {
    let store = populated_store(10_000);
    let row = Store::symbol();
    let mut group = c.benchmark_group("query");
    group.throughput(Throughput::Elements(1));

    group.bench_function("range", |b| {
        b.iter(|| {
            store
                .select([])
                .where_(row.attr("score").lt(10) & row.attr("group").eq(3))
                .count()
                .unwrap()
        })
    });
    group.finish();
}

fn bench_transaction_commit(c: &mut Criterion) {
    let store = populated_store(1000);
    let mut group = c.benchmark_group("transaction");
    group.throughput(Throughput::Elements(10));

    group.bench_function("commit_10_writes", |b| {
        b.iter(|| {
            let tx = store.transaction();
            for i in 0..10i64 {
                tx.update(&Rid::from(i), rec(json!({"score": i + 1}))).unwrap();
            }
            tx.commit().unwrap()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_create,
    bench_get,
    bench_point_query,
    bench_range_query,
    bench_transaction_commit
);
criterion_main!(benches);
