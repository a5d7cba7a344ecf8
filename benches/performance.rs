//! Performance benchmarks for the store and its middlewares.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};
use statecraft::{
    create_json_storage, create_store, create_store_with, persist, FileStorage, GetState,
    MemoryStorage, PersistOptions, SelectorOptions, SetState, StateStorage, StoreApi, Update,
};
use std::sync::Arc;
use tempfile::TempDir;

fn wide_state(keys: usize) -> Value {
    Value::Object((0..keys).map(|i| (format!("k{}", i), json!(i))).collect())
}

/// Benchmark merge cost with varying state widths
fn bench_set_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_state");

    for keys in [1, 16, 256] {
        group.bench_with_input(BenchmarkId::new("merge_keys", keys), &keys, |b, &keys| {
            let api = create_store_with(wide_state(keys));
            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                api.set_state(json!({ "k0": n }), false);
            });
        });
    }

    group.bench_function("updater", |b| {
        let api = create_store_with(json!({"count": 0}));
        b.iter(|| {
            api.set_state(
                Update::with(|s| Arc::new(json!({"count": s["count"].as_i64().unwrap_or(0) + 1}))),
                false,
            );
        });
    });

    group.finish();
}

/// Benchmark notification fan-out
fn bench_notify(c: &mut Criterion) {
    let mut group = c.benchmark_group("notify");

    for listeners in [1, 10, 100] {
        group.bench_with_input(BenchmarkId::new("selectors", listeners), &listeners, |b, &listeners| {
            let api = create_store_with(json!({"hot": 0, "cold": 0}));
            let _subs: Vec<_> = (0..listeners)
                .map(|_| {
                    api.subscribe_with_selector(
                        |s: &Value| s["cold"].clone(),
                        |next: &Value, _: &Value| {
                            black_box(next);
                        },
                        SelectorOptions::default(),
                    )
                })
                .collect();

            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                api.set_state(json!({ "hot": n }), false);
            });
        });
    }

    group.finish();
}

fn persisted(storage: Arc<dyn StateStorage>) -> StoreApi {
    let storage = create_json_storage(move || Ok(storage)).unwrap();
    create_store(persist(
        |_set: SetState, _get: GetState, _api: &StoreApi| wide_state(32),
        PersistOptions::new("bench").storage(storage),
    ))
}

/// Benchmark write-through persistence
fn bench_persist(c: &mut Criterion) {
    let mut group = c.benchmark_group("persist");

    group.bench_function("memory", |b| {
        let api = persisted(Arc::new(MemoryStorage::new()));
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            api.set_state(json!({ "k0": n }), false);
        });
    });

    group.sample_size(20);
    group.bench_function("file", |b| {
        let dir = TempDir::new().unwrap();
        let api = persisted(Arc::new(FileStorage::new(dir.path(), 16).unwrap()));
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            api.set_state(json!({ "k0": n }), false);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_set_state, bench_notify, bench_persist);
criterion_main!(benches);
