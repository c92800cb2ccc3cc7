#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use stasis::{Options, Stasis, Value};
use std::hint::black_box;

/// A wide graph: one map of many flat lists.
fn generate_wide(lists: usize, items: usize) -> Value {
    Value::map((0..lists).map(|i| {
        (
            format!("list_{i}"),
            Value::list((0..items).map(|j| Value::from((i * items + j) as i64)).collect()),
        )
    }))
}

/// A deep graph: nested single-element lists.
fn generate_deep(depth: usize) -> Value {
    let mut value = Value::from(0i64);
    for _ in 0..depth {
        value = Value::list(vec![value]);
    }
    value
}

/// A graph with heavy aliasing: every entry shares one payload list.
fn generate_shared(aliases: usize) -> Value {
    let shared = Value::list((0..1024).map(Value::from).collect());
    Value::map((0..aliases).map(|i| (format!("alias_{i}"), shared.clone())))
}

fn bench_serialize(c: &mut Criterion) {
    let engine = Stasis::new();
    let wide = generate_wide(64, 256);
    let deep = generate_deep(512);
    let shared = generate_shared(256);

    let baseline = engine
        .serialize(&wide, Options::default())
        .expect("serialize");

    let mut group = c.benchmark_group("serialize");
    group.throughput(Throughput::Bytes(baseline.len() as u64));

    group.bench_function("wide", |b| {
        b.iter(|| engine.serialize(black_box(&wide), Options::default()))
    });
    group.bench_function("deep", |b| {
        b.iter(|| engine.serialize(black_box(&deep), Options::default()))
    });
    group.bench_function("shared", |b| {
        b.iter(|| engine.serialize(black_box(&shared), Options::default()))
    });
    group.finish();
}

fn bench_deserialize(c: &mut Criterion) {
    let engine = Stasis::new();
    let wide = engine
        .serialize(&generate_wide(64, 256), Options::default())
        .expect("serialize");
    let deep = engine
        .serialize(&generate_deep(512), Options::default())
        .expect("serialize");

    let mut group = c.benchmark_group("deserialize");
    group.throughput(Throughput::Bytes(wide.len() as u64));

    group.bench_function("wide", |b| {
        b.iter(|| engine.deserialize(black_box(&wide), Options::default()))
    });
    group.bench_function("deep", |b| {
        b.iter(|| engine.deserialize(black_box(&deep), Options::default()))
    });
    group.finish();
}

criterion_group!(benches, bench_serialize, bench_deserialize);
criterion_main!(benches);
