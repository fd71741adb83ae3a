//! Datatype converter benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use persist_codec::{Converter, Datatype, Value};

/// Benchmark coercion of raw text into each datatype.
fn bench_coerce(c: &mut Criterion) {
    let mut group = c.benchmark_group("coerce");

    let cases = [
        ("varchar", Datatype::varchar(40), "Flintstone"),
        ("char", Datatype::char(12), "Fred"),
        ("number", Datatype::number(), "35.25"),
        ("decimal", Datatype::decimal(10, 2), "1234.5678"),
        ("timestamp", Datatype::timestamp(), "1960-09-30 20:30:00.250"),
    ];
    for (name, datatype, raw) in cases {
        group.bench_function(name, |b| {
            b.iter(|| {
                let value = datatype.coerce(black_box(Value::from(raw))).unwrap();
                black_box(value);
            });
        });
    }

    group.finish();
}

/// Benchmark serializing coerced values to their stored form.
fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");

    let cases = [
        ("varchar", Datatype::varchar(40), "Flintstone"),
        ("number", Datatype::decimal(10, 2), "1234.56"),
        ("timestamp", Datatype::timestamp(), "1960-09-30 20:30:00.250"),
    ];
    for (name, datatype, raw) in cases {
        let value = datatype.coerce(Value::from(raw)).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| {
                let stored = datatype.serialize(black_box(&value)).unwrap();
                black_box(stored);
            });
        });
    }

    group.finish();
}

/// Benchmark parsing stored fields back into values.
fn bench_deserialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("deserialize");

    let cases = [
        ("varchar", Datatype::varchar(40), "Flintstone"),
        ("number", Datatype::number(), "1234.56"),
        ("timestamp", Datatype::timestamp(), "1960-09-30 20:30:00.25"),
        ("empty", Datatype::number(), ""),
    ];
    for (name, datatype, stored) in cases {
        group.bench_function(name, |b| {
            b.iter(|| {
                let value = datatype.deserialize(black_box(stored)).unwrap();
                black_box(value);
            });
        });
    }

    group.finish();
}

/// Benchmark datatype-aware comparison.
fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");

    let number = Datatype::number();
    let (a, b_value) = (Value::Number(9.0), Value::Number(10.0));
    group.bench_function("number", |b| {
        b.iter(|| black_box(number.compare(black_box(&a), black_box(&b_value))));
    });

    let timestamp = Datatype::timestamp();
    let early = timestamp.coerce(Value::from("1960-01-01")).unwrap();
    let late = timestamp.coerce(Value::from("1999-12-31 23:59:59")).unwrap();
    group.bench_function("timestamp", |b| {
        b.iter(|| black_box(timestamp.compare(black_box(&early), black_box(&late))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_coerce,
    bench_serialize,
    bench_deserialize,
    bench_compare,
);

criterion_main!(benches);
