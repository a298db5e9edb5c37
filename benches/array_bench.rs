//! Benchmarks for diskarray read paths

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use diskarray::{Database, I64Serializer, Utf8Serializer};
use tempfile::TempDir;
use uuid::Uuid;

const RECORDS: i64 = 100_000;

fn build_database(dir: &TempDir) -> Database {
    Database::create(dir.path().join("bench.db"), Uuid::new_v4())
        .unwrap()
        .add_fixed_array(I64Serializer, |_| Ok((0..RECORDS).map(|n| Ok(n * 2))))
        .unwrap()
        .add_variable_array(Utf8Serializer, |_| {
            Ok((0..RECORDS).map(|n| Ok(format!("key-{:012}", n * 2))))
        })
        .unwrap()
        .finish()
        .unwrap()
}

fn read_benchmarks(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let db = build_database(&dir);
    let numbers = db.get::<i64>(0).unwrap();
    let keys = db.get::<String>(1).unwrap();

    c.bench_function("clustered_get", |b| {
        let mut id = 0u64;
        b.iter(|| {
            id = (id + 7919) % RECORDS as u64;
            black_box(numbers.get(id).unwrap())
        })
    });

    c.bench_function("indirect_get", |b| {
        let mut id = 0u64;
        b.iter(|| {
            id = (id + 7919) % RECORDS as u64;
            black_box(keys.get(id).unwrap())
        })
    });

    c.bench_function("clustered_binary_search", |b| {
        let mut probe = 0i64;
        b.iter(|| {
            probe = (probe + 15_838) % (RECORDS * 2);
            black_box(numbers.binary_search_by_key(&probe, |n| *n).unwrap())
        })
    });

    c.bench_function("indirect_equal_range", |b| {
        let probe = format!("key-{:012}", 123_456);
        b.iter(|| black_box(keys.equal_range_by(|k| k.as_str().cmp(probe.as_str())).unwrap()))
    });

    c.bench_function("clustered_range_1000", |b| {
        b.iter(|| black_box(numbers.get_range(5_000, 6_000).unwrap()))
    });
}

fn build_benchmarks(c: &mut Criterion) {
    c.bench_function("build_sorted_10k", |b| {
        b.iter(|| {
            let dir = TempDir::new().unwrap();
            Database::create(dir.path().join("build.db"), Uuid::new_v4())
                .unwrap()
                .add_fixed_array_sorted_by_key(
                    I64Serializer,
                    |_| Ok((0..10_000i64).rev().map(Ok)),
                    |n| *n,
                )
                .unwrap()
                .finish()
                .unwrap()
        })
    });
}

criterion_group!(benches, read_benchmarks, build_benchmarks);
criterion_main!(benches);
