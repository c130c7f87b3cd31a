//! Benchmarks for emberkv store operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use emberkv::{Config, Store};

fn store_benchmarks(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::builder()
        .path(dir.path().join("bench.db"))
        .auto_dump(false)
        .build();
    let db = Store::open(config).unwrap();

    c.bench_function("set (no dump)", |b| {
        let mut i = 0u64;
        b.iter(|| {
            db.set(format!("key{}", i % 1024), i as i64).unwrap();
            i += 1;
        });
    });

    for i in 0..1024 {
        db.set(format!("key{}", i), i as i64).unwrap();
    }

    c.bench_function("get", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(db.get(&format!("key{}", i % 1024)));
            i += 1;
        });
    });

    c.bench_function("commit (1024 keys)", |b| {
        b.iter(|| db.commit().unwrap());
    });
}

criterion_group!(benches, store_benchmarks);
criterion_main!(benches);
