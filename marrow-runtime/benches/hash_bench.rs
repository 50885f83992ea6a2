//! Dispatch benchmarks using criterion.
//!
//! Run with: cargo bench --bench hash_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use marrow_runtime::builtins::{string_value, uint64_value};
use marrow_runtime::portable::portable_hash;
use marrow_runtime::{dynamic_equal, dynamic_hash, string_compare, HashState};

const KEYS: [usize; 4] = [0x9E37_79B9 | 1, 0xC2B2_AE3D | 1, 0x1656_67B1 | 1, 0x27D4_EB2F | 1];

fn bench_dynamic_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("dynamic_hash");
    let state = HashState::portable(KEYS);

    group.bench_function("uint64", |b| {
        let v = uint64_value(0xDEAD_BEEF);
        b.iter(|| dynamic_hash(&state, black_box(&v), black_box(42)).unwrap());
    });

    for len in [8usize, 64, 1024] {
        let payload = "x".repeat(len);
        let v = string_value(&payload);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("string", len), &v, |b, v| {
            b.iter(|| dynamic_hash(&state, black_box(v), black_box(42)).unwrap());
        });
    }

    group.finish();
}

fn bench_dynamic_equal(c: &mut Criterion) {
    let mut group = c.benchmark_group("dynamic_equal");

    group.bench_function("uint64_direct", |b| {
        let x = uint64_value(1);
        let y = uint64_value(1);
        b.iter(|| dynamic_equal(black_box(&x), black_box(&y)).unwrap());
    });

    group.bench_function("string_64b", |b| {
        let payload = "y".repeat(64);
        let x = string_value(&payload);
        let y = string_value(&payload);
        b.iter(|| dynamic_equal(black_box(&x), black_box(&y)).unwrap());
    });

    group.finish();
}

fn bench_portable_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("portable_hash");

    for len in [8usize, 64, 1024] {
        let data = vec![0xA5u8; len];
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &data, |b, data| {
            b.iter(|| portable_hash(&KEYS, black_box(data), black_box(7)));
        });
    }

    group.finish();
}

fn bench_string_compare(c: &mut Criterion) {
    let a = "k".repeat(256);
    let mut b = a.clone();
    b.push('!');

    c.bench_function("string_compare_256b", |bench| {
        bench.iter(|| string_compare(black_box(&a), black_box(&b)));
    });
}

criterion_group!(
    benches,
    bench_dynamic_hash,
    bench_dynamic_equal,
    bench_portable_hash,
    bench_string_compare
);
criterion_main!(benches);
