//! 性能基准测试
//!
//! 覆盖插入、查询、批量查询与混合负载。

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flowhash::{ConcurrencyMode, CuckooTable, HashAlgorithm, TableConfig};
use rand::{rngs::StdRng, Rng, SeedableRng};

const SEED: u64 = 42;

fn bench_config(bucket_count: usize) -> TableConfig {
    TableConfig {
        bucket_count,
        slots_per_bucket: 4,
        key_len: 16,
        data_len: 8,
        hash_algorithm: HashAlgorithm::AHash,
        seed: Some(SEED),
        concurrency_mode: ConcurrencyMode::ReaderWriter,
        ..TableConfig::default()
    }
}

fn generate_keys(count: usize) -> Vec<[u8; 16]> {
    let mut rng = StdRng::seed_from_u64(SEED);
    (0..count)
        .map(|_| {
            let mut key = [0u8; 16];
            rng.fill(&mut key);
            key
        })
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for &count in &[1000usize, 10_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let keys = generate_keys(count);
            b.iter(|| {
                // 容量留足余量，测纯插入路径
                let table = CuckooTable::new(bench_config(count.next_power_of_two())).unwrap();
                for key in &keys {
                    table.insert(black_box(key), &[0u8; 8]).unwrap();
                }
            });
        });
    }
    group.finish();
}

fn bench_lookup_hit(c: &mut Criterion) {
    let count = 10_000;
    let table = CuckooTable::new(bench_config(8192)).unwrap();
    let keys = generate_keys(count);
    for key in &keys {
        table.insert(key, &[7u8; 8]).unwrap();
    }

    c.bench_function("lookup_hit", |b| {
        let mut idx = 0;
        b.iter(|| {
            let key = &keys[idx % count];
            idx += 1;
            black_box(table.lookup(key).unwrap())
        });
    });
}

fn bench_lookup_miss(c: &mut Criterion) {
    let table = CuckooTable::new(bench_config(8192)).unwrap();
    for key in generate_keys(10_000) {
        table.insert(&key, &[7u8; 8]).unwrap();
    }
    let missing = {
        let mut rng = StdRng::seed_from_u64(SEED + 1);
        let mut key = [0u8; 16];
        rng.fill(&mut key);
        key
    };

    c.bench_function("lookup_miss", |b| {
        b.iter(|| black_box(table.lookup(&missing)).is_err());
    });
}

fn bench_lookup_bulk(c: &mut Criterion) {
    let count = 10_000;
    let table = CuckooTable::new(bench_config(8192)).unwrap();
    let keys = generate_keys(count);
    for key in &keys {
        table.insert(key, &[7u8; 8]).unwrap();
    }
    let refs: Vec<&[u8]> = keys.iter().map(|k| k.as_slice()).collect();

    let mut group = c.benchmark_group("lookup_bulk");
    for &batch in &[64usize, 1024, 8192] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            b.iter(|| black_box(table.lookup_bulk(&refs[..batch])));
        });
    }
    group.finish();
}

fn bench_mixed_workload(c: &mut Criterion) {
    // 90%读 / 5%插 / 5%删，接近流表真实负载
    let table = CuckooTable::new(bench_config(8192)).unwrap();
    let keys = generate_keys(16_000);
    for key in &keys[..8000] {
        table.insert(key, &[7u8; 8]).unwrap();
    }

    c.bench_function("mixed_90r_5i_5d", |b| {
        let mut rng = StdRng::seed_from_u64(SEED + 2);
        b.iter(|| {
            let roll: u32 = rng.gen_range(0..100);
            let key = &keys[rng.gen_range(0..keys.len())];
            if roll < 90 {
                let _ = black_box(table.lookup(key));
            } else if roll < 95 {
                let _ = table.insert(key, &[7u8; 8]);
            } else {
                let _ = table.delete(key);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_insert,
    bench_lookup_hit,
    bench_lookup_miss,
    bench_lookup_bulk,
    bench_mixed_workload
);
criterion_main!(benches);
