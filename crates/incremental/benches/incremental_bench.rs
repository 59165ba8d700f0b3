//! Benchmarks for liveseq-incremental.
//!
//! Target: single-edit diff over 10k elements < 50μs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use liveseq_incremental::{changes, MappingCache, Selector};
use std::sync::Arc;

fn shared_items(size: usize) -> Vec<Arc<u64>> {
    (0..size as u64).map(Arc::new).collect()
}

fn bench_diff_single_edit(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");

    for size in [10, 100, 1000, 10_000] {
        let before = shared_items(size);

        let mut added = before.clone();
        added.insert(size / 2, Arc::new(u64::MAX));
        group.bench_with_input(BenchmarkId::new("add_middle", size), &added, |b, after| {
            b.iter(|| changes(black_box(&before), black_box(after)))
        });

        let mut removed = before.clone();
        removed.remove(size / 2);
        group.bench_with_input(BenchmarkId::new("remove_middle", size), &removed, |b, after| {
            b.iter(|| changes(black_box(&before), black_box(after)))
        });

        let mut moved = before.clone();
        let item = moved.remove(0);
        moved.push(item);
        group.bench_with_input(BenchmarkId::new("move_first_to_last", size), &moved, |b, after| {
            b.iter(|| changes(black_box(&before), black_box(after)))
        });
    }

    group.finish();
}

fn bench_diff_noop(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff/noop");

    for size in [100, 10_000] {
        let before = shared_items(size);
        let after = before.clone();
        group.bench_with_input(BenchmarkId::new("identical", size), &after, |b, after| {
            b.iter(|| changes(black_box(&before), black_box(after)))
        });
    }

    group.finish();
}

fn bench_mapping_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapping");

    for size in [100, 1000] {
        let sources = shared_items(size);

        group.bench_with_input(BenchmarkId::new("cached_lookup", size), &sources, |b, sources| {
            let mut cache = MappingCache::new(Selector::plain(|s: &Arc<u64>| Arc::new(**s * 2)));
            for (i, s) in sources.iter().enumerate() {
                cache.get_or_create(s, i).unwrap();
            }
            b.iter(|| {
                for (i, s) in sources.iter().enumerate() {
                    black_box(cache.get_or_create(s, i).unwrap());
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_diff_single_edit,
    bench_diff_noop,
    bench_mapping_cache,
);

criterion_main!(benches);
