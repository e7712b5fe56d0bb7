use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use memoizer_core::singleflight::Group;
use memoizer_core::Memoizer;
use std::hint::black_box;
use std::thread;

fn bench_compute_cold(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_cold");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let memo: Memoizer<usize, ()> = Memoizer::new();
                for i in 0..size {
                    black_box(memo.compute(&("key", i), || Ok(i)));
                }
            });
        });
    }

    group.finish();
}

fn bench_compute_hits(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_hits");

    for size in [10, 100, 1000].iter() {
        // Pre-populate memoizer
        let memo: Memoizer<usize, ()> = Memoizer::new();
        for i in 0..*size {
            let _ = memo.compute(&format!("key{}", i), || Ok(i));
        }

        group.bench_with_input(BenchmarkId::new("str", size), size, |b, &size| {
            b.iter(|| {
                for i in 0..size {
                    black_box(memo.compute(&format!("key{}", i), || Ok(0)));
                }
            });
        });
    }

    group.finish();
}

fn bench_concurrent_hits(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_hits");

    for num_threads in [2, 4, 8].iter() {
        let memo: Memoizer<usize, ()> = Memoizer::new();
        for i in 0..100 {
            let _ = memo.compute(&i, || Ok(i));
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            num_threads,
            |b, &num_threads| {
                b.iter(|| {
                    thread::scope(|scope| {
                        for _ in 0..num_threads {
                            scope.spawn(|| {
                                for i in 0..100usize {
                                    black_box(memo.compute(&i, || Ok(0)));
                                }
                            });
                        }
                    });
                });
            },
        );
    }

    group.finish();
}

fn bench_concurrent_cold_same_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_cold_same_key");

    for num_threads in [2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            num_threads,
            |b, &num_threads| {
                b.iter(|| {
                    let memo: Memoizer<u64, ()> = Memoizer::new();
                    thread::scope(|scope| {
                        for _ in 0..num_threads {
                            scope.spawn(|| {
                                black_box(memo.compute("shared", || Ok((0..1_000u64).sum())));
                            });
                        }
                    });
                });
            },
        );
    }

    group.finish();
}

fn bench_group_leader_only(c: &mut Criterion) {
    c.bench_function("group_leader_only", |b| {
        let group: Group<u64> = Group::new();
        b.iter(|| black_box(group.call("k", || 1)));
    });
}

criterion_group!(
    benches,
    bench_compute_cold,
    bench_compute_hits,
    bench_concurrent_hits,
    bench_concurrent_cold_same_key,
    bench_group_leader_only
);
criterion_main!(benches);
