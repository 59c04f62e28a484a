//! Basic benchmarks for the `refcount_pool` package.
//!
//! Compares recycling through a pool against allocating a fresh instance every time, and
//! reports the bytes allocated per iteration for each.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::sync::Arc;

use alloc_tracker::{Allocator, Session};
use criterion::{Criterion, criterion_group, criterion_main};
use refcount_pool::{PooledEntry, RefCountable};

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

criterion_group!(benches, entrypoint);
criterion_main!(benches);

const TEST_VALUE: u64 = 1024;

fn entrypoint(c: &mut Criterion) {
    let allocs = Session::new();

    let mut group = c.benchmark_group("rcp_get_release");

    let pool = PooledEntry::<u64>::pool();

    // Warm up the pool so that every iteration below is served from recycled instances.
    pool.get().decrement_reference_count();

    let recycled_op = allocs.operation("recycled");
    group.bench_function("recycled", |b| {
        b.iter(|| {
            let _span = recycled_op.measure_process();

            let entry = pool.get();
            entry.set_value(black_box(TEST_VALUE));
            entry.decrement_reference_count();
        });
    });

    let shared_op = allocs.operation("recycled_shared");
    group.bench_function("recycled_shared", |b| {
        b.iter(|| {
            let _span = shared_op.measure_process();

            let entry = pool.get();
            for _ in 0..10 {
                entry.increment_reference_count();
            }
            for _ in 0..11 {
                entry.decrement_reference_count();
            }
        });
    });

    let fresh_op = allocs.operation("fresh_arc");
    group.bench_function("fresh_arc", |b| {
        b.iter(|| {
            let _span = fresh_op.measure_process();

            let value = Arc::new((String::new(), Some(black_box(TEST_VALUE))));
            drop(black_box(value));
        });
    });

    group.finish();

    let mut fill_group = c.benchmark_group("rcp_fill");

    fill_group.bench_function("ten_thousand", |b| {
        b.iter(|| {
            let pool = PooledEntry::<u64>::pool();
            let entries = (0..10_000)
                .map(|i| PooledEntry::new(&pool, "", i))
                .collect::<Vec<_>>();

            for entry in &entries {
                entry.decrement_reference_count();
            }

            pool
        });
    });

    fill_group.finish();

    allocs.print_to_stdout();
}
