//! Stream Acquisition Benchmarks

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use devstream::{
    AcceleratorStream, CpuQueueRuntime, FixedDeviceContext, PriorityTier, StreamPoolRegistry,
};

fn registry() -> StreamPoolRegistry {
    StreamPoolRegistry::new(Arc::new(CpuQueueRuntime::new(1)))
        .with_device_context(Arc::new(FixedDeviceContext(0)))
}

fn bench_acquire(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire");
    group.throughput(Throughput::Elements(1));

    let registry = registry();
    // Build the pools outside the measured loop.
    registry.acquire(PriorityTier::Normal, None).unwrap();

    for tier in PriorityTier::ALL {
        group.bench_function(format!("{}_priority", tier), |b| {
            b.iter(|| black_box(registry.acquire(black_box(tier), Some(0)).unwrap()));
        });
    }

    group.bench_function("by_integer_priority", |b| {
        b.iter(|| black_box(registry.acquire_with_priority(black_box(-1), None).unwrap()));
    });

    group.finish();
}

fn bench_current_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("current_stream");

    let registry = registry();
    let stream = registry.acquire(PriorityTier::High, None).unwrap();

    group.bench_function("get_default", |b| {
        b.iter(|| black_box(registry.current_stream(None).unwrap()));
    });

    group.bench_function("set_then_get", |b| {
        b.iter(|| {
            registry.set_current_stream(black_box(stream)).unwrap();
            black_box(registry.current_stream(None).unwrap())
        });
    });

    group.finish();
}

fn bench_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack3");

    let stream = registry().acquire(PriorityTier::High, None).unwrap();

    group.bench_function("pack_unpack", |b| {
        b.iter(|| {
            let data = black_box(stream).pack3();
            black_box(
                AcceleratorStream::unpack3(data.stream_id, data.device_index, data.device_type)
                    .unwrap(),
            )
        });
    });

    group.finish();
}

fn bench_cold_start(c: &mut Criterion) {
    c.bench_function("first_acquire_builds_pools", |b| {
        b.iter(|| {
            let registry = registry();
            black_box(registry.acquire(PriorityTier::Normal, None).unwrap())
        });
    });
}

criterion_group!(
    benches,
    bench_acquire,
    bench_current_stream,
    bench_pack,
    bench_cold_start
);
criterion_main!(benches);
