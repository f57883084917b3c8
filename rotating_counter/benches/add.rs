//! Benchmarks for adding to a rotating counter.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rotating_counter::Counter;
use std::time::Duration;

const RESOLUTION: Duration = Duration::from_millis(100);

fn add(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()
        .expect("failed to build runtime");

    let mut group = c.benchmark_group("add");
    group.throughput(Throughput::Elements(1));
    // Zero is blocking mode, the rest set the intake queue depth.
    for buffer_size in [0_u8, 1, 10, 255] {
        let counter = rt
            .block_on(async { Counter::new(100 * RESOLUTION, RESOLUTION, buffer_size) })
            .expect("failed to create counter");
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_size),
            &counter,
            |b, counter| {
                b.to_async(&rt).iter(|| counter.add(1));
            },
        );
        rt.block_on(counter.stop());
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = add
);
criterion_main!(benches);
