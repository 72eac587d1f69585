use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use dorsal::{Allocator, AllocatorConfig, Backoff, MemoryStore, TokioYield};
use futures::future::try_join_all;
use std::sync::Arc;
use tokio::runtime::Builder;

// Number of values allocated per benchmark iteration.
const TOTAL_ALLOCATIONS: usize = 1024;
const TASKS: usize = 8;

fn config() -> AllocatorConfig {
    AllocatorConfig::default()
        .with_max_attempts(u32::MAX)
        .with_backoff(Backoff::none())
}

/// Sequential allocations on one partition: the uncontended hot path.
fn bench_sequential(c: &mut Criterion) {
    let rt = Builder::new_current_thread().enable_all().build().unwrap();
    let mut group = c.benchmark_group("memory/sequential");
    group.throughput(Throughput::Elements(TOTAL_ALLOCATIONS as u64));

    group.bench_function(format!("elems/{TOTAL_ALLOCATIONS}"), |b| {
        b.to_async(&rt).iter(|| async {
            let allocator: Allocator<_, TokioYield> = Allocator::new(MemoryStore::new(), config());
            for _ in 0..TOTAL_ALLOCATIONS {
                black_box(allocator.allocate("event-42").await.unwrap());
            }
        });
    });
    group.finish();
}

/// Many tasks hammering either one shared partition or one partition each.
fn bench_contended(c: &mut Criterion) {
    let rt = Builder::new_multi_thread()
        .worker_threads(TASKS)
        .enable_all()
        .build()
        .unwrap();
    let mut group = c.benchmark_group("memory/concurrent");
    group.throughput(Throughput::Elements(TOTAL_ALLOCATIONS as u64));

    for (name, shared) in [("one_partition", true), ("partition_per_task", false)] {
        group.bench_function(format!("{name}/tasks/{TASKS}"), |b| {
            b.to_async(&rt).iter(|| async move {
                let allocator: Arc<Allocator<_, TokioYield>> =
                    Arc::new(Allocator::new(MemoryStore::new(), config()));
                let tasks: Vec<_> = (0..TASKS)
                    .map(|task| {
                        let allocator = Arc::clone(&allocator);
                        let partition = if shared {
                            String::from("event-42")
                        } else {
                            format!("event-{task}")
                        };
                        tokio::spawn(async move {
                            for _ in 0..TOTAL_ALLOCATIONS / TASKS {
                                black_box(allocator.allocate(&partition).await?);
                            }
                            Ok::<_, dorsal::Error>(())
                        })
                    })
                    .collect();
                try_join_all(tasks).await.unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sequential, bench_contended);
criterion_main!(benches);
