//! # Event Router Benchmark
//!
//! Publish cost under each overflow policy, subscriber fan-out, and the
//! drain cost the simulation thread pays once per tick.
//!
//! Run with: `cargo bench --package tessera_core --bench event_router_benchmark`

#![allow(missing_docs)]

use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tessera_core::{ChannelConfig, EventRouter, OverflowPolicy};

#[derive(Clone, Copy)]
struct KeyPress(u32);

const BATCH: u32 = 10_000;

fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");
    group.throughput(Throughput::Elements(u64::from(BATCH)));

    for policy in [
        OverflowPolicy::DropOldest,
        OverflowPolicy::DropNewest,
        OverflowPolicy::Unbounded,
    ] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{policy:?}")),
            &policy,
            |b, &policy| {
                let router = EventRouter::new(ChannelConfig {
                    capacity: 1024,
                    policy,
                });
                let publisher = router.publisher::<KeyPress>();
                b.iter(|| {
                    for i in 0..BATCH {
                        publisher.publish(KeyPress(i));
                    }
                    black_box(router.drain::<KeyPress>().len())
                });
            },
        );
    }

    group.finish();
}

fn bench_contended_publish(c: &mut Criterion) {
    c.bench_function("publish_4_threads_drop_oldest", |b| {
        let router = Arc::new(EventRouter::new(ChannelConfig::drop_oldest(4096)));
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let publisher = router.publisher::<KeyPress>();
                    thread::spawn(move || {
                        for i in 0..BATCH / 4 {
                            publisher.publish(KeyPress(i));
                        }
                    })
                })
                .collect();
            for handle in handles {
                let _ = handle.join();
            }
            black_box(router.drain::<KeyPress>().len())
        });
    });
}

fn bench_dispatch(c: &mut Criterion) {
    c.bench_function("fan_out_two_subscribers", |b| {
        let router = EventRouter::new(ChannelConfig::drop_oldest(BATCH as usize));
        let first = router.subscribe::<KeyPress>();
        let second = router.subscribe::<KeyPress>();
        b.iter(|| {
            for i in 0..1_000 {
                router.publish(KeyPress(i));
            }
            router.dispatch();
            black_box(router.drain::<KeyPress>().len() + first.drain().len() + second.drain().len())
        });
    });
}

criterion_group!(benches, bench_publish, bench_contended_publish, bench_dispatch);
criterion_main!(benches);
