//! # Spatial Index Benchmark
//!
//! Measures the per-tick hot paths of a grid simulation:
//! - Moving entities between cells (two top re-resolutions per move)
//! - Top and filtered-top queries on stacked cells
//! - Capturing an occupancy snapshot
//!
//! Run with: `cargo bench --package tessera_core --bench spatial_benchmark`

#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera_core::{Component, Entity, OccupancySnapshot, Snapshot, World, ZIndex};

const GRID: i32 = 64;

#[derive(Clone)]
struct Nugget;
impl Component for Nugget {}

#[derive(Clone)]
struct Character;
impl Component for Character {}

fn populated_world(count: usize) -> (World, Vec<Entity>) {
    let mut world = World::new();
    world.set_z_index(
        ZIndex::builder()
            .layer::<Nugget>(500)
            .layer::<Character>(100)
            .interactable::<Nugget>()
            .build(),
    );

    let mut entities = Vec::with_capacity(count);
    for i in 0..count {
        let e = world.create_entity();
        if i % 3 == 0 {
            world.insert(e, Nugget);
        } else {
            world.insert(e, Character);
        }
        let i = i32::try_from(i).unwrap_or(i32::MAX);
        world.set_position(e, i % GRID, (i / GRID) % GRID);
        entities.push(e);
    }
    (world, entities)
}

fn bench_move(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_move");

    for count in [1_000, 10_000, 50_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let (mut world, entities) = populated_world(count);
            let mut step = 0;
            b.iter(|| {
                step += 1;
                for (i, e) in entities.iter().enumerate().step_by(7) {
                    let i = i32::try_from(i).unwrap_or(0);
                    world.set_position(*e, (i + step) % GRID, i % GRID);
                }
            });
        });
    }

    group.finish();
}

fn bench_top_queries(c: &mut Criterion) {
    let (world, _) = populated_world(50_000);

    c.bench_function("top_entity_at_full_grid", |b| {
        b.iter(|| {
            for y in 0..GRID {
                for x in 0..GRID {
                    black_box(world.top_entity_at(x, y));
                }
            }
        });
    });

    c.bench_function("top_entity_at_filtered_full_grid", |b| {
        b.iter(|| {
            for y in 0..GRID {
                for x in 0..GRID {
                    black_box(world.top_entity_at_filtered(x, y, |w, e| w.is_interactable(e)));
                }
            }
        });
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let (world, _) = populated_world(50_000);

    c.bench_function("occupancy_snapshot_capture", |b| {
        b.iter(|| black_box(OccupancySnapshot::capture(&world)));
    });
}

criterion_group!(benches, bench_move, bench_top_queries, bench_snapshot);
criterion_main!(benches);
