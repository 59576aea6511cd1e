//! ECS hot-path benchmarks: entity creation, typed queries, and listing.
//!
//! Queries scan every live entity's component-set tag, so these numbers
//! should grow linearly with the entity count.
//!
//! Run with: `cargo bench --bench ecs_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use opfor_ecs::prelude::*;

// ---------------------------------------------------------------------------
// Benchmark component types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
struct Velocity {
    dx: f32,
    dy: f32,
    dz: f32,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
struct Light(f32);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Every entity gets a Position, half get a Velocity, a tenth get a Light.
fn populated_manager(entity_count: usize) -> EntityManager {
    let mut em = EntityManager::new();
    for i in 0..entity_count {
        let e = em.create_entity_with::<(Position,)>();
        if i % 2 == 0 {
            em.insert_component(e, Velocity { dx: 1.0, dy: 0.5, dz: 0.0 })
                .unwrap();
        }
        if i % 10 == 0 {
            em.insert_component(e, Light(1.0)).unwrap();
        }
    }
    em
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_create_entities(c: &mut Criterion) {
    c.bench_function("create_1k_entities_with_two_components", |b| {
        b.iter(|| {
            let mut em = EntityManager::new();
            for _ in 0..1_000 {
                black_box(em.create_entity_with::<(Position, Velocity)>());
            }
            em
        });
    });
}

fn bench_query_mut(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_mut_position_velocity");
    for count in [1_000usize, 10_000, 50_000] {
        let mut em = populated_manager(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &_count| {
            b.iter(|| {
                for (_, (pos, vel)) in em.query_mut::<(&mut Position, &Velocity)>() {
                    pos.x += vel.dx * 0.016;
                    pos.y += vel.dy * 0.016;
                    pos.z += vel.dz * 0.016;
                }
            });
        });
    }
    group.finish();
}

fn bench_entities_with(c: &mut Criterion) {
    let em = populated_manager(10_000);
    c.bench_function("entities_with_light_10k", |b| {
        b.iter(|| black_box(em.entities_with::<(Position, Light)>().len()));
    });
}

fn bench_listing(c: &mut Criterion) {
    let em = populated_manager(10_000);
    c.bench_function("all_entities_10k", |b| {
        b.iter(|| black_box(em.all_entities().len()));
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_create_entities,
    bench_query_mut,
    bench_entities_with,
    bench_listing,
);
criterion_main!(benches);
