//! Simulation benchmarks for arena_core.
//!
//! Run with: `cargo bench -p arena_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use arena_core::prelude::*;
use arena_core::pathfinding::PathScratch;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn settings(mode: Mode, players: usize, map: &str) -> MatchSettings {
    MatchSettings {
        mode,
        map_id: map.to_string(),
        player_count: players,
        seed: 1234,
    }
}

/// A co-op match already crowded with enemies.
fn warmed_up_match() -> (Simulation, BotBrain) {
    let mut sim = Simulation::with_defaults(settings(Mode::Coop, 4, "labyrinth"))
        .expect("built-in match");
    let mut bots = BotBrain::new(1234);
    for _ in 0..3600 {
        let intents = bots.intents(sim.state());
        sim.tick(&intents);
        sim.drain_events();
    }
    (sim, bots)
}

pub fn tick_benchmark(c: &mut Criterion) {
    let (sim, bots) = warmed_up_match();

    c.bench_function("coop_tick_with_bots", |b| {
        b.iter_batched(
            || (sim.clone(), bots.clone()),
            |(mut sim, mut bots)| {
                for _ in 0..60 {
                    let intents = bots.intents(sim.state());
                    sim.tick(black_box(&intents));
                    sim.drain_events();
                }
                sim.state_hash()
            },
            criterion::BatchSize::LargeInput,
        );
    });

    c.bench_function("state_hash", |b| b.iter(|| black_box(sim.state_hash())));
    c.bench_function("snapshot", |b| b.iter(|| black_box(sim.snapshot())));
}

pub fn spatial_benchmark(c: &mut Criterion) {
    let catalogs = Catalogs::builtin();
    let map = catalogs.map("labyrinth").expect("built-in map");
    let grid = map.build_grid(2).expect("valid layout");
    let spawns = map.spawn_positions();
    let (start, goal) = (spawns[0], spawns[spawns.len() - 1]);
    let mut scratch = PathScratch::new();

    c.bench_function("find_path_labyrinth", |b| {
        b.iter(|| black_box(scratch.find_path(&grid, black_box(start), black_box(goal))));
    });
    c.bench_function("line_of_sight", |b| {
        b.iter(|| black_box(grid.has_line_of_sight(black_box(start), black_box(goal))));
    });
}

criterion_group!(benches, tick_benchmark, spatial_benchmark);
criterion_main!(benches);
