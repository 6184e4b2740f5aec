//! Benchmark utilities for the entity store.
//!
//! Micro benchmarks cover entity creation, chunked query iteration, parallel query jobs,
//! structural migration, tag changes, index lookups and relation updates.
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p rusty_store_bench
//!
//! # Run specific benchmark group
//! cargo bench -p rusty_store_bench -- query
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports for visualization.

pub mod components;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rusty_store::ecs::{Entity, EntityStore};

use components::{Health, Position, Team, Velocity};

/// Seed shared by all benchmarks so runs are comparable.
pub const SEED: u64 = 12345;

/// Create `count` moving entities with random positions and velocities.
pub fn populate_moving(store: &mut EntityStore, count: usize) -> Vec<Entity> {
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    (0..count)
        .map(|_| {
            let position = Position {
                x: rng.gen_range(-100.0..100.0),
                y: rng.gen_range(-100.0..100.0),
                z: rng.gen_range(-100.0..100.0),
            };
            let velocity = Velocity {
                x: rng.gen_range(-10.0..10.0),
                y: rng.gen_range(-10.0..10.0),
                z: rng.gen_range(-10.0..10.0),
            };
            store.create_entity_with((position, velocity))
        })
        .collect()
}

/// Create `count` entities spread over `teams` indexed teams.
pub fn populate_teams(store: &mut EntityStore, count: usize, teams: u32) -> Vec<Entity> {
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    (0..count)
        .map(|_| {
            let team = Team {
                id: rng.gen_range(0..teams.max(1)),
            };
            let health = Health {
                current: 100.0,
                max: 100.0,
            };
            store.create_entity_with((team, health))
        })
        .collect()
}
