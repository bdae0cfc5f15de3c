//! Simulation systems.
//!
//! Each system is one pass of the tick pipeline. They run in a fixed order
//! (see [`crate::simulation::Simulation::tick`]) and every pool loop walks
//! its slots by index, so the same inputs always mutate state the same way.
//!
//! Systems are free functions over the parts of [`crate::state::GameState`]
//! they touch. They never allocate on the hot path except when emitting
//! events.

pub mod bullets;
pub mod collisions;
pub mod enemies;
pub mod intents;
pub mod lives;
pub mod mode_rules;
pub mod movement;
pub mod shooting;
pub mod spawns;
pub mod trail;

pub use bullets::bullet_system;
pub use collisions::collision_system;
pub use enemies::enemy_system;
pub use intents::apply_intents;
pub use lives::{lives_system, respawn_player};
pub use mode_rules::mode_rules_system;
pub use movement::movement_system;
pub use shooting::shooting_system;
pub use spawns::{init_enemy, spawn_interval, spawn_system};
pub use trail::{trail_system, TrailRing};
