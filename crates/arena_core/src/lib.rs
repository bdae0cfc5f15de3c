//! # Arena Core
//!
//! Deterministic simulation core for a multiplayer arena shooter.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO (apart from replay files)
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Authoritative servers and headless bot matches
//! - Replay systems
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`math`] - Fixed-point math utilities
//! - [`rng`] - Seeded random stream
//! - [`events`] - Gameplay events and the event bus
//! - [`grid`] - Tile grid, collision resolution and line of sight
//! - [`pathfinding`] - A* over the tile grid
//! - [`defs`] - Weapon, enemy and map catalogs
//! - [`config`] - Balance constants
//! - [`state`] - Authoritative game state
//! - [`behaviors`] - Enemy behavior registry
//! - [`systems`] - Simulation systems
//! - [`simulation`] - Core simulation loop
//! - [`bot`] - Steering AI for bot players
//! - [`timestep`] - Fixed-timestep driver
//! - [`replay`] - Match recording and playback

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod behaviors;
pub mod bot;
pub mod config;
pub mod defs;
pub mod error;
pub mod events;
pub mod grid;
pub mod math;
pub mod pathfinding;
pub mod replay;
pub mod rng;
pub mod simulation;
pub mod state;
pub mod systems;
pub mod timestep;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::behaviors::{BehaviorFn, BehaviorRegistry};
    pub use crate::bot::{BotBrain, BotMemory, BotTuning};
    pub use crate::config::SimConfig;
    pub use crate::defs::{Catalogs, EnemyDef, MapDef, WeaponDef};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{EventBus, GameEvent};
    pub use crate::grid::{Tile, TileGrid, TileKind};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::replay::{Replay, ReplayPlayer};
    pub use crate::rng::SeededRng;
    pub use crate::simulation::{MatchSettings, Simulation};
    pub use crate::state::{EntityId, GameState, Mode, PlayerIntent};
    pub use crate::timestep::FixedTimestep;
}
