//! Test fixtures and helpers.
//!
//! Pre-built maps, catalogs and matches for consistent testing.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use arena_core::behaviors::BehaviorRegistry;
use arena_core::bot::BotBrain;
use arena_core::config::SimConfig;
use arena_core::defs::{Catalogs, MapDef};
use arena_core::error::Result;
use arena_core::grid::TileKind;
use arena_core::math::Vec2Fixed;
use arena_core::simulation::{MatchSettings, Simulation};
use arena_core::state::{EntityId, Mode};
use fixed::types::I32F32;

/// Id of the map returned by [`open_map`].
pub const OPEN_MAP_ID: &str = "open";

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// World-space vector from integer pixels.
#[must_use]
pub fn vec2(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_int(x, y)
}

/// An 80×60 map of 12 px cells with only a solid border.
///
/// Spawn points sit in the four corners and the center.
#[must_use]
pub fn open_map() -> MapDef {
    let (cols, rows) = (80, 60);
    let cells: Vec<TileKind> = (0..rows)
        .flat_map(|row| {
            (0..cols).map(move |col| {
                if col == 0 || row == 0 || col == cols - 1 || row == rows - 1 {
                    TileKind::Solid
                } else {
                    TileKind::Empty
                }
            })
        })
        .collect();
    MapDef::from_cells(
        OPEN_MAP_ID,
        "Open Floor",
        cols,
        rows,
        12,
        vec![(100, 100), (860, 100), (100, 620), (860, 620), (480, 360)],
        &cells,
    )
}

/// Built-in catalogs plus [`open_map`].
#[must_use]
pub fn open_catalogs() -> Catalogs {
    let mut catalogs = Catalogs::builtin();
    catalogs.maps.push(open_map());
    catalogs
}

/// Match settings shorthand.
#[must_use]
pub fn settings(mode: Mode, map_id: &str, players: usize, seed: u32) -> MatchSettings {
    MatchSettings {
        mode,
        map_id: map_id.to_string(),
        player_count: players,
        seed,
    }
}

/// A match on [`open_map`] with default balance.
///
/// # Errors
///
/// Propagates match construction errors.
pub fn open_match(mode: Mode, players: usize, seed: u32) -> Result<Simulation> {
    open_match_with(mode, players, seed, SimConfig::default())
}

/// A match on [`open_map`] with custom balance.
///
/// # Errors
///
/// Propagates match construction errors.
pub fn open_match_with(
    mode: Mode,
    players: usize,
    seed: u32,
    config: SimConfig,
) -> Result<Simulation> {
    Simulation::new(
        settings(mode, OPEN_MAP_ID, players, seed),
        open_catalogs(),
        &BehaviorRegistry::builtin(),
        config,
    )
}

/// Move the player in `slot` to a pixel position and stop it.
///
/// # Panics
///
/// Panics if the slot does not exist.
pub fn place_player(sim: &mut Simulation, slot: usize, x: i32, y: i32) {
    let player = &mut sim.state_mut().players[slot];
    player.pos = vec2(x, y);
    player.vel = Vec2Fixed::ZERO;
}

/// Spawn an enemy that is already past its telegraph.
///
/// # Panics
///
/// Panics on an unknown enemy id or a full pool.
pub fn place_enemy(sim: &mut Simulation, kind: &str, x: i32, y: i32) -> EntityId {
    sim.spawn_enemy(kind, vec2(x, y), true)
        .expect("known enemy type")
        .expect("free enemy slot")
}

/// A simulation driven entirely by bots.
#[derive(Debug, Clone)]
pub struct BotMatch {
    /// The match.
    pub sim: Simulation,
    /// Bots for every slot.
    pub bots: BotBrain,
    /// Running hash of every event drained so far, in emission order.
    pub event_digest: u64,
}

impl BotMatch {
    /// Wrap a simulation; bots are seeded from the match seed.
    #[must_use]
    pub fn new(sim: Simulation) -> Self {
        let bots = BotBrain::new(sim.state().match_state.rng_seed);
        Self {
            sim,
            bots,
            event_digest: 0,
        }
    }

    /// Start a bot match with the built-in catalogs.
    ///
    /// # Errors
    ///
    /// Propagates match construction errors.
    pub fn start(settings: MatchSettings) -> Result<Self> {
        Simulation::with_defaults(settings).map(Self::new)
    }

    /// Poll every bot and run one tick. Returns the number of events drained.
    pub fn step(&mut self) -> usize {
        let intents = self.bots.intents(self.sim.state());
        self.sim.tick(&intents);
        let events = self.sim.drain_events();
        let mut hasher = DefaultHasher::new();
        self.event_digest.hash(&mut hasher);
        events.hash(&mut hasher);
        self.event_digest = hasher.finish();
        events.len()
    }

    /// Run `ticks` ticks, stopping early at game over.
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            if self.sim.is_game_over() {
                break;
            }
            self.step();
        }
    }

    /// Hash of the simulation state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.sim.state_hash()
    }

    /// State hash paired with the event digest. Two runs agree only if both
    /// their states and their event sequences match.
    #[must_use]
    pub fn fingerprint(&self) -> (u64, u64) {
        (self.state_hash(), self.event_digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_map_is_valid() {
        let map = open_map();
        assert!(map.validate().is_empty());
        assert!(open_catalogs().validate().is_empty());
    }

    #[test]
    fn test_open_match_starts() {
        let sim = open_match(Mode::Pvp, 2, 1).unwrap();
        assert_eq!(sim.state().match_state.map_id, OPEN_MAP_ID);
        assert_eq!(sim.state().players[1].pos, vec2(860, 100));
    }

    #[test]
    fn test_bot_match_runs() {
        let mut game = BotMatch::start(settings(Mode::Coop, "arena", 2, 9)).unwrap();
        game.run(120);
        assert_eq!(game.sim.current_tick(), 120);
    }

    #[test]
    fn test_event_digest_follows_drained_events() {
        let start = || BotMatch::start(settings(Mode::Pvp, "arena", 2, 31)).unwrap();
        let mut a = start();
        let mut b = start();
        let mut drained = 0;
        for _ in 0..240 {
            drained += a.step();
            b.step();
        }
        assert!(drained > 0);
        assert_ne!(a.event_digest, 0);
        assert_eq!(a.fingerprint(), b.fingerprint());

        // An event the bots never saw leaves the states equal but the digests apart.
        a.sim.add_player().unwrap();
        b.sim.add_player().unwrap();
        b.sim.drain_events();
        a.step();
        b.step();
        assert_eq!(a.state_hash(), b.state_hash());
        assert_ne!(a.event_digest, b.event_digest);
    }
}
