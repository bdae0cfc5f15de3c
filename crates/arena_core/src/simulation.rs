//! Core simulation loop.
//!
//! The simulation runs at a fixed tick rate and processes all game logic
//! deterministically. [`Simulation`] owns the authoritative [`GameState`],
//! the catalogs and config it was built with, the RNG stream, the event
//! bus and per-match scratch state, so independent matches never share
//! anything.
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`](crate::math::Fixed))
//! - No system randomness (one seeded RNG stream, restored from state)
//! - Every pool is scanned in index order
//! - Same seed and intents always produce the same state and events
//!
//! # Example
//!
//! ```
//! use arena_core::simulation::{MatchSettings, Simulation};
//! use arena_core::state::{Mode, PlayerIntent};
//!
//! let mut sim = Simulation::with_defaults(MatchSettings {
//!     mode: Mode::Coop,
//!     map_id: "arena".to_string(),
//!     player_count: 2,
//!     seed: 42,
//! })
//! .unwrap();
//!
//! sim.tick(&[PlayerIntent::NEUTRAL, PlayerIntent::NEUTRAL]);
//! assert_eq!(sim.state().match_state.tick, 1);
//! let _events = sim.drain_events();
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::behaviors::{BehaviorFn, BehaviorRegistry};
use crate::config::SimConfig;
use crate::defs::Catalogs;
use crate::error::{GameError, Result};
use crate::events::{EventBus, GameEvent};
use crate::math::Vec2Fixed;
use crate::rng::SeededRng;
use crate::state::{EntityId, GameState, Mode, PlayerIntent};
use crate::systems::{
    apply_intents, bullet_system, collision_system, enemy_system, init_enemy, lives_system,
    mode_rules_system, movement_system, shooting_system, spawn_system, trail_system, TrailRing,
};

/// How a match starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSettings {
    /// Rules.
    pub mode: Mode,
    /// Map id in the catalog.
    pub map_id: String,
    /// Players present at tick 0.
    pub player_count: usize,
    /// RNG seed.
    pub seed: u32,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            mode: Mode::Coop,
            map_id: "arena".to_string(),
            player_count: 1,
            seed: 0,
        }
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    state: &'a GameState,
    trails: &'a [TrailRing],
    config: &'a SimConfig,
}

#[derive(Deserialize)]
struct Snapshot {
    state: GameState,
    trails: Vec<TrailRing>,
    config: SimConfig,
}

/// The core game simulation.
///
/// # System Execution Order
///
/// Each tick, systems run in this order:
/// 1. **Intents** - Sticks to velocity and aim
/// 2. **Movement** - Integrate players, resolve walls, clamp to the arena
/// 3. **Shooting** - Cooldowns and weapon fire
/// 4. **Bullets** - Integrate and expire
/// 5. **Collisions** - Bullet hits, pierce, knockback, contact damage
/// 6. **Enemies** - Telegraphs, behaviors, separation
/// 7. **Trail** - Generative cover
/// 8. **Spawns** - Co-op spawn director
/// 9. **Lives** - Downed, revive, bleed-out, respawn, invulnerability
/// 10. **Mode rules** - Game over
#[derive(Debug, Clone)]
pub struct Simulation {
    state: GameState,
    catalogs: Catalogs,
    behaviors: Vec<BehaviorFn>,
    config: SimConfig,
    rng: SeededRng,
    events: EventBus,
    trails: Vec<TrailRing>,
}

impl Simulation {
    /// Build a match.
    ///
    /// # Errors
    ///
    /// Fails on invalid catalogs or config, an unknown map, default weapon
    /// or behavior key, or more players than `config.max_players`.
    pub fn new(
        settings: MatchSettings,
        catalogs: Catalogs,
        registry: &BehaviorRegistry,
        config: SimConfig,
    ) -> Result<Self> {
        catalogs.check()?;
        check_config(&config)?;
        let behaviors = registry.resolve_all(&catalogs.enemies)?;
        let weapon = catalogs.weapon_index(&config.default_weapon)?;
        let map = catalogs.map(&settings.map_id)?;
        let state = GameState::new(
            settings.mode,
            map,
            settings.player_count,
            settings.seed,
            weapon,
            &config,
        )?;

        tracing::info!(
            mode = ?settings.mode,
            map = %settings.map_id,
            players = settings.player_count,
            seed = settings.seed,
            "Match created"
        );

        Ok(Self {
            trails: vec![TrailRing::default(); state.enemies.len()],
            state,
            catalogs,
            behaviors,
            config,
            rng: SeededRng::new(settings.seed),
            events: EventBus::new(),
        })
    }

    /// Build a match with the built-in catalogs, behaviors and config.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn with_defaults(settings: MatchSettings) -> Result<Self> {
        Self::new(
            settings,
            Catalogs::builtin(),
            &BehaviorRegistry::builtin(),
            SimConfig::default(),
        )
    }

    /// Authoritative state.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable state, for tools and test setups.
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Config the match runs with.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Catalogs the match runs with.
    #[must_use]
    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    /// Ticks simulated so far.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.state.match_state.tick
    }

    /// True once the match has ended.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.state.match_state.game_over
    }

    /// Advance the simulation by one tick.
    ///
    /// `intents[slot]` drives the player in `slot`; missing entries are
    /// neutral. Does nothing once the match is over.
    pub fn tick(&mut self, intents: &[PlayerIntent]) {
        if self.state.match_state.game_over {
            return;
        }
        let dt = self.config.dt();

        apply_intents(&mut self.state.players, intents, &self.config);
        movement_system(&mut self.state.players, &self.state.tiles, &self.config);
        shooting_system(
            &mut self.state.players,
            intents,
            &mut self.state.bullets,
            &mut self.state.match_state.next_entity_id,
            &self.catalogs.weapons,
            &mut self.events,
        );
        bullet_system(&mut self.state.bullets, dt);
        collision_system(&mut self.state, &self.config, &mut self.events);
        enemy_system(
            &mut self.state,
            &self.catalogs.enemies,
            &self.behaviors,
            dt,
            &mut self.events,
        );
        trail_system(
            &mut self.state,
            &self.catalogs.enemies,
            &mut self.trails,
            &mut self.events,
        );
        spawn_system(
            &mut self.state,
            &self.catalogs.enemies,
            &self.config,
            &mut self.rng,
            &mut self.events,
        );
        lives_system(&mut self.state, intents, &self.config, &mut self.events);
        mode_rules_system(&mut self.state, &self.config);

        self.state.match_state.rng_state = self.rng.state();
        self.state.match_state.tick += 1;

        #[cfg(feature = "debug-validation")]
        for violation in self.state.invariant_violations() {
            tracing::error!(tick = self.state.match_state.tick, %violation, "State invariant broken");
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(
                tick = self.state.match_state.tick,
                state_hash = hash,
                "Simulation state hash"
            );
        }
    }

    /// Take every event emitted since the last drain, in emission order.
    pub fn drain_events(&mut self) -> &[GameEvent] {
        self.events.drain()
    }

    /// Add a player to a running match at the next slot.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::LobbyFull`] when every slot is taken.
    pub fn add_player(&mut self) -> Result<EntityId> {
        let weapon = self.catalogs.weapon_index(&self.config.default_weapon)?;
        let player = self.state.add_player(weapon, &self.config)?;
        let (player_id, slot, pos) = (player.id, player.slot, player.pos);
        self.events.emit(GameEvent::PlayerJoined {
            player_id,
            slot,
            pos,
        });
        tracing::info!(player = player_id, slot, "Player joined");
        Ok(player_id)
    }

    /// Equip a catalog weapon on the player in `slot`.
    ///
    /// # Errors
    ///
    /// Fails on an unknown weapon id or slot.
    pub fn equip_weapon(&mut self, slot: usize, weapon_id: &str) -> Result<()> {
        let weapon = self.catalogs.weapon_index(weapon_id)?;
        self.state.player_mut(slot)?.weapon = weapon;
        Ok(())
    }

    /// Place an enemy directly, outside the spawn director.
    ///
    /// Returns `Ok(None)` when the enemy pool is full.
    ///
    /// # Errors
    ///
    /// Fails on an unknown enemy id.
    pub fn spawn_enemy(
        &mut self,
        kind_id: &str,
        pos: Vec2Fixed,
        skip_telegraph: bool,
    ) -> Result<Option<EntityId>> {
        let kind = self.catalogs.enemy_index(kind_id)?;
        let Some(slot) = self.state.enemies.iter().position(|e| !e.active) else {
            return Ok(None);
        };
        let id = self.state.next_id()?;
        let telegraph = if skip_telegraph {
            0
        } else {
            self.config.spawn_telegraph_ticks
        };
        init_enemy(
            &mut self.state.enemies[slot],
            id,
            kind,
            &self.catalogs.enemies[kind],
            pos,
            telegraph,
        );
        self.trails[slot].clear();
        self.events.emit(GameEvent::EnemySpawned { enemy_id: id, pos });
        Ok(Some(id))
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Two simulations with identical state (including trail rings) produce
    /// identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.state.hash(&mut hasher);
        self.trails.hash(&mut hasher);
        hasher.finish()
    }

    /// Serialize state, trail rings and config.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let snapshot = SnapshotRef {
            state: &self.state,
            trails: &self.trails,
            config: &self.config,
        };
        bincode::serialize(&snapshot)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize simulation: {e}")))
    }

    /// Resume a match from [`Self::snapshot`] bytes. Pending events are not
    /// part of a snapshot.
    ///
    /// # Errors
    ///
    /// Fails if the bytes do not decode, the stored config is out of range,
    /// the catalogs are invalid, or a behavior key is unknown.
    pub fn restore(bytes: &[u8], catalogs: Catalogs, registry: &BehaviorRegistry) -> Result<Self> {
        let snapshot: Snapshot = bincode::deserialize(bytes).map_err(|e| {
            GameError::InvalidState(format!("Failed to deserialize simulation: {e}"))
        })?;
        if snapshot.trails.len() != snapshot.state.enemies.len() {
            return Err(GameError::InvalidState(format!(
                "Snapshot has {} trail rings for {} enemy slots",
                snapshot.trails.len(),
                snapshot.state.enemies.len()
            )));
        }
        check_config(&snapshot.config)?;
        catalogs.check()?;
        let behaviors = registry.resolve_all(&catalogs.enemies)?;

        Ok(Self {
            rng: SeededRng::from_state(snapshot.state.match_state.rng_state),
            state: snapshot.state,
            catalogs,
            behaviors,
            config: snapshot.config,
            events: EventBus::new(),
            trails: snapshot.trails,
        })
    }
}

fn check_config(config: &SimConfig) -> Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(GameError::InvalidState(format!(
            "Invalid config: {}",
            errors.join("; ")
        )))
    }
}
