//! Authoritative match state.
//!
//! [`GameState`] is plain data: systems mutate it in place, the
//! simulation hashes and snapshots it, and collaborators read it. Bullets
//! and enemies live in fixed-capacity pools scanned in index order.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::defs::MapDef;
use crate::error::{GameError, Result};
use crate::grid::TileGrid;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Unique, monotonically assigned entity identifier. Never reused.
pub type EntityId = u32;

/// Match rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Players against enemy waves with shared lives.
    #[default]
    Coop,
    /// Timed free-for-all between players.
    Pvp,
}

/// One player slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerState {
    /// Entity id.
    pub id: EntityId,
    /// Lobby slot (index into `GameState::players`).
    pub slot: usize,
    /// Position.
    pub pos: Vec2Fixed,
    /// Velocity in px/s.
    pub vel: Vec2Fixed,
    /// Unit aim direction.
    pub aim: Vec2Fixed,
    /// Hit points.
    pub hp: i32,
    /// Alive and fighting.
    pub alive: bool,
    /// Co-op downed state.
    pub downed: bool,
    /// Ticks left before a downed player bleeds out.
    pub downed_timer: i32,
    /// Ticks of revive accumulated.
    pub revive_progress: i32,
    /// Teammate currently reviving this player.
    pub reviver_id: Option<EntityId>,
    /// Ticks until a PvP respawn.
    pub respawn_timer: i32,
    /// Ticks of invulnerability left (no damage taken or dealt).
    pub invuln_timer: i32,
    /// Ticks until the weapon may fire again.
    pub fire_cooldown: i32,
    /// Equipped weapon (index into the weapon catalog).
    pub weapon: usize,
    /// PvP kills.
    pub kills: u32,
    /// PvP deaths.
    pub deaths: u32,
    /// Team number.
    pub team: u32,
}

impl PlayerState {
    /// A fresh player at `spawn_points[slot % len]`.
    #[must_use]
    pub fn new(id: EntityId, slot: usize, spawn: Vec2Fixed, hp: i32, weapon: usize) -> Self {
        Self {
            id,
            slot,
            pos: spawn,
            vel: Vec2Fixed::ZERO,
            aim: Vec2Fixed::UNIT_X,
            hp,
            alive: true,
            downed: false,
            downed_timer: 0,
            revive_progress: 0,
            reviver_id: None,
            respawn_timer: 0,
            invuln_timer: 0,
            fire_cooldown: 0,
            weapon,
            kills: 0,
            deaths: 0,
            team: 0,
        }
    }

    /// Alive or downed: still occupies the arena.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.alive || self.downed
    }
}

/// One bullet pool slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BulletState {
    /// Entity id (0 while the slot was never used).
    pub id: EntityId,
    /// Player or enemy that fired it.
    pub owner_id: EntityId,
    /// Position.
    pub pos: Vec2Fixed,
    /// Velocity in px/s.
    pub vel: Vec2Fixed,
    /// Ticks left.
    pub ttl: i32,
    /// Damage on hit.
    pub damage: i32,
    /// Slot in use.
    pub active: bool,
    /// Fired by an enemy.
    pub from_enemy: bool,
    /// Presentation key of the weapon that fired it.
    pub weapon_id: String,
    /// Bodies left to pass through.
    pub pierce_remaining: i32,
    /// Last body pierced; never hit again by this bullet.
    pub last_pierced_id: Option<EntityId>,
}

/// One enemy pool slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EnemyState {
    /// Entity id (0 while the slot was never used).
    pub id: EntityId,
    /// Enemy type (index into the enemy catalog).
    pub kind: usize,
    /// Position.
    pub pos: Vec2Fixed,
    /// Velocity in px/s.
    pub vel: Vec2Fixed,
    /// Hit points.
    pub hp: i32,
    /// Slot in use.
    pub active: bool,
    /// Telegraph ticks left (0 = fully spawned).
    pub spawn_timer: i32,
    /// Ticks until the ranged attack may fire.
    pub fire_cooldown: i32,
    /// Knockback per bullet hit, copied from the definition.
    #[serde(with = "fixed_serde")]
    pub knockback: Fixed,
    /// Score on kill, copied from the definition.
    pub score: i32,
    /// Contact damage, copied from the definition.
    pub contact_damage: i32,
    /// Collider radius, copied from the definition.
    #[serde(with = "fixed_serde")]
    pub collider_radius: Fixed,
    /// Move speed, copied from the definition.
    #[serde(with = "fixed_serde")]
    pub move_speed: Fixed,
    /// Emitter angle for spinning attacks, radians in `[0, 2π)`.
    #[serde(with = "fixed_serde")]
    pub spin_angle: Fixed,
    /// Ticks until the trail ability may place another tile.
    pub trail_cooldown: i32,
    /// Cell occupied on the previous trail update.
    pub trail_last_cell: Option<(i32, i32)>,
}

impl EnemyState {
    /// Active and past its telegraph window.
    #[must_use]
    pub const fn is_engaged(&self) -> bool {
        self.active && self.spawn_timer <= 0
    }
}

/// Match-wide record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchState {
    /// Rules in effect.
    pub mode: Mode,
    /// Ticks simulated so far.
    pub tick: u64,
    /// Co-op score.
    pub score: i64,
    /// Co-op shared lives left.
    pub shared_lives: i32,
    /// Seed the match started from.
    pub rng_seed: u32,
    /// RNG state after the last completed tick.
    pub rng_state: u32,
    /// Next id to hand out.
    pub next_entity_id: EntityId,
    /// Map the match is played on.
    pub map_id: String,
    /// Terminal flag; once set the simulation stops advancing.
    pub game_over: bool,
    /// Enemies spawned by the director.
    pub spawn_count: u64,
}

/// Per-slot input for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlayerIntent {
    /// Desired movement; magnitudes above 1 are normalized.
    pub move_dir: Vec2Fixed,
    /// Desired aim; ignored when nearly zero.
    pub aim: Vec2Fixed,
    /// Fire held.
    pub shoot: bool,
    /// Revive held.
    pub revive: bool,
}

impl PlayerIntent {
    /// No movement, aim along +X, no buttons.
    pub const NEUTRAL: Self = Self {
        move_dir: Vec2Fixed::ZERO,
        aim: Vec2Fixed::UNIT_X,
        shoot: false,
        revive: false,
    };
}

/// Hand out the next entity id, or `None` once the id space is used up.
/// Ids are never reused.
pub fn allocate_id(next_entity_id: &mut EntityId) -> Option<EntityId> {
    let id = *next_entity_id;
    let Some(next) = id.checked_add(1) else {
        tracing::warn!(id, "Entity ids exhausted");
        return None;
    };
    *next_entity_id = next;
    Some(id)
}

fn ids_exhausted() -> GameError {
    GameError::InvalidState("Entity ids exhausted".to_string())
}

/// Parameters for [`spawn_bullet`].
#[derive(Debug, Clone, Copy)]
pub struct BulletSpawn<'a> {
    /// Player or enemy firing.
    pub owner_id: EntityId,
    /// Muzzle position.
    pub pos: Vec2Fixed,
    /// Unit direction of travel.
    pub dir: Vec2Fixed,
    /// Speed in px/s.
    pub speed: Fixed,
    /// Lifetime in ticks.
    pub ttl: i32,
    /// Damage on hit.
    pub damage: i32,
    /// Fired by an enemy.
    pub from_enemy: bool,
    /// Presentation key.
    pub weapon_id: &'a str,
    /// Bodies the bullet may pass through.
    pub pierce: i32,
}

/// Activate the first free bullet slot. Returns the new bullet's id, or
/// `None` when the pool is exhausted.
pub fn spawn_bullet(
    bullets: &mut [BulletState],
    next_entity_id: &mut EntityId,
    spawn: &BulletSpawn<'_>,
) -> Option<EntityId> {
    let Some(bullet) = bullets.iter_mut().find(|b| !b.active) else {
        tracing::trace!(owner = spawn.owner_id, "Bullet pool exhausted");
        return None;
    };
    let id = allocate_id(next_entity_id)?;
    bullet.id = id;
    bullet.owner_id = spawn.owner_id;
    bullet.pos = spawn.pos;
    bullet.vel = spawn.dir.scale(spawn.speed);
    bullet.ttl = spawn.ttl;
    bullet.damage = spawn.damage;
    bullet.active = true;
    bullet.from_enemy = spawn.from_enemy;
    bullet.weapon_id.clear();
    bullet.weapon_id.push_str(spawn.weapon_id);
    bullet.pierce_remaining = spawn.pierce;
    bullet.last_pierced_id = None;
    Some(id)
}

/// The full authoritative state of a match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameState {
    /// Players by slot. Append-only.
    pub players: Vec<PlayerState>,
    /// Bullet pool.
    pub bullets: Vec<BulletState>,
    /// Enemy pool.
    pub enemies: Vec<EnemyState>,
    /// Terrain.
    pub tiles: TileGrid,
    /// Player spawn points from the map.
    pub spawn_points: Vec<Vec2Fixed>,
    /// Match record.
    pub match_state: MatchState,
}

impl GameState {
    /// Build the initial state of a match.
    ///
    /// Players take slots `0..player_count` at `spawn_points[slot % len]`;
    /// ids start at 1. Co-op starts with `shared_lives_base + (n - 1)` lives.
    pub fn new(
        mode: Mode,
        map: &MapDef,
        player_count: usize,
        seed: u32,
        weapon: usize,
        config: &SimConfig,
    ) -> Result<Self> {
        if player_count > config.max_players {
            return Err(GameError::LobbyFull {
                max: config.max_players,
            });
        }
        let tiles = map.build_grid(config.breakable_tile_hp)?;
        let spawn_points = map.spawn_positions();
        if spawn_points.is_empty() {
            return Err(GameError::InvalidCatalog(format!(
                "Map '{}' has no spawn points",
                map.id
            )));
        }

        let mut next_entity_id: EntityId = 1;
        let players = (0..player_count)
            .map(|slot| -> Result<PlayerState> {
                let spawn = spawn_points[slot % spawn_points.len()];
                let id = allocate_id(&mut next_entity_id).ok_or_else(ids_exhausted)?;
                Ok(PlayerState::new(id, slot, spawn, config.player_hp, weapon))
            })
            .collect::<Result<Vec<_>>>()?;

        let shared_lives = match mode {
            Mode::Coop => config.starting_lives(player_count),
            Mode::Pvp => 0,
        };

        Ok(Self {
            players,
            bullets: vec![BulletState::default(); config.max_bullets],
            enemies: vec![EnemyState::default(); config.max_enemies],
            tiles,
            spawn_points,
            match_state: MatchState {
                mode,
                tick: 0,
                score: 0,
                shared_lives,
                rng_seed: seed,
                rng_state: seed,
                next_entity_id,
                map_id: map.id.clone(),
                game_over: false,
                spawn_count: 0,
            },
        })
    }

    /// Hand out the next entity id.
    ///
    /// # Errors
    ///
    /// Fails once every id has been handed out.
    pub fn next_id(&mut self) -> Result<EntityId> {
        allocate_id(&mut self.match_state.next_entity_id).ok_or_else(ids_exhausted)
    }

    /// Append a player at the next slot with spawn invulnerability.
    /// Co-op matches gain one shared life.
    pub fn add_player(&mut self, weapon: usize, config: &SimConfig) -> Result<&PlayerState> {
        if self.players.len() >= config.max_players {
            return Err(GameError::LobbyFull {
                max: config.max_players,
            });
        }
        let slot = self.players.len();
        let spawn = self.spawn_points[slot % self.spawn_points.len()];
        let id = self.next_id()?;
        let mut player = PlayerState::new(id, slot, spawn, config.player_hp, weapon);
        player.invuln_timer = config.spawn_invuln_duration;
        self.players.push(player);
        if self.match_state.mode == Mode::Coop {
            self.match_state.shared_lives += 1;
        }
        Ok(&self.players[slot])
    }

    /// Player in `slot`.
    pub fn player(&self, slot: usize) -> Result<&PlayerState> {
        self.players.get(slot).ok_or(GameError::InvalidSlot(slot))
    }

    /// Mutable player in `slot`.
    pub fn player_mut(&mut self, slot: usize) -> Result<&mut PlayerState> {
        self.players.get_mut(slot).ok_or(GameError::InvalidSlot(slot))
    }

    /// Active bullets in pool order.
    pub fn active_bullets(&self) -> impl Iterator<Item = &BulletState> {
        self.bullets.iter().filter(|b| b.active)
    }

    /// Active enemies in pool order.
    pub fn active_enemies(&self) -> impl Iterator<Item = &EnemyState> {
        self.enemies.iter().filter(|e| e.active)
    }

    /// Broken structural invariants, empty when the state is consistent.
    ///
    /// Checks slot numbering, id uniqueness among live entities, ids below
    /// the allocator and the tile count.
    #[must_use]
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let next = self.match_state.next_entity_id;

        for (index, player) in self.players.iter().enumerate() {
            if player.slot != index {
                errors.push(format!(
                    "Player {} in slot {index} claims slot {}",
                    player.id, player.slot
                ));
            }
        }

        let mut ids: Vec<EntityId> = self
            .players
            .iter()
            .map(|p| p.id)
            .chain(self.active_bullets().map(|b| b.id))
            .chain(self.active_enemies().map(|e| e.id))
            .collect();
        if let Some(id) = ids.iter().find(|&&id| id >= next) {
            errors.push(format!("Entity id {id} not below next id {next}"));
        }
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|w| w[0] == w[1]) {
            errors.push(format!("Entity id {} is used twice", pair[0]));
        }

        let expected = i64::from(self.tiles.width()) * i64::from(self.tiles.height());
        if i64::try_from(self.tiles.len()).unwrap_or(i64::MAX) != expected {
            errors.push(format!(
                "Tile grid holds {} cells, expected {expected}",
                self.tiles.len()
            ));
        }
        if self.match_state.shared_lives < 0 {
            errors.push(format!(
                "Shared lives went negative: {}",
                self.match_state.shared_lives
            ));
        }
        errors
    }
}

/// Index and squared distance of the nearest alive player. Ties keep the
/// lowest slot.
#[must_use]
pub fn nearest_alive_player(players: &[PlayerState], pos: Vec2Fixed) -> Option<(usize, Fixed)> {
    let mut best: Option<(usize, Fixed)> = None;
    for (i, player) in players.iter().enumerate() {
        if !player.alive {
            continue;
        }
        let d2 = player.pos.distance_squared(pos);
        if best.map_or(true, |(_, bd)| d2 < bd) {
            best = Some((i, d2));
        }
    }
    best
}

/// Empty 80x60 arena with players at the given positions, for system tests.
#[cfg(test)]
pub(crate) fn open_state(mode: Mode, positions: &[(i32, i32)]) -> GameState {
    let config = SimConfig::default();
    let mut next_entity_id: EntityId = 1;
    let players = positions
        .iter()
        .enumerate()
        .map(|(slot, &(x, y))| {
            let id = allocate_id(&mut next_entity_id).unwrap();
            PlayerState::new(id, slot, Vec2Fixed::from_int(x, y), config.player_hp, 0)
        })
        .collect();
    GameState {
        players,
        bullets: vec![BulletState::default(); 16],
        enemies: vec![EnemyState::default(); 8],
        tiles: TileGrid::new(80, 60, Fixed::from_num(12)),
        spawn_points: vec![
            Vec2Fixed::from_int(100, 100),
            Vec2Fixed::from_int(860, 100),
            Vec2Fixed::from_int(100, 620),
            Vec2Fixed::from_int(860, 620),
        ],
        match_state: MatchState {
            mode,
            tick: 0,
            score: 0,
            shared_lives: match mode {
                Mode::Coop => config.starting_lives(positions.len()),
                Mode::Pvp => 0,
            },
            rng_seed: 1,
            rng_state: 1,
            next_entity_id,
            map_id: "open".to_string(),
            game_over: false,
            spawn_count: 0,
        },
    }
}
