//! Co-op spawn director.

use crate::config::SimConfig;
use crate::defs::EnemyDef;
use crate::events::{EventBus, GameEvent};
use crate::math::{Fixed, Vec2Fixed};
use crate::rng::SeededRng;
use crate::state::{EnemyState, EntityId, GameState, Mode};

/// Reset a pool slot to a freshly spawned enemy of type `kind`.
///
/// Balance fields are copied from the definition so later catalog edits
/// never touch live enemies.
pub fn init_enemy(
    enemy: &mut EnemyState,
    id: EntityId,
    kind: usize,
    def: &EnemyDef,
    pos: Vec2Fixed,
    telegraph_ticks: i32,
) {
    *enemy = EnemyState {
        id,
        kind,
        pos,
        vel: Vec2Fixed::ZERO,
        hp: def.hp,
        active: true,
        spawn_timer: telegraph_ticks,
        fire_cooldown: def.ranged.as_ref().map_or(0, |r| r.fire_rate),
        knockback: def.knockback,
        score: def.score,
        contact_damage: def.contact_damage,
        collider_radius: def.collider_radius,
        move_speed: def.move_speed,
        spin_angle: Fixed::ZERO,
        trail_cooldown: 0,
        trail_last_cell: None,
    };
}

/// Ticks between spawn attempts at `tick`.
///
/// Ramps linearly from the base interval to the minimum over the ramp
/// duration, then divides by `0.5 + 0.5 * players` and rounds. Never below 1.
#[must_use]
pub fn spawn_interval(tick: u64, players: usize, config: &SimConfig) -> u64 {
    let base = Fixed::from_num(config.spawn_rate_base_interval);
    let min = Fixed::from_num(config.spawn_rate_min_interval);
    let ramp = config.spawn_ramp_duration.max(1);
    let t = if tick >= ramp {
        Fixed::ONE
    } else {
        Fixed::saturating_from_num(tick) / Fixed::saturating_from_num(ramp)
    };
    let interval = base + (min - base) * t;
    let divisor = (Fixed::ONE + Fixed::saturating_from_num(players)) / Fixed::from_num(2);
    let adjusted = interval / divisor;
    let rounded: i64 = adjusted.round().saturating_to_num();
    u64::try_from(rounded.max(1)).unwrap_or(1)
}

fn nearest_alive_sq(state: &GameState, pos: Vec2Fixed) -> Fixed {
    state
        .players
        .iter()
        .filter(|p| p.alive)
        .map(|p| p.pos.distance_squared(pos))
        .min()
        .unwrap_or(Fixed::MAX)
}

/// Spawn one enemy on schedule (co-op only).
///
/// One candidate is drawn on each edge of the arena (top, bottom, left,
/// right); the one farthest from its nearest living player wins. The spawn
/// is skipped if a living player is within the safety distance or the pool
/// is full. The type is a weighted draw among types eligible at this tick.
pub fn spawn_system(
    state: &mut GameState,
    defs: &[EnemyDef],
    config: &SimConfig,
    rng: &mut SeededRng,
    events: &mut EventBus,
) {
    if state.match_state.mode != Mode::Coop {
        return;
    }
    let tick = state.match_state.tick;
    if tick % spawn_interval(tick, state.players.len(), config) != 0 {
        return;
    }

    let cs: i32 = state.tiles.cell_size().saturating_to_num();
    let width: i32 = state.tiles.world_width().saturating_to_num();
    let height: i32 = state.tiles.world_height().saturating_to_num();
    let zones = [
        Vec2Fixed::from_int(rng.next_int(cs * 2, width - cs * 2), cs + 4),
        Vec2Fixed::from_int(rng.next_int(cs * 2, width - cs * 2), height - cs - 4),
        Vec2Fixed::from_int(cs + 4, rng.next_int(cs * 2, height - cs * 2)),
        Vec2Fixed::from_int(width - cs - 4, rng.next_int(cs * 2, height - cs * 2)),
    ];

    let mut pos = zones[0];
    let mut best: Option<Fixed> = None;
    for zone in zones {
        let d = nearest_alive_sq(state, zone);
        if best.map_or(true, |b| d > b) {
            best = Some(d);
            pos = zone;
        }
    }

    let safety = Fixed::from_num(config.spawn_safety_distance);
    if nearest_alive_sq(state, pos) < safety * safety {
        tracing::trace!(tick, "Spawn skipped: too close to a player");
        return;
    }

    let Some(slot) = state.enemies.iter().position(|e| !e.active) else {
        tracing::trace!(tick, "Spawn skipped: enemy pool full");
        return;
    };

    let total: u32 = defs
        .iter()
        .filter(|d| d.eligible_at(tick))
        .map(|d| d.spawn_weight)
        .sum();
    if total == 0 {
        return;
    }
    let max_roll = i32::try_from(total - 1).unwrap_or(i32::MAX);
    let mut roll = u32::try_from(rng.next_int(0, max_roll)).unwrap_or(0);
    let mut kind = 0;
    for (k, def) in defs.iter().enumerate().filter(|(_, d)| d.eligible_at(tick)) {
        if roll < def.spawn_weight {
            kind = k;
            break;
        }
        roll -= def.spawn_weight;
    }

    let Ok(id) = state.next_id() else {
        return;
    };
    init_enemy(
        &mut state.enemies[slot],
        id,
        kind,
        &defs[kind],
        pos,
        config.spawn_telegraph_ticks,
    );
    state.match_state.spawn_count += 1;
    events.emit(GameEvent::EnemySpawned { enemy_id: id, pos });
    tracing::trace!(tick, enemy = id, kind = %defs[kind].id, "Enemy spawned");
}
