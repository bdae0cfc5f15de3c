//! Bullet and contact collisions.
//!
//! Each active bullet, in pool order, is tested against enemies, then
//! players, then the tile it sits in. The first body hit ends the bullet's
//! turn: it is consumed unless it still has pierce left, in which case it
//! remembers the body so it cannot hit it again. Tiles always consume.
//! A separate contact pass then lets engaged enemies hurt players they touch.

use crate::config::SimConfig;
use crate::events::{EventBus, GameEvent};
use crate::grid::{Tile, TileGrid, TileKind};
use crate::math::Fixed;
use crate::state::{BulletState, EnemyState, EntityId, GameState, MatchState, Mode, PlayerState};

/// Run all collision passes for one tick.
pub fn collision_system(state: &mut GameState, config: &SimConfig, events: &mut EventBus) {
    let GameState {
        players,
        bullets,
        enemies,
        tiles,
        match_state,
        ..
    } = state;
    let bullet_radius = Fixed::from_num(config.bullet_radius);

    for bullet in bullets.iter_mut().filter(|b| b.active) {
        if !bullet.from_enemy
            && bullet_vs_enemies(bullet, enemies, players, match_state, bullet_radius, events)
        {
            continue;
        }
        if bullet_vs_players(bullet, players, match_state.mode, config, events) {
            continue;
        }
        bullet_vs_tile(bullet, tiles, events);
    }

    contact_pass(enemies, players, match_state.mode, config, events);
}

/// Spend one pierce on `body`, or consume the bullet.
fn spend_pierce(bullet: &mut BulletState, body: EntityId) {
    if bullet.pierce_remaining > 0 {
        bullet.pierce_remaining -= 1;
        bullet.last_pierced_id = Some(body);
    } else {
        bullet.active = false;
    }
}

fn credit_kill(players: &mut [PlayerState], owner_id: EntityId) {
    if let Some(killer) = players.iter_mut().find(|p| p.id == owner_id) {
        killer.kills += 1;
    }
}

/// Take a player out after a lethal hit: downed in co-op, dead in PvP.
pub(crate) fn knock_out(
    player: &mut PlayerState,
    mode: Mode,
    config: &SimConfig,
    events: &mut EventBus,
) {
    player.hp = 0;
    player.alive = false;
    match mode {
        Mode::Coop => {
            player.downed = true;
            player.downed_timer = config.downed_bleedout_timer;
            events.emit(GameEvent::PlayerDowned {
                player_id: player.id,
                pos: player.pos,
            });
        }
        Mode::Pvp => {
            player.deaths += 1;
            player.respawn_timer = config.pvp_respawn_delay;
        }
    }
}

fn bullet_vs_enemies(
    bullet: &mut BulletState,
    enemies: &mut [EnemyState],
    players: &mut [PlayerState],
    match_state: &mut MatchState,
    bullet_radius: Fixed,
    events: &mut EventBus,
) -> bool {
    for enemy in enemies.iter_mut() {
        if !enemy.is_engaged() || bullet.last_pierced_id == Some(enemy.id) {
            continue;
        }
        let reach = bullet_radius + enemy.collider_radius;
        if bullet.pos.distance_squared(enemy.pos) >= reach * reach {
            continue;
        }

        enemy.hp -= bullet.damage;
        if enemy.knockback > Fixed::ZERO {
            enemy.pos += bullet.vel.normalize().scale(enemy.knockback);
        }
        events.emit(GameEvent::HitEnemy {
            bullet_id: bullet.id,
            enemy_id: enemy.id,
            damage: bullet.damage,
        });

        if enemy.hp <= 0 {
            enemy.active = false;
            events.emit(GameEvent::EnemyKilled {
                enemy_id: enemy.id,
                killer_owner_id: bullet.owner_id,
            });
            match match_state.mode {
                Mode::Coop => match_state.score += i64::from(enemy.score),
                Mode::Pvp => credit_kill(players, bullet.owner_id),
            }
        }

        spend_pierce(bullet, enemy.id);
        return true;
    }
    false
}

fn bullet_vs_players(
    bullet: &mut BulletState,
    players: &mut [PlayerState],
    mode: Mode,
    config: &SimConfig,
    events: &mut EventBus,
) -> bool {
    let reach = Fixed::from_num(config.bullet_radius + config.player_radius);
    let knockback = Fixed::from_num(config.player_knockback);
    let mut lethal = false;
    let mut hit = false;

    for player in players.iter_mut() {
        if !player.alive
            || player.invuln_timer > 0
            || bullet.last_pierced_id == Some(player.id)
        {
            continue;
        }
        // Player bullets never hurt their owner, and co-op has no friendly fire.
        if !bullet.from_enemy && (player.id == bullet.owner_id || mode == Mode::Coop) {
            continue;
        }
        if bullet.pos.distance_squared(player.pos) >= reach * reach {
            continue;
        }

        player.hp -= bullet.damage;
        events.emit(GameEvent::HitPlayer {
            bullet_id: bullet.id,
            player_id: player.id,
            damage: bullet.damage,
        });
        player.pos += bullet.vel.normalize().scale(knockback);

        if player.hp <= 0 {
            knock_out(player, mode, config, events);
            lethal = true;
        }

        spend_pierce(bullet, player.id);
        hit = true;
        break;
    }

    if lethal && mode == Mode::Pvp && !bullet.from_enemy {
        credit_kill(players, bullet.owner_id);
    }
    hit
}

fn bullet_vs_tile(bullet: &mut BulletState, tiles: &mut TileGrid, events: &mut EventBus) {
    let (col, row) = tiles.world_to_cell(bullet.pos);
    let Some(tile) = tiles.get_mut(col, row) else {
        return;
    };
    match tile.kind {
        TileKind::Empty => {}
        TileKind::Solid => bullet.active = false,
        TileKind::Breakable => {
            tile.hp -= bullet.damage;
            if tile.hp <= 0 {
                *tile = Tile::EMPTY;
                events.emit(GameEvent::TileDestroyed { col, row });
            } else {
                events.emit(GameEvent::TileDamaged {
                    col,
                    row,
                    remaining_hp: tile.hp,
                });
            }
            bullet.active = false;
        }
    }
}

/// Engaged enemies damage vulnerable players they overlap, granting brief
/// invulnerability on each hit.
fn contact_pass(
    enemies: &[EnemyState],
    players: &mut [PlayerState],
    mode: Mode,
    config: &SimConfig,
    events: &mut EventBus,
) {
    let player_radius = Fixed::from_num(config.player_radius);
    for enemy in enemies.iter().filter(|e| e.is_engaged()) {
        let reach = enemy.collider_radius + player_radius;
        for player in players.iter_mut() {
            if !player.alive || player.invuln_timer > 0 {
                continue;
            }
            if enemy.pos.distance_squared(player.pos) >= reach * reach {
                continue;
            }
            player.hp -= enemy.contact_damage;
            player.invuln_timer = config.hit_iframes;
            if player.hp <= 0 {
                knock_out(player, mode, config, events);
            }
        }
    }
}
