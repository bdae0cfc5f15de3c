//! Player weapons.

use crate::defs::WeaponDef;
use crate::events::{EventBus, GameEvent};
use crate::state::{spawn_bullet, BulletSpawn, BulletState, EntityId, PlayerIntent, PlayerState};

/// Tick weapon cooldowns and fire for every player holding the trigger.
///
/// Dead, downed and invulnerable players cannot fire. A shot spawns one
/// bullet per projectile spread evenly over the weapon's arc and emits a
/// [`GameEvent::BulletFired`] for each; bullets that find no free slot are
/// dropped, and a shot that spawned nothing leaves the weapon ready.
pub fn shooting_system(
    players: &mut [PlayerState],
    intents: &[PlayerIntent],
    bullets: &mut [BulletState],
    next_entity_id: &mut EntityId,
    weapons: &[WeaponDef],
    events: &mut EventBus,
) {
    for (slot, player) in players.iter_mut().enumerate() {
        if player.fire_cooldown > 0 {
            player.fire_cooldown -= 1;
        }

        if !player.alive || player.downed || player.invuln_timer > 0 {
            continue;
        }
        let Some(intent) = intents.get(slot) else {
            continue;
        };
        if !intent.shoot || player.fire_cooldown > 0 {
            continue;
        }
        let Some(weapon) = weapons.get(player.weapon) else {
            tracing::warn!(slot, weapon = player.weapon, "Player holds an unknown weapon");
            continue;
        };

        let mut fired = false;
        for offset in weapon.spread_offsets() {
            let spawn = BulletSpawn {
                owner_id: player.id,
                pos: player.pos,
                dir: player.aim.rotate(offset),
                speed: weapon.bullet_speed,
                ttl: weapon.bullet_ttl,
                damage: weapon.bullet_damage,
                from_enemy: false,
                weapon_id: &weapon.id,
                pierce: weapon.pierce_count,
            };
            if let Some(bullet_id) = spawn_bullet(bullets, next_entity_id, &spawn) {
                events.emit(GameEvent::BulletFired {
                    bullet_id,
                    owner_id: player.id,
                    pos: player.pos,
                });
                fired = true;
            }
        }
        if fired {
            player.fire_cooldown = weapon.fire_rate;
        }
    }
}
