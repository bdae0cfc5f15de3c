//! Intent application: raw sticks to velocity and aim.

use crate::config::SimConfig;
use crate::math::{ratio, Fixed, Vec2Fixed};
use crate::state::{PlayerIntent, PlayerState};

/// Convert each player's intent into velocity and aim.
///
/// Move vectors longer than 1 are normalized. Downed players crawl. Aim only
/// changes when the stick is past a small dead zone. A slot with no intent
/// stops moving.
pub fn apply_intents(players: &mut [PlayerState], intents: &[PlayerIntent], config: &SimConfig) {
    let run_speed = Fixed::from_num(config.player_move_speed);
    let crawl_speed = Fixed::from_num(config.downed_crawl_speed);
    let aim_dead_zone_sq = ratio(1, 100);

    for (slot, player) in players.iter_mut().enumerate() {
        if !player.is_present() {
            continue;
        }

        let Some(intent) = intents.get(slot) else {
            player.vel = Vec2Fixed::ZERO;
            continue;
        };

        let speed = if player.downed { crawl_speed } else { run_speed };
        let dir = if intent.move_dir.length_squared() > Fixed::ONE {
            intent.move_dir.normalize()
        } else {
            intent.move_dir
        };
        player.vel = dir.scale(speed);

        if intent.aim.length_squared() > aim_dead_zone_sq {
            player.aim = intent.aim.normalize();
        }
    }
}
