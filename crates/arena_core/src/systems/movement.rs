//! Player movement.

use crate::config::SimConfig;
use crate::grid::TileGrid;
use crate::math::Fixed;
use crate::state::PlayerState;

/// Integrate player positions, push them out of walls and keep them inside
/// the border ring.
pub fn movement_system(players: &mut [PlayerState], tiles: &TileGrid, config: &SimConfig) {
    let dt = config.dt();
    let radius = Fixed::from_num(config.player_radius);
    let cs = tiles.cell_size();
    let max_x = tiles.world_width() - cs;
    let max_y = tiles.world_height() - cs;

    for player in players.iter_mut().filter(|p| p.is_present()) {
        player.pos += player.vel.scale(dt);
        player.pos = tiles.resolve_circle(player.pos, radius);
        player.pos.x = player.pos.x.clamp(cs, max_x);
        player.pos.y = player.pos.y.clamp(cs, max_y);
    }
}
