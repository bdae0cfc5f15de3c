//! Generative cover: enemies with a trail ability plant breakable tiles in
//! the cells they leave behind.

use serde::{Deserialize, Serialize};

use crate::defs::{EnemyDef, MAX_TRAIL_RING};
use crate::events::{EventBus, GameEvent};
use crate::grid::{Tile, TileKind};
use crate::state::GameState;

/// Fixed-capacity FIFO of the cells one enemy has planted, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TrailRing {
    cells: [(i32, i32); MAX_TRAIL_RING],
    head: usize,
    len: usize,
}

impl TrailRing {
    /// Number of planted cells tracked.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if nothing is tracked.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Forget every tracked cell.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Track a new cell. When full, the oldest entry is overwritten.
    pub fn push(&mut self, cell: (i32, i32)) {
        let tail = (self.head + self.len) % MAX_TRAIL_RING;
        self.cells[tail] = cell;
        if self.len == MAX_TRAIL_RING {
            self.head = (self.head + 1) % MAX_TRAIL_RING;
        } else {
            self.len += 1;
        }
    }

    /// Remove and return the oldest tracked cell.
    pub fn pop_oldest(&mut self) -> Option<(i32, i32)> {
        if self.len == 0 {
            return None;
        }
        let cell = self.cells[self.head];
        self.head = (self.head + 1) % MAX_TRAIL_RING;
        self.len -= 1;
        Some(cell)
    }

    /// Tracked cells, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (0..self.len).map(move |i| self.cells[(self.head + i) % MAX_TRAIL_RING])
    }
}

/// Run the trail ability for every engaged enemy that has one.
///
/// A tile is planted in the vacated cell when the enemy crosses a cell
/// boundary, its cooldown is ready, the cell is empty and in bounds, and no
/// living player stands within the safe radius of the cell's center. At
/// the cap, the oldest planted tile decays first. `rings[i]` belongs to
/// enemy slot `i`.
pub fn trail_system(
    state: &mut GameState,
    defs: &[EnemyDef],
    rings: &mut [TrailRing],
    events: &mut EventBus,
) {
    let GameState {
        players,
        enemies,
        tiles,
        ..
    } = state;

    for (enemy, ring) in enemies.iter_mut().zip(rings.iter_mut()) {
        if !enemy.is_engaged() {
            continue;
        }
        let Some(trail) = defs.get(enemy.kind).and_then(|d| d.trail.as_ref()) else {
            continue;
        };

        let cell = tiles.world_to_cell(enemy.pos);
        let Some(vacated) = enemy.trail_last_cell else {
            ring.clear();
            enemy.trail_last_cell = Some(cell);
            continue;
        };

        if enemy.trail_cooldown > 0 {
            enemy.trail_cooldown -= 1;
        }
        if cell == vacated {
            continue;
        }
        enemy.trail_last_cell = Some(cell);

        if enemy.trail_cooldown > 0 {
            continue;
        }
        let (col, row) = vacated;
        if tiles.get(col, row).map_or(true, |t| !t.is_empty()) {
            continue;
        }
        let center = tiles.cell_center(col, row);
        let safe_sq = trail.player_safe_radius * trail.player_safe_radius;
        if players
            .iter()
            .any(|p| p.alive && p.pos.distance_squared(center) < safe_sq)
        {
            continue;
        }

        let cap = trail.max_tiles.min(MAX_TRAIL_RING);
        if ring.len() >= cap {
            if let Some((old_col, old_row)) = ring.pop_oldest() {
                let still_standing = tiles
                    .get(old_col, old_row)
                    .is_some_and(|t| t.kind == TileKind::Breakable);
                if still_standing {
                    tiles.set(old_col, old_row, Tile::EMPTY);
                    events.emit(GameEvent::TileDestroyed {
                        col: old_col,
                        row: old_row,
                    });
                }
            }
        }

        tiles.set(col, row, Tile::breakable(trail.tile_hp));
        ring.push(vacated);
        enemy.trail_cooldown = trail.cooldown_ticks;
        events.emit(GameEvent::TileCreated {
            col,
            row,
            hp: trail.tile_hp,
        });
        tracing::trace!(enemy = enemy.id, col, row, "Trail tile placed");
    }
}
