//! Tile grid: terrain storage, circle-vs-tile resolution and line of sight.
//!
//! Cells are stored row-major (`row * width + col`). Coordinates outside the
//! grid are treated as blocked by every query that answers "can I pass?",
//! and clamped by queries that answer "which cell is this?".

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, fixed_sqrt, Fixed, Vec2Fixed};

/// Terrain kind of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    /// Walkable, transparent.
    #[default]
    Empty,
    /// Indestructible wall.
    Solid,
    /// Wall that bullets wear down.
    Breakable,
}

/// One grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Tile {
    /// Terrain kind.
    pub kind: TileKind,
    /// Remaining hit points (meaningful for breakable tiles only).
    pub hp: i32,
}

impl Tile {
    /// An empty cell.
    pub const EMPTY: Self = Self {
        kind: TileKind::Empty,
        hp: 0,
    };

    /// A solid wall.
    pub const SOLID: Self = Self {
        kind: TileKind::Solid,
        hp: 0,
    };

    /// A breakable wall with the given hit points.
    #[must_use]
    pub const fn breakable(hp: i32) -> Self {
        Self {
            kind: TileKind::Breakable,
            hp,
        }
    }

    /// True for empty cells.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        matches!(self.kind, TileKind::Empty)
    }
}

/// Arena terrain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileGrid {
    width: i32,
    height: i32,
    #[serde(with = "fixed_serde")]
    cell_size: Fixed,
    cells: Vec<Tile>,
}

impl TileGrid {
    /// Create a grid with every cell empty.
    ///
    /// Non-positive dimensions produce an empty grid.
    #[must_use]
    pub fn new(width: i32, height: i32, cell_size: Fixed) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        #[allow(clippy::cast_sign_loss)]
        let count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            cell_size,
            cells: vec![Tile::EMPTY; count],
        }
    }

    /// Create a grid from row-major cells. Returns `None` on a length mismatch.
    #[must_use]
    pub fn from_cells(width: i32, height: i32, cell_size: Fixed, cells: Vec<Tile>) -> Option<Self> {
        let expected = usize::try_from(width).ok()? * usize::try_from(height).ok()?;
        (cells.len() == expected).then_some(Self {
            width,
            height,
            cell_size,
            cells,
        })
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Cell size in world units.
    #[must_use]
    pub const fn cell_size(&self) -> Fixed {
        self.cell_size
    }

    /// Arena width in world units.
    #[must_use]
    pub fn world_width(&self) -> Fixed {
        Fixed::from_num(self.width) * self.cell_size
    }

    /// Arena height in world units.
    #[must_use]
    pub fn world_height(&self) -> Fixed {
        Fixed::from_num(self.height) * self.cell_size
    }

    /// All cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[Tile] {
        &self.cells
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if the grid has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Check if a cell is within grid bounds.
    #[must_use]
    pub const fn in_bounds(&self, col: i32, row: i32) -> bool {
        col >= 0 && row >= 0 && col < self.width && row < self.height
    }

    /// Row-major index of an in-bounds cell.
    #[must_use]
    pub fn index(&self, col: i32, row: i32) -> Option<usize> {
        if self.in_bounds(col, row) {
            usize::try_from(row * self.width + col).ok()
        } else {
            None
        }
    }

    /// Column and row of a row-major index.
    #[must_use]
    pub fn coords(&self, index: usize) -> (i32, i32) {
        let width = usize::try_from(self.width).unwrap_or(1).max(1);
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let coords = ((index % width) as i32, (index / width) as i32);
        coords
    }

    /// Cell at `(col, row)`, or `None` out of bounds.
    #[must_use]
    pub fn get(&self, col: i32, row: i32) -> Option<Tile> {
        self.index(col, row).map(|i| self.cells[i])
    }

    /// Mutable cell at `(col, row)`, or `None` out of bounds.
    pub fn get_mut(&mut self, col: i32, row: i32) -> Option<&mut Tile> {
        self.index(col, row).map(move |i| &mut self.cells[i])
    }

    /// Overwrite a cell. Returns `false` if out of bounds.
    pub fn set(&mut self, col: i32, row: i32, tile: Tile) -> bool {
        match self.get_mut(col, row) {
            Some(cell) => {
                *cell = tile;
                true
            }
            None => false,
        }
    }

    /// True if the cell is in bounds and empty.
    #[must_use]
    pub fn is_passable(&self, col: i32, row: i32) -> bool {
        self.get(col, row).is_some_and(Tile::is_empty)
    }

    /// Cell containing a world position (floor division, unclamped).
    #[must_use]
    pub fn world_to_cell(&self, pos: Vec2Fixed) -> (i32, i32) {
        (self.axis_cell(pos.x), self.axis_cell(pos.y))
    }

    /// Cell containing a world position, clamped to the grid edge.
    #[must_use]
    pub fn cell_at_clamped(&self, pos: Vec2Fixed) -> (i32, i32) {
        let (col, row) = self.world_to_cell(pos);
        (
            col.clamp(0, (self.width - 1).max(0)),
            row.clamp(0, (self.height - 1).max(0)),
        )
    }

    /// World position of a cell's center.
    #[must_use]
    pub fn cell_center(&self, col: i32, row: i32) -> Vec2Fixed {
        let half = self.cell_size / Fixed::from_num(2);
        Vec2Fixed::new(
            Fixed::from_num(col) * self.cell_size + half,
            Fixed::from_num(row) * self.cell_size + half,
        )
    }

    fn axis_cell(&self, v: Fixed) -> i32 {
        match v.checked_div(self.cell_size) {
            Some(q) => q.floor().saturating_to_num::<i32>(),
            None => 0,
        }
    }

    /// Push a circle out of every non-empty cell it overlaps.
    ///
    /// Cells are visited row-major over the circle's bounding box. A center
    /// strictly inside a cell is pushed out along the axis with the smallest
    /// overlap (ties: left, right, top, bottom).
    #[must_use]
    pub fn resolve_circle(&self, pos: Vec2Fixed, radius: Fixed) -> Vec2Fixed {
        if self.cells.is_empty() {
            return pos;
        }
        let max_col = self.width - 1;
        let max_row = self.height - 1;
        let left = self.axis_cell(pos.x - radius).clamp(0, max_col);
        let right = self.axis_cell(pos.x + radius).clamp(0, max_col);
        let top = self.axis_cell(pos.y - radius).clamp(0, max_row);
        let bottom = self.axis_cell(pos.y + radius).clamp(0, max_row);

        let cs = self.cell_size;
        let radius_sq = radius * radius;
        let mut p = pos;

        for row in top..=bottom {
            for col in left..=right {
                if self.get(col, row).map_or(true, Tile::is_empty) {
                    continue;
                }

                let tile_left = Fixed::from_num(col) * cs;
                let tile_top = Fixed::from_num(row) * cs;
                let tile_right = tile_left + cs;
                let tile_bottom = tile_top + cs;

                let closest = Vec2Fixed::new(
                    p.x.clamp(tile_left, tile_right),
                    p.y.clamp(tile_top, tile_bottom),
                );
                let delta = p - closest;
                let dist_sq = delta.length_squared();

                if dist_sq > Fixed::ZERO && dist_sq < radius_sq {
                    let dist = fixed_sqrt(dist_sq);
                    if dist > Fixed::ZERO {
                        p = closest + delta.scale(radius / dist);
                        p = nudge_clear(p, closest, delta, radius_sq);
                    }
                } else if dist_sq == Fixed::ZERO {
                    let overlap_left = p.x - tile_left + radius;
                    let overlap_right = tile_right - p.x + radius;
                    let overlap_top = p.y - tile_top + radius;
                    let overlap_bottom = tile_bottom - p.y + radius;
                    let min = overlap_left
                        .min(overlap_right)
                        .min(overlap_top)
                        .min(overlap_bottom);

                    if min == overlap_left {
                        p.x = tile_left - radius;
                    } else if min == overlap_right {
                        p.x = tile_right + radius;
                    } else if min == overlap_top {
                        p.y = tile_top - radius;
                    } else {
                        p.y = tile_bottom + radius;
                    }
                }
            }
        }

        p
    }

    /// Grid DDA line-of-sight test between two world positions.
    ///
    /// The start cell is never tested. Any non-empty (or out-of-bounds) cell
    /// entered before the end cell blocks; the end cell itself never blocks.
    /// Gives up (returns `false`) after `width + height` steps.
    #[must_use]
    pub fn has_line_of_sight(&self, from: Vec2Fixed, to: Vec2Fixed) -> bool {
        let (mut col, mut row) = self.world_to_cell(from);
        let end = self.world_to_cell(to);
        if (col, row) == end {
            return true;
        }

        let cs = self.cell_size;
        let dir = to - from;
        let step_col = signum(dir.x);
        let step_row = signum(dir.y);

        let t_delta_x = axis_delta(cs, dir.x);
        let t_delta_y = axis_delta(cs, dir.y);
        let mut t_max_x = axis_first_crossing(from.x, col, cs, dir.x);
        let mut t_max_y = axis_first_crossing(from.y, row, cs, dir.y);

        for _ in 0..(self.width + self.height) {
            if t_max_x <= t_max_y {
                col += step_col;
                t_max_x = t_max_x.saturating_add(t_delta_x);
            } else {
                row += step_row;
                t_max_y = t_max_y.saturating_add(t_delta_y);
            }

            if (col, row) == end {
                return true;
            }
            if !self.is_passable(col, row) {
                return false;
            }
        }

        false
    }
}

fn signum(v: Fixed) -> i32 {
    if v > Fixed::ZERO {
        1
    } else if v < Fixed::ZERO {
        -1
    } else {
        0
    }
}

/// Step `p` away from `closest` along the signs of `delta` until the
/// fixed-point distance reaches the radius again.
fn nudge_clear(mut p: Vec2Fixed, closest: Vec2Fixed, delta: Vec2Fixed, radius_sq: Fixed) -> Vec2Fixed {
    let dir_x = Fixed::from_num(signum(delta.x));
    let dir_y = Fixed::from_num(signum(delta.y));
    let mut step = Fixed::DELTA;
    for _ in 0..32 {
        if (p - closest).length_squared() >= radius_sq {
            break;
        }
        p.x += dir_x * step;
        p.y += dir_y * step;
        step *= 2;
    }
    p
}

/// Segment parameter needed to cross one whole cell along an axis.
fn axis_delta(cell_size: Fixed, d: Fixed) -> Fixed {
    if d == Fixed::ZERO {
        return Fixed::MAX;
    }
    cell_size.checked_div(d.abs()).unwrap_or(Fixed::MAX)
}

/// Segment parameter at the first cell boundary crossed along an axis.
fn axis_first_crossing(origin: Fixed, cell: i32, cell_size: Fixed, d: Fixed) -> Fixed {
    if d > Fixed::ZERO {
        let boundary = Fixed::from_num(cell + 1) * cell_size;
        (boundary - origin).checked_div(d).unwrap_or(Fixed::MAX)
    } else if d < Fixed::ZERO {
        let boundary = Fixed::from_num(cell) * cell_size;
        (origin - boundary).checked_div(-d).unwrap_or(Fixed::MAX)
    } else {
        Fixed::MAX
    }
}
