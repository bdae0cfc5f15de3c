//! Arena map definitions.
//!
//! Maps are authored as ASCII rows (`#` solid, `X` breakable, `.` empty).
//! Several built-in maps are designed on a coarse grid and scaled up to the
//! common 80x60 grid with nearest-neighbour sampling.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::grid::{Tile, TileGrid, TileKind};
use crate::math::{Fixed, Vec2Fixed};

/// Data-driven map definition.
///
/// # Example RON
///
/// ```ron
/// MapDef(
///     id: "tiny",
///     name: "Tiny",
///     cols: 4,
///     rows: 3,
///     cell_size: 12,
///     spawn_points: [(18, 18)],
///     layout: ["####", "#..#", "####"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDef {
    /// Unique string identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Width in cells.
    pub cols: i32,

    /// Height in cells.
    pub rows: i32,

    /// Cell edge length in px.
    pub cell_size: i32,

    /// Player spawn points in world px.
    pub spawn_points: Vec<(i32, i32)>,

    /// One ASCII string per row.
    pub layout: Vec<String>,
}

impl TileKind {
    /// Layout glyph for this kind.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Empty => '.',
            Self::Solid => '#',
            Self::Breakable => 'X',
        }
    }

    /// Kind for a layout glyph, if it is one.
    #[must_use]
    pub const fn from_glyph(ch: char) -> Option<Self> {
        match ch {
            '.' => Some(Self::Empty),
            '#' => Some(Self::Solid),
            'X' => Some(Self::Breakable),
            _ => None,
        }
    }
}

/// Parse an ASCII layout into row-major tile kinds. Characters other than
/// `#`, `X` and `.` are skipped.
#[must_use]
pub fn parse_layout(layout: &str) -> Vec<TileKind> {
    layout.chars().filter_map(TileKind::from_glyph).collect()
}

/// Nearest-neighbour scale a row-major layout to a new grid size.
#[must_use]
pub fn scale_layout(
    src: &[TileKind],
    src_cols: i32,
    src_rows: i32,
    dst_cols: i32,
    dst_rows: i32,
) -> Vec<TileKind> {
    let mut dst = Vec::with_capacity(usize::try_from(dst_cols * dst_rows).unwrap_or(0));
    for row in 0..dst_rows {
        let src_row = row * src_rows / dst_rows;
        for col in 0..dst_cols {
            let src_col = col * src_cols / dst_cols;
            let index = usize::try_from(src_row * src_cols + src_col).unwrap_or(0);
            dst.push(src.get(index).copied().unwrap_or_default());
        }
    }
    dst
}

fn div_ceil(a: i32, b: i32) -> i32 {
    (a + b - 1) / b
}

/// Move spawn points from a coarse grid to a finer one.
///
/// Each point lands on the center of the middle destination cell among
/// those that sample back to its source cell.
#[must_use]
pub fn scale_spawn_points(
    spawns: &[(i32, i32)],
    src: (i32, i32, i32),
    dst: (i32, i32, i32),
) -> Vec<(i32, i32)> {
    let (src_cols, src_rows, src_cs) = src;
    let (dst_cols, dst_rows, dst_cs) = dst;
    let scale_axis = |v: i32, src_n: i32, dst_n: i32| {
        let src_cell = v / src_cs;
        let start = div_ceil(src_cell * dst_n, src_n);
        let end = div_ceil((src_cell + 1) * dst_n, src_n) - 1;
        let dst_cell = (start + end) / 2;
        dst_cell * dst_cs + dst_cs / 2
    };
    spawns
        .iter()
        .map(|&(x, y)| (scale_axis(x, src_cols, dst_cols), scale_axis(y, src_rows, dst_rows)))
        .collect()
}

impl MapDef {
    /// Build a definition from row-major tile kinds.
    #[must_use]
    pub fn from_cells(
        id: &str,
        name: &str,
        cols: i32,
        rows: i32,
        cell_size: i32,
        spawn_points: Vec<(i32, i32)>,
        cells: &[TileKind],
    ) -> Self {
        let width = usize::try_from(cols).unwrap_or(1).max(1);
        let layout = cells
            .chunks(width)
            .map(|row| row.iter().map(|k| k.glyph()).collect())
            .collect();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            cols,
            rows,
            cell_size,
            spawn_points,
            layout,
        }
    }

    /// Row-major tile kinds.
    #[must_use]
    pub fn cells(&self) -> Vec<TileKind> {
        self.layout.iter().flat_map(|row| parse_layout(row)).collect()
    }

    /// Spawn points as world positions.
    #[must_use]
    pub fn spawn_positions(&self) -> Vec<Vec2Fixed> {
        self.spawn_points
            .iter()
            .map(|&(x, y)| Vec2Fixed::from_int(x, y))
            .collect()
    }

    /// Structural problems with this map, empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.cols <= 0 || self.rows <= 0 {
            errors.push(format!("Map '{}' has non-positive dimensions", self.id));
        }
        if self.cell_size <= 0 {
            errors.push(format!("Map '{}' has non-positive cell size", self.id));
        }
        let expected = i64::from(self.cols) * i64::from(self.rows);
        let actual = self.cells().len() as i64;
        if actual != expected {
            errors.push(format!(
                "Map '{}' layout has {} cells, expected {}",
                self.id, actual, expected
            ));
        }
        if self.spawn_points.is_empty() {
            errors.push(format!("Map '{}' has no spawn points", self.id));
        }
        errors
    }

    /// Build the runtime tile grid. Breakable cells start with
    /// `breakable_hp` hit points.
    pub fn build_grid(&self, breakable_hp: i32) -> Result<TileGrid> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(GameError::InvalidCatalog(errors.join("; ")));
        }
        let cells = self
            .cells()
            .into_iter()
            .map(|kind| match kind {
                TileKind::Empty => Tile::EMPTY,
                TileKind::Solid => Tile::SOLID,
                TileKind::Breakable => Tile::breakable(breakable_hp),
            })
            .collect();
        TileGrid::from_cells(self.cols, self.rows, Fixed::from_num(self.cell_size), cells)
            .ok_or_else(|| GameError::InvalidCatalog(format!("Map '{}' has a bad layout", self.id)))
    }
}

const GRID_COLS: i32 = 80;
const GRID_ROWS: i32 = 60;
const GRID_CELL: i32 = 12;

fn bordered(cols: i32, rows: i32, interior: impl Fn(i32, i32) -> TileKind) -> Vec<TileKind> {
    let mut cells = Vec::with_capacity(usize::try_from(cols * rows).unwrap_or(0));
    for row in 0..rows {
        for col in 0..cols {
            if row == 0 || row == rows - 1 || col == 0 || col == cols - 1 {
                cells.push(TileKind::Solid);
            } else {
                cells.push(interior(col, row));
            }
        }
    }
    cells
}

fn fortress() -> MapDef {
    let cells = bordered(GRID_COLS, GRID_ROWS, |col, row| {
        let in_h_corridor = (14..=17).contains(&row) || (29..=32).contains(&row) || (44..=47).contains(&row);
        let in_v_corridor = (19..=22).contains(&col) || (39..=42).contains(&col) || (59..=62).contains(&col);
        if in_h_corridor || in_v_corridor {
            TileKind::Empty
        } else if row % 12 < 2
            && col % 12 < 2
            && (2..=GRID_ROWS - 3).contains(&row)
            && (2..=GRID_COLS - 3).contains(&col)
        {
            TileKind::Solid
        } else {
            TileKind::Breakable
        }
    });
    MapDef::from_cells(
        "fortress",
        "Fortress",
        GRID_COLS,
        GRID_ROWS,
        GRID_CELL,
        vec![(246, 186), (726, 186), (486, 366), (246, 546), (726, 546), (54, 366), (918, 366)],
        &cells,
    )
}

fn arena() -> MapDef {
    let cells = bordered(GRID_COLS, GRID_ROWS, |_, _| TileKind::Empty);
    MapDef::from_cells(
        "arena",
        "Arena",
        GRID_COLS,
        GRID_ROWS,
        GRID_CELL,
        vec![(102, 54), (486, 54), (870, 54), (54, 366), (918, 366), (102, 678), (870, 678)],
        &cells,
    )
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn scaled(
    id: &str,
    name: &str,
    src_rows: &[&str],
    src_cell: i32,
    spawns: &[(i32, i32)],
) -> MapDef {
    let src_cols = src_rows.first().map_or(0, |r| r.len() as i32);
    let src_row_count = src_rows.len() as i32;
    let src = parse_layout(&src_rows.concat());
    let cells = scale_layout(&src, src_cols, src_row_count, GRID_COLS, GRID_ROWS);
    let spawn_points = scale_spawn_points(
        spawns,
        (src_cols, src_row_count, src_cell),
        (GRID_COLS, GRID_ROWS, GRID_CELL),
    );
    MapDef::from_cells(id, name, GRID_COLS, GRID_ROWS, GRID_CELL, spawn_points, &cells)
}

fn bunker() -> MapDef {
    scaled(
        "bunker",
        "Bunker",
        &[
            "################",
            "#..............#",
            "#.##.XX..XX.##.#",
            "#..............#",
            "#.XX.##..##.XX.#",
            "#......XX......#",
            "#......XX......#",
            "#.XX.##..##.XX.#",
            "#..............#",
            "#.##.XX..XX.##.#",
            "#..............#",
            "################",
        ],
        48,
        &[(384, 72), (72, 288), (696, 288), (168, 504), (600, 504)],
    )
}

fn crucible() -> MapDef {
    scaled(
        "crucible",
        "Crucible",
        &[
            "########################",
            "#......................#",
            "#..####..........####..#",
            "#..#XX#..........#XX#..#",
            "#..####..........####..#",
            "#......................#",
            "#......................#",
            "#.....XXXXXXXXXXXX.....#",
            "#.....XXXXXXXXXXXX.....#",
            "#.....XXXXXXXXXXXX.....#",
            "#.....XXXXXXXXXXXX.....#",
            "#......................#",
            "#......................#",
            "#..####..........####..#",
            "#..#XX#..........#XX#..#",
            "#..####..........####..#",
            "#......................#",
            "########################",
        ],
        40,
        &[(60, 60), (500, 60), (900, 60), (60, 380), (900, 380), (220, 660), (740, 660)],
    )
}

fn gridlock() -> MapDef {
    scaled(
        "gridlock",
        "Gridlock",
        &[
            "##############################",
            "#............................#",
            "#..####................####..#",
            "#..#XX#................#XX#..#",
            "#..####................####..#",
            "#............................#",
            "#............................#",
            "#.........XXXX..XXXX.........#",
            "#.........XXXX..XXXX.........#",
            "#............................#",
            "#.....##.....XXXX.....##.....#",
            "#.....##.....XXXX.....##.....#",
            "#............................#",
            "#.........XXXX..XXXX.........#",
            "#.........XXXX..XXXX.........#",
            "#............................#",
            "#............................#",
            "#..####................####..#",
            "#..#XX#................#XX#..#",
            "#..####................####..#",
            "#............................#",
            "##############################",
        ],
        32,
        &[(48, 48), (464, 48), (912, 48), (48, 336), (912, 336), (144, 656), (816, 656)],
    )
}

fn labyrinth() -> MapDef {
    const COLS: i32 = 40;
    const ROWS: i32 = 30;
    let base = bordered(COLS, ROWS, |col, row| {
        let in_doorway_row = (7..=8).contains(&row) || (14..=15).contains(&row) || (21..=22).contains(&row);
        let in_doorway_col = (5..=6).contains(&col)
            || (15..=16).contains(&col)
            || (24..=25).contains(&col)
            || (34..=35).contains(&col);
        if (col == 10 || col == 20 || col == 30) && !in_doorway_row {
            TileKind::Solid
        } else if (row == 10 || row == 20) && !in_doorway_col {
            TileKind::Solid
        } else if matches!(col % 10, 5 | 6) && matches!(row % 10, 5 | 6) {
            TileKind::Breakable
        } else {
            TileKind::Empty
        }
    });
    let cells = scale_layout(&base, COLS, ROWS, GRID_COLS, GRID_ROWS);
    let spawn_points = scale_spawn_points(
        &[(84, 84), (468, 84), (852, 84), (84, 372), (804, 372), (84, 660), (852, 660)],
        (COLS, ROWS, 24),
        (GRID_COLS, GRID_ROWS, GRID_CELL),
    );
    MapDef::from_cells("labyrinth", "Labyrinth", GRID_COLS, GRID_ROWS, GRID_CELL, spawn_points, &cells)
}

/// The built-in map catalog, in menu order.
#[must_use]
pub fn builtin_maps() -> Vec<MapDef> {
    vec![fortress(), arena(), bunker(), crucible(), gridlock(), labyrinth()]
}
