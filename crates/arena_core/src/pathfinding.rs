//! Grid-based pathfinding using A* algorithm.
//!
//! All calculations use fixed-point math for deterministic results
//! across different platforms and clients. Work buffers live in a
//! [`PathScratch`] that callers keep around between searches, so a
//! search allocates nothing once the buffers have grown to the grid size.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::grid::TileGrid;
use crate::math::{Fixed, Vec2Fixed, SQRT_2};

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    f_score: Fixed,
    h_score: Fixed,
    /// Row-major cell index, last tie-breaker.
    index: usize,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse every comparison so the lowest
        // f, then lowest h, then lowest index pops first.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.h_score.cmp(&self.h_score))
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Direction offsets for 8-directional movement.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),   // East
    (1, 1),   // Southeast
    (0, 1),   // South
    (-1, 1),  // Southwest
    (-1, 0),  // West
    (-1, -1), // Northwest
    (0, -1),  // North
    (1, -1),  // Northeast
];

/// Octile distance heuristic (exact for 8-directional movement on an open grid).
#[inline]
fn octile_heuristic(col: i32, row: i32, goal_col: i32, goal_row: i32) -> Fixed {
    let dx = col.abs_diff(goal_col);
    let dy = row.abs_diff(goal_row);
    let (long, short) = if dx > dy { (dx, dy) } else { (dy, dx) };
    Fixed::from_num(long - short) + SQRT_2 * Fixed::from_num(short)
}

/// Check if a diagonal move is valid (no corner cutting through walls).
#[inline]
fn is_diagonal_valid(grid: &TileGrid, col: i32, row: i32, dx: i32, dy: i32) -> bool {
    if dx != 0 && dy != 0 {
        grid.is_passable(col + dx, row) && grid.is_passable(col, row + dy)
    } else {
        true
    }
}

/// Reusable A* work buffers.
///
/// `g`, `parent` and the two generation stamps are indexed by cell. A cell's
/// entries are valid only when its stamp equals the current generation, so a
/// new search just bumps the generation instead of clearing the arrays.
#[derive(Debug, Clone, Default)]
pub struct PathScratch {
    g_score: Vec<Fixed>,
    parent: Vec<usize>,
    seen: Vec<u32>,
    closed: Vec<u32>,
    generation: u32,
    open_set: BinaryHeap<AStarNode>,
    raw_path: Vec<Vec2Fixed>,
}

impl PathScratch {
    /// Create empty buffers. They grow to the grid size on first use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn prepare(&mut self, cells: usize) {
        if self.g_score.len() != cells {
            self.g_score = vec![Fixed::ZERO; cells];
            self.parent = vec![0; cells];
            self.seen = vec![0; cells];
            self.closed = vec![0; cells];
            self.generation = 0;
        }
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.seen.fill(0);
            self.closed.fill(0);
            self.generation = 1;
        }
        self.open_set.clear();
        self.raw_path.clear();
    }

    /// Find a path between two world positions.
    ///
    /// Returns `None` when the destination cell is out of range, not empty,
    /// or unreachable. Returns `Some(vec![])` when start and destination
    /// share a cell. Otherwise returns smoothed waypoints (cell centers),
    /// excluding the start cell and ending at the destination cell center.
    pub fn find_path(
        &mut self,
        grid: &TileGrid,
        start: Vec2Fixed,
        goal: Vec2Fixed,
    ) -> Option<Vec<Vec2Fixed>> {
        let (goal_col, goal_row) = grid.world_to_cell(goal);
        let goal_index = grid.index(goal_col, goal_row)?;
        if !grid.cells()[goal_index].is_empty() {
            return None;
        }

        let (start_col, start_row) = grid.cell_at_clamped(start);
        let start_index = grid.index(start_col, start_row)?;
        if start_index == goal_index {
            return Some(Vec::new());
        }

        self.prepare(grid.len());
        let generation = self.generation;

        self.g_score[start_index] = Fixed::ZERO;
        self.parent[start_index] = start_index;
        self.seen[start_index] = generation;
        let start_h = octile_heuristic(start_col, start_row, goal_col, goal_row);
        self.open_set.push(AStarNode {
            f_score: start_h,
            h_score: start_h,
            index: start_index,
        });

        while let Some(current) = self.open_set.pop() {
            if self.closed[current.index] == generation {
                continue;
            }
            self.closed[current.index] = generation;

            if current.index == goal_index {
                return Some(self.reconstruct(grid, start_index, goal_index));
            }

            let (col, row) = grid.coords(current.index);
            let current_g = self.g_score[current.index];

            for &(dx, dy) in &DIRECTIONS {
                let ncol = col + dx;
                let nrow = row + dy;
                if !grid.is_passable(ncol, nrow) {
                    continue;
                }
                if !is_diagonal_valid(grid, col, row, dx, dy) {
                    continue;
                }
                let Some(neighbor) = grid.index(ncol, nrow) else {
                    continue;
                };
                if self.closed[neighbor] == generation {
                    continue;
                }

                let move_cost = if dx != 0 && dy != 0 {
                    SQRT_2
                } else {
                    Fixed::ONE
                };
                let tentative_g = current_g + move_cost;

                if self.seen[neighbor] != generation || tentative_g < self.g_score[neighbor] {
                    self.seen[neighbor] = generation;
                    self.g_score[neighbor] = tentative_g;
                    self.parent[neighbor] = current.index;

                    let h = octile_heuristic(ncol, nrow, goal_col, goal_row);
                    self.open_set.push(AStarNode {
                        f_score: tentative_g + h,
                        h_score: h,
                        index: neighbor,
                    });
                }
            }
        }

        None
    }

    /// Walk parents back from the goal, smooth, and drop the start center.
    fn reconstruct(&mut self, grid: &TileGrid, start: usize, goal: usize) -> Vec<Vec2Fixed> {
        let mut current = goal;
        loop {
            let (col, row) = grid.coords(current);
            self.raw_path.push(grid.cell_center(col, row));
            if current == start {
                break;
            }
            current = self.parent[current];
        }
        self.raw_path.reverse();

        let mut smoothed = smooth_path(grid, &self.raw_path);
        if !smoothed.is_empty() {
            smoothed.remove(0);
        }
        smoothed
    }
}

/// Smooth a path by removing unnecessary waypoints.
///
/// From the current waypoint, jumps to the furthest later waypoint that is
/// in line of sight; repeats until the end.
#[must_use]
pub fn smooth_path(grid: &TileGrid, path: &[Vec2Fixed]) -> Vec<Vec2Fixed> {
    if path.len() <= 2 {
        return path.to_vec();
    }

    let mut smoothed = Vec::with_capacity(path.len());
    smoothed.push(path[0]);

    let mut current_idx = 0;

    while current_idx < path.len() - 1 {
        let mut furthest_visible = current_idx + 1;

        for check_idx in (current_idx + 2)..path.len() {
            if grid.has_line_of_sight(path[current_idx], path[check_idx]) {
                furthest_visible = check_idx;
            }
        }

        smoothed.push(path[furthest_visible]);
        current_idx = furthest_visible;
    }

    smoothed
}
