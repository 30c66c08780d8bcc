//! The move engine: slides and merges every tile of a grid in one direction.
//!
//! One routine serves all four directions. A direction contributes a unit step
//! `(dr, dc)` and a traversal order that visits the tiles nearest the target
//! edge first; each tile is then walked step by step until it hits the edge,
//! a different tile, or an equal tile it merges into.

use crate::grid::can_merge;
use crate::{Direction, GridState};
use serde::Serialize;
use tracing::{debug, instrument, trace};

/// Net displacement of one tile during a move.
///
/// For a merge, `to` is the cell the tile merged into, which now holds the
/// doubled value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MoveRecord {
    pub from_row: usize,
    pub from_col: usize,
    pub to_row: usize,
    pub to_col: usize,
    /// Whether the tile combined with another.
    pub merged: bool,
}

/// Everything a single move produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The grid after sliding and merging, score already updated.
    pub grid: GridState,
    /// One record per tile that moved or merged, in processing order.
    pub records: Vec<MoveRecord>,
    /// Points earned from merges in this move.
    pub score_delta: u64,
    /// Whether any tile moved.
    pub moved: bool,
}

impl MoveOutcome {
    /// Number of merges performed.
    pub fn merges(&self) -> usize {
        self.records.iter().filter(|r| r.merged).count()
    }
}

/// Apply `direction` to `grid` and return the resulting state.
///
/// The input grid is left untouched. A cell that received a merge during this
/// call never accepts a second one, so `[2, 2, 2, 2]` moved left becomes
/// `[4, 4, 0, 0]`.
///
/// ```rust
/// use tile_merge_core::{apply_move, Direction, GridState};
///
/// let grid = GridState::from_rows(&[[2, 2, 4, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
/// let outcome = apply_move(&grid, Direction::Left);
/// assert_eq!(&outcome.grid.cells()[..4], &[4, 4, 0, 0]);
/// assert_eq!(outcome.score_delta, 4);
/// ```
#[instrument(level = "debug", skip(grid), fields(size = grid.size()))]
pub fn apply_move(grid: &GridState, direction: Direction) -> MoveOutcome {
    let size = grid.size();
    let mut next = grid.clone();
    let mut merged_into = vec![false; size * size];
    let mut records = Vec::new();
    let mut score_delta = 0u64;

    for (row, col) in direction.traversal(size) {
        if next.raw(row, col) == 0 {
            continue;
        }
        let (to_row, to_col, merged) = slide_tile(&mut next, &mut merged_into, direction, row, col);
        if merged {
            let value = next.raw(to_row, to_col);
            trace!(row, col, to_row, to_col, value, "merged");
            score_delta += u64::from(value);
        }
        if merged || (to_row, to_col) != (row, col) {
            records.push(MoveRecord {
                from_row: row,
                from_col: col,
                to_row,
                to_col,
                merged,
            });
        }
    }

    next.add_score(score_delta);
    let moved = !records.is_empty();
    debug!(moved, tiles = records.len(), score_delta, "move applied");

    MoveOutcome {
        grid: next,
        records,
        score_delta,
        moved,
    }
}

/// Walk the tile at `(row, col)` as far as it goes, returning its final cell
/// and whether it merged.
fn slide_tile(
    grid: &mut GridState,
    merged_into: &mut [bool],
    direction: Direction,
    row: usize,
    col: usize,
) -> (usize, usize, bool) {
    let size = grid.size();
    let (mut cur_row, mut cur_col) = (row, col);

    while let Some((next_row, next_col)) = direction.step(cur_row, cur_col, size) {
        let value = grid.raw(cur_row, cur_col);
        let target = grid.raw(next_row, next_col);

        if target == 0 {
            grid.put_raw(next_row, next_col, value);
            grid.put_raw(cur_row, cur_col, 0);
            cur_row = next_row;
            cur_col = next_col;
            continue;
        }

        let idx = next_row * size + next_col;
        if can_merge(value, target) && !merged_into[idx] {
            grid.put_raw(next_row, next_col, value * 2);
            grid.put_raw(cur_row, cur_col, 0);
            merged_into[idx] = true;
            return (next_row, next_col, true);
        }
        break;
    }

    (cur_row, cur_col, false)
}

/// Whether `direction` would change `grid`.
pub fn can_move(grid: &GridState, direction: Direction) -> bool {
    let size = grid.size();
    direction.traversal(size).any(|(row, col)| {
        let value = grid.raw(row, col);
        value != 0
            && direction
                .step(row, col, size)
                .map(|(r, c)| grid.raw(r, c))
                .is_some_and(|next| next == 0 || can_merge(value, next))
    })
}

/// Which moves are legal, as `[Up, Down, Left, Right]`.
pub fn legal_directions(grid: &GridState) -> [bool; 4] {
    Direction::all().map(|dir| can_move(grid, dir))
}
