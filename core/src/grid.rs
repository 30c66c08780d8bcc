//! Grid state: the tile matrix and the running score.

use crate::error::is_valid_tile;
use crate::EngineError;
use serde::Serialize;
use tracing::{instrument, trace};

/// Default side length of a grid.
pub const DEFAULT_SIZE: usize = 4;

/// An N×N grid of tiles plus the cumulative score.
///
/// Cells are stored as a flat vector in row-major order: indices `0..size` are
/// row 0, `size..2*size` are row 1, and so on. Empty cells are 0; every other
/// cell holds a power of two >= 2.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GridState {
    size: usize,
    cells: Vec<u32>,
    score: u64,
}

impl GridState {
    /// Create an empty grid with score 0.
    pub fn new(size: usize) -> Result<Self, EngineError> {
        if size == 0 {
            return Err(EngineError::InvalidSize(size));
        }
        Ok(GridState {
            size,
            cells: vec![0; size * size],
            score: 0,
        })
    }

    /// Build a grid from explicit rows, validating shape and every value.
    ///
    /// ```rust
    /// use tile_merge_core::GridState;
    ///
    /// let grid = GridState::from_rows(&[[2, 0], [0, 4]]).unwrap();
    /// assert_eq!(grid.cell_at(1, 1), Ok(4));
    /// ```
    pub fn from_rows<const N: usize>(rows: &[[u32; N]]) -> Result<Self, EngineError> {
        let mut grid = GridState::new(rows.len())?;
        for (row, values) in rows.iter().enumerate() {
            if N != grid.size {
                return Err(EngineError::RaggedRows);
            }
            for (col, &value) in values.iter().enumerate() {
                grid.set_cell(row, col, value)?;
            }
        }
        Ok(grid)
    }

    /// Side length of the grid.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Cumulative score.
    pub fn score(&self) -> u64 {
        self.score
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// Iterate over the rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.cells.chunks(self.size)
    }

    /// Value at `(row, col)`.
    pub fn cell_at(&self, row: usize, col: usize) -> Result<u32, EngineError> {
        self.index(row, col).map(|idx| self.cells[idx])
    }

    /// Store `value` at `(row, col)`. The value must be 0 or a power of two >= 2.
    pub fn set_cell(&mut self, row: usize, col: usize, value: u32) -> Result<(), EngineError> {
        let idx = self.index(row, col)?;
        if !is_valid_tile(value) {
            return Err(EngineError::InvalidValue(value));
        }
        self.cells[idx] = value;
        Ok(())
    }

    /// Empty cells in row-major order.
    ///
    /// The iterator is lazy; call again to restart the enumeration.
    pub fn empty_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 0)
            .map(move |(i, _)| (i / size, i % size))
    }

    /// Number of empty cells.
    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v == 0).count()
    }

    /// Number of occupied cells.
    pub fn tile_count(&self) -> usize {
        self.cells.len() - self.empty_count()
    }

    /// Largest tile on the grid, 0 if empty.
    pub fn max_tile(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// True when the grid is full and no two row- or column-adjacent cells
    /// are equal, i.e. no move in any direction can change it.
    ///
    /// Each cell is compared with its right and down neighbours only; the left
    /// and up pairs were already covered when the sweep visited those cells.
    #[instrument(level = "trace", skip(self), fields(size = self.size))]
    pub fn is_terminal(&self) -> bool {
        let n = self.size;
        for row in 0..n {
            for col in 0..n {
                let value = self.cells[row * n + col];
                if value == 0 {
                    return false;
                }
                if col + 1 < n && can_merge(value, self.cells[row * n + col + 1]) {
                    return false;
                }
                if row + 1 < n && can_merge(value, self.cells[(row + 1) * n + col]) {
                    return false;
                }
            }
        }
        true
    }

    /// Clear every cell and zero the score.
    pub fn reset(&mut self) {
        trace!(size = self.size, "resetting grid");
        self.cells.fill(0);
        self.score = 0;
    }

    pub(crate) fn add_score(&mut self, points: u64) {
        self.score += points;
    }

    #[cfg(test)]
    pub(crate) fn with_score(mut self, score: u64) -> Self {
        self.score = score;
        self
    }

    pub(crate) fn raw(&self, row: usize, col: usize) -> u32 {
        self.cells[row * self.size + col]
    }

    pub(crate) fn put_raw(&mut self, row: usize, col: usize, value: u32) {
        self.cells[row * self.size + col] = value;
    }

    fn index(&self, row: usize, col: usize) -> Result<usize, EngineError> {
        if row >= self.size || col >= self.size {
            return Err(EngineError::OutOfBounds {
                row,
                col,
                size: self.size,
            });
        }
        Ok(row * self.size + col)
    }
}

/// Whether two non-empty tiles combine. The largest u32 power of two cannot
/// double, so a pair of those never merges.
pub(crate) fn can_merge(a: u32, b: u32) -> bool {
    a != 0 && a == b && a.checked_mul(2).is_some()
}

impl Default for GridState {
    fn default() -> Self {
        GridState {
            size: DEFAULT_SIZE,
            cells: vec![0; DEFAULT_SIZE * DEFAULT_SIZE],
            score: 0,
        }
    }
}

impl std::fmt::Debug for GridState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "GridState {{ size: {}, score: {} }}", self.size, self.score)?;
        for row in self.rows() {
            for &val in row {
                if val == 0 {
                    write!(f, "    .")?;
                } else {
                    write!(f, "{:5}", val)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for GridState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let border = format!("+{}", "------+".repeat(self.size));
        writeln!(f, "Score: {}", self.score)?;
        writeln!(f, "{}", border)?;
        for row in self.rows() {
            write!(f, "|")?;
            for &val in row {
                if val == 0 {
                    write!(f, "      |")?;
                } else {
                    write!(f, "{:^6}|", val)?;
                }
            }
            writeln!(f)?;
            writeln!(f, "{}", border)?;
        }
        Ok(())
    }
}
