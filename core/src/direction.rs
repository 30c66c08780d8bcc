//! The four move directions and how a move walks the grid for each.

use crate::EngineError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The four possible move directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Direction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Direction {
    /// Get all four directions in `[Up, Down, Left, Right]` order.
    pub fn all() -> [Direction; 4] {
        [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ]
    }

    /// Unit step `(dr, dc)` a tile takes when moving this way.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    /// Cells of a `size`x`size` grid ordered so that those farthest along the
    /// direction of travel come first.
    ///
    /// A tile is always visited after every tile standing between it and the
    /// edge it slides towards, so nothing that already moved in this pass is
    /// examined again as a source.
    pub fn traversal(self, size: usize) -> impl Iterator<Item = (usize, usize)> {
        let (dr, dc) = self.delta();
        let rows = axis_order(dr, size);
        let cols = axis_order(dc, size);
        rows.flat_map(move |row| cols.clone().map(move |col| (row, col)))
    }

    /// One step from `(row, col)`, or `None` if it would leave the grid.
    pub(crate) fn step(self, row: usize, col: usize, size: usize) -> Option<(usize, usize)> {
        let (dr, dc) = self.delta();
        let row = row.checked_add_signed(dr).filter(|&r| r < size)?;
        let col = col.checked_add_signed(dc).filter(|&c| c < size)?;
        Some((row, col))
    }
}

/// Index order along one axis: descending when travel is positive.
fn axis_order(step: isize, size: usize) -> AxisOrder {
    if step > 0 {
        AxisOrder::Descending(size)
    } else {
        AxisOrder::Ascending(0, size)
    }
}

#[derive(Clone)]
enum AxisOrder {
    Ascending(usize, usize),
    Descending(usize),
}

impl Iterator for AxisOrder {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            AxisOrder::Ascending(next, end) => {
                if next < end {
                    *next += 1;
                    Some(*next - 1)
                } else {
                    None
                }
            }
            AxisOrder::Descending(remaining) => {
                *remaining = remaining.checked_sub(1)?;
                Some(*remaining)
            }
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = EngineError;

    /// 0=Up, 1=Down, 2=Left, 3=Right.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Direction::Up),
            1 => Ok(Direction::Down),
            2 => Ok(Direction::Left),
            3 => Ok(Direction::Right),
            other => Err(EngineError::InvalidDirection(other.to_string())),
        }
    }
}

impl FromStr for Direction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(EngineError::InvalidDirection(s.to_string())),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}
