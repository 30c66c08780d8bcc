//! Contract errors raised by the grid and move engine.

/// A caller broke the engine's contract.
///
/// None of these are transient: they signal a defect at the call site and are
/// reported synchronously, never retried.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum EngineError {
    /// A coordinate fell outside `[0, size)`.
    #[display("cell ({row}, {col}) is outside a {size}x{size} grid")]
    OutOfBounds { row: usize, col: usize, size: usize },

    /// A cell value that is neither 0 nor a power of two >= 2.
    #[display("{_0} is not a valid tile value")]
    InvalidValue(u32),

    /// Input that does not name one of the four directions.
    #[display("unknown direction {_0:?}")]
    InvalidDirection(String),

    /// A spawner picked an index outside the empty cells it was offered.
    #[display("spawn index {index} out of range for {count} empty cells")]
    InvalidSpawnIndex { index: usize, count: usize },

    /// A grid must have at least one row and column.
    #[display("grid size must be at least 1, got {_0}")]
    InvalidSize(usize),

    /// Fixture rows do not form a square matrix.
    #[display("rows do not form a square grid")]
    RaggedRows,
}

impl std::error::Error for EngineError {}

/// Returns true if `value` may be stored in a cell.
pub(crate) fn is_valid_tile(value: u32) -> bool {
    value == 0 || (value >= 2 && value.is_power_of_two())
}
