//! Tile spawning with pluggable randomness.

use crate::{EngineError, GridState};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

/// Chance that a spawned tile is a 4 rather than a 2.
pub const FOUR_PROBABILITY: f32 = 0.1;

/// A tile placed by [`spawn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Spawn {
    pub row: usize,
    pub col: usize,
    pub value: u32,
}

/// Source of the two random choices a spawn needs.
///
/// Implement this to script spawns in tests or replays.
pub trait Spawner {
    /// Pick an index in `0..count`. `count` is never 0.
    fn pick_index(&mut self, count: usize) -> usize;

    /// Pick the value of the new tile: 2 or 4.
    fn pick_value(&mut self) -> u32;
}

/// The standard spawner: uniform cell choice, 2 with p=0.9 and 4 with p=0.1.
#[derive(Debug, Clone)]
pub struct RandomSpawner<R = SmallRng> {
    rng: R,
}

impl RandomSpawner<SmallRng> {
    /// Deterministic spawner seeded from `seed`.
    pub fn seeded(seed: u64) -> Self {
        RandomSpawner {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RandomSpawner<R> {
    /// Wrap an existing RNG.
    pub fn from_rng(rng: R) -> Self {
        RandomSpawner { rng }
    }
}

impl<R: Rng> Spawner for RandomSpawner<R> {
    fn pick_index(&mut self, count: usize) -> usize {
        self.rng.gen_range(0..count)
    }

    fn pick_value(&mut self) -> u32 {
        if self.rng.gen::<f32>() < FOUR_PROBABILITY {
            4
        } else {
            2
        }
    }
}

/// Place one new tile in a random empty cell of `grid`.
///
/// Returns `Ok(None)` without touching the grid when it is full. An error
/// only surfaces if the spawner breaks its contract (an index past the end,
/// or a value other than 2 or 4).
pub fn spawn<S: Spawner + ?Sized>(
    grid: &mut GridState,
    spawner: &mut S,
) -> Result<Option<Spawn>, EngineError> {
    let count = grid.empty_count();
    if count == 0 {
        return Ok(None);
    }

    let index = spawner.pick_index(count);
    let (row, col) = grid
        .empty_cells()
        .nth(index)
        .ok_or(EngineError::InvalidSpawnIndex { index, count })?;
    let value = spawner.pick_value();
    if value != 2 && value != 4 {
        return Err(EngineError::InvalidValue(value));
    }
    grid.set_cell(row, col, value)?;

    debug!(row, col, value, "spawned tile");
    Ok(Some(Spawn { row, col, value }))
}
