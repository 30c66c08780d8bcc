//! # Tile Merge Core Engine
//!
//! Rules of a sliding-tile merge puzzle on an N×N grid: tiles slide in one of
//! four directions, equal neighbours merge into their sum, a new 2 or 4 spawns
//! after every move that changed something, and the game ends when the grid is
//! full with no adjacent equal tiles.
//!
//! The engine is synchronous and owns no global state. Randomness comes from
//! an injectable [`Spawner`], seedable for reproducible games.
//!
//! ## Example
//!
//! ```rust
//! use tile_merge_core::{Direction, Game};
//!
//! let mut game = Game::initialize(4, 42).unwrap();  // 4x4 grid, seed 42
//! let transition = game.handle_direction(Direction::Left).unwrap();
//! println!("Score: {}, Moved: {}", game.score(), transition.moved);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

mod direction;
mod engine;
mod error;
mod grid;
mod spawner;

pub use direction::Direction;
pub use engine::{apply_move, can_move, legal_directions, MoveOutcome, MoveRecord};
pub use error::EngineError;
pub use grid::{GridState, DEFAULT_SIZE};
pub use spawner::{spawn, RandomSpawner, Spawn, Spawner, FOUR_PROBABILITY};

/// Number of tiles placed on a fresh grid.
const INITIAL_TILES: usize = 2;

/// Settings for a new game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Side length of the grid.
    pub size: usize,
    /// Seed for the default spawner.
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            size: DEFAULT_SIZE,
            seed: 42,
        }
    }
}

/// Result of handling one direction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// Whether any tile moved (and therefore a tile was spawned).
    pub moved: bool,
    /// Per-tile movements, in the order they were processed.
    pub records: Vec<MoveRecord>,
    /// Points earned from merges in this move.
    pub score_delta: u64,
    /// The tile spawned after the move, if any.
    pub spawned: Option<Spawn>,
    /// Whether the game is over (no legal moves remaining).
    pub game_over: bool,
}

/// A game in progress: one grid plus the spawner that feeds it.
///
/// Each game exclusively owns its state; independent games share nothing.
#[derive(Clone)]
pub struct Game<S = RandomSpawner> {
    grid: GridState,
    spawner: S,
}

impl Game<RandomSpawner> {
    /// Create a game from `config` with the default seeded spawner.
    ///
    /// The grid starts with two random tiles (90% chance of 2, 10% chance of 4).
    pub fn new(config: GameConfig) -> Result<Self, EngineError> {
        Game::with_spawner(config.size, RandomSpawner::seeded(config.seed))
    }

    /// Shorthand for [`Game::new`] with an explicit size and seed.
    pub fn initialize(size: usize, seed: u64) -> Result<Self, EngineError> {
        Game::new(GameConfig { size, seed })
    }

    /// Reset the game and reseed the spawner.
    ///
    /// Resetting twice with the same seed yields the same opening position.
    pub fn reset_with_seed(&mut self, seed: u64) -> Result<(), EngineError> {
        self.spawner = RandomSpawner::seeded(seed);
        self.reset()
    }
}

impl<S: Spawner> Game<S> {
    /// Create a game whose spawns come from `spawner`.
    pub fn with_spawner(size: usize, spawner: S) -> Result<Self, EngineError> {
        let mut game = Game {
            grid: GridState::new(size)?,
            spawner,
        };
        populate(&mut game.grid, &mut game.spawner)?;
        info!(size, "new game");
        Ok(game)
    }

    /// Clear the grid and score, then place the opening tiles again.
    ///
    /// The grid keeps its size and the spawner continues its sequence. On
    /// error the previous game is left untouched.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        let mut fresh = self.grid.clone();
        fresh.reset();
        populate(&mut fresh, &mut self.spawner)?;
        self.grid = fresh;
        info!(size = self.grid.size(), "game reset");
        Ok(())
    }

    /// Handle one direction input: move, spawn if anything moved, then check
    /// for game over.
    ///
    /// The returned transition reflects the fully updated state. Once the game
    /// is over, further inputs change nothing and report `game_over`.
    #[instrument(skip(self), fields(score = self.grid.score()))]
    pub fn handle_direction(&mut self, direction: Direction) -> Result<Transition, EngineError> {
        if self.grid.is_terminal() {
            return Ok(Transition {
                moved: false,
                records: Vec::new(),
                score_delta: 0,
                spawned: None,
                game_over: true,
            });
        }

        let MoveOutcome {
            grid: mut next,
            records,
            score_delta,
            moved,
        } = apply_move(&self.grid, direction);
        // Commit only once the spawn has succeeded.
        let spawned = if moved {
            let spawned = spawn(&mut next, &mut self.spawner)?;
            self.grid = next;
            spawned
        } else {
            None
        };

        let game_over = self.grid.is_terminal();
        if game_over {
            info!(
                score = self.grid.score(),
                max_tile = self.grid.max_tile(),
                "game over"
            );
        } else {
            debug!(moved, score_delta, "turn complete");
        }

        Ok(Transition {
            moved,
            records,
            score_delta,
            spawned,
            game_over,
        })
    }

    /// Check if the game is over (no legal moves available).
    pub fn is_over(&self) -> bool {
        self.grid.is_terminal()
    }

    /// Get the legal directions as a boolean array [Up, Down, Left, Right].
    ///
    /// A direction is legal if it would change the grid.
    pub fn legal_directions(&self) -> [bool; 4] {
        legal_directions(&self.grid)
    }

    /// The current grid.
    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    /// Get the current score.
    pub fn score(&self) -> u64 {
        self.grid.score()
    }

    /// Get the maximum tile value on the grid.
    pub fn max_tile(&self) -> u32 {
        self.grid.max_tile()
    }

}

fn populate<S: Spawner>(grid: &mut GridState, spawner: &mut S) -> Result<(), EngineError> {
    for _ in 0..INITIAL_TILES {
        spawn(grid, spawner)?;
    }
    Ok(())
}

impl<S> std::fmt::Debug for Game<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Game {{ score: {}, over: {} }}",
            self.grid.score(),
            self.grid.is_terminal()
        )?;
        write!(f, "{:?}", self.grid)
    }
}

impl<S> std::fmt::Display for Game<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.grid)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Always fills the first empty cell with the same value.
    struct FirstEmpty(u32);

    impl Spawner for FirstEmpty {
        fn pick_index(&mut self, _count: usize) -> usize {
            0
        }

        fn pick_value(&mut self) -> u32 {
            self.0
        }
    }

    fn game_with(rows: [[u32; 4]; 4], spawner: FirstEmpty) -> Game<FirstEmpty> {
        Game {
            grid: GridState::from_rows(&rows).unwrap(),
            spawner,
        }
    }

    // -------------------------------------------------------------------------
    // Initialization
    // -------------------------------------------------------------------------

    #[test]
    fn test_new_game_has_two_tiles() {
        let game = Game::initialize(4, 42).unwrap();
        assert_eq!(game.grid().tile_count(), 2);
        assert_eq!(game.score(), 0);
        assert!(!game.is_over());
    }

    #[test]
    fn test_custom_size() {
        let game = Game::initialize(6, 1).unwrap();
        assert_eq!(game.grid().size(), 6);
        assert_eq!(game.grid().tile_count(), 2);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(
            Game::initialize(0, 1),
            Err(EngineError::InvalidSize(0))
        ));
    }

    #[test]
    fn test_one_by_one_game_fills_single_cell() {
        let game = Game::initialize(1, 3).unwrap();
        assert_eq!(game.grid().tile_count(), 1);
        assert!(game.is_over());
    }

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();
        assert_eq!(config.size, 4);
        let game = Game::new(config).unwrap();
        assert_eq!(game.grid().size(), 4);
    }

    #[test]
    fn test_seed_determinism() {
        let game1 = Game::initialize(4, 12345).unwrap();
        let game2 = Game::initialize(4, 12345).unwrap();
        assert_eq!(game1.grid(), game2.grid());
    }

    #[test]
    fn test_step_determinism() {
        let mut game1 = Game::initialize(4, 54321).unwrap();
        let mut game2 = Game::initialize(4, 54321).unwrap();

        for dir in [Direction::Left, Direction::Up, Direction::Right, Direction::Down] {
            let t1 = game1.handle_direction(dir).unwrap();
            let t2 = game2.handle_direction(dir).unwrap();
            assert_eq!(t1, t2);
            assert_eq!(game1.grid(), game2.grid());
        }
    }

    // -------------------------------------------------------------------------
    // Turn sequencing
    // -------------------------------------------------------------------------

    #[test]
    fn test_move_then_spawn() {
        let mut game = game_with(
            [[2, 2, 4, 0], [0; 4], [0; 4], [0; 4]],
            FirstEmpty(2),
        );
        let transition = game.handle_direction(Direction::Left).unwrap();

        assert!(transition.moved);
        assert_eq!(transition.score_delta, 4);
        assert_eq!(
            transition.spawned,
            Some(Spawn {
                row: 0,
                col: 2,
                value: 2
            })
        );
        assert!(!transition.game_over);
        assert_eq!(&game.grid().cells()[..4], &[4, 4, 2, 0]);
        assert_eq!(game.score(), 4);
    }

    #[test]
    fn test_no_move_no_spawn() {
        let rows = [[2, 0, 0, 0], [4, 0, 0, 0], [8, 0, 0, 0], [16, 0, 0, 0]];
        let mut game = game_with(rows, FirstEmpty(2));
        let before = game.grid().clone();

        let transition = game.handle_direction(Direction::Left).unwrap();
        assert!(!transition.moved);
        assert_eq!(transition.spawned, None);
        assert_eq!(transition.score_delta, 0);
        assert_eq!(game.grid(), &before);
    }

    #[test]
    fn test_last_move_ends_game() {
        let mut game = game_with(
            [[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 8, 8, 32]],
            FirstEmpty(2),
        );
        assert!(!game.is_over());

        let transition = game.handle_direction(Direction::Left).unwrap();
        assert!(transition.moved);
        assert_eq!(transition.score_delta, 16);
        assert_eq!(
            transition.spawned,
            Some(Spawn {
                row: 3,
                col: 3,
                value: 2
            })
        );
        assert_eq!(&game.grid().cells()[12..], &[4, 16, 32, 2]);
        assert!(transition.game_over);
        assert!(game.is_over());
    }

    #[test]
    fn test_spawner_contract_violation_leaves_game_untouched() {
        let mut game = game_with([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]], FirstEmpty(16));
        let before = game.grid().clone();

        let err = game.handle_direction(Direction::Left).unwrap_err();
        assert_eq!(err, EngineError::InvalidValue(16));
        assert_eq!(game.grid(), &before);
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_bad_spawn_index_leaves_game_untouched() {
        struct PastEnd;

        impl Spawner for PastEnd {
            fn pick_index(&mut self, _count: usize) -> usize {
                99
            }

            fn pick_value(&mut self) -> u32 {
                2
            }
        }

        let mut game = Game {
            grid: GridState::from_rows(&[[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap(),
            spawner: PastEnd,
        };
        let before = game.grid().clone();

        let err = game.handle_direction(Direction::Left).unwrap_err();
        assert_eq!(err, EngineError::InvalidSpawnIndex { index: 99, count: 15 });
        assert_eq!(game.grid(), &before);
        assert_eq!(&game.grid().cells()[..4], &[2, 2, 0, 0]);
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_failed_reset_keeps_previous_grid() {
        let mut game = game_with([[2, 4, 0, 0], [0; 4], [0; 4], [0; 4]], FirstEmpty(8));
        let before = game.grid().clone();
        assert_eq!(game.reset(), Err(EngineError::InvalidValue(8)));
        assert_eq!(game.grid(), &before);
    }

    #[test]
    fn test_input_after_game_over_is_ignored() {
        let rows = [[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]];
        let mut game = game_with(rows, FirstEmpty(2));
        assert!(game.is_over());
        assert_eq!(game.legal_directions(), [false; 4]);

        for dir in Direction::all() {
            let transition = game.handle_direction(dir).unwrap();
            assert!(!transition.moved);
            assert!(transition.game_over);
            assert!(transition.records.is_empty());
        }
    }

    // -------------------------------------------------------------------------
    // Reset
    // -------------------------------------------------------------------------

    #[test]
    fn test_reset_with_seed_matches_fresh_game() {
        let mut game = Game::initialize(4, 42).unwrap();
        for dir in [Direction::Left, Direction::Up, Direction::Right] {
            game.handle_direction(dir).unwrap();
        }

        game.reset_with_seed(42).unwrap();
        let fresh = Game::initialize(4, 42).unwrap();
        assert_eq!(game.grid(), fresh.grid());
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_reset_keeps_size() {
        let mut game = Game::initialize(5, 9).unwrap();
        game.handle_direction(Direction::Down).unwrap();
        game.reset().unwrap();
        assert_eq!(game.grid().size(), 5);
        assert_eq!(game.grid().tile_count(), 2);
        assert_eq!(game.score(), 0);
    }

    // -------------------------------------------------------------------------
    // Formatting and serialization
    // -------------------------------------------------------------------------

    #[test]
    fn test_display_format() {
        let game = Game::initialize(4, 42).unwrap();
        let display = format!("{}", game);
        assert!(display.contains("Score:"));
        assert!(display.contains("+------+"));
    }

    #[test]
    fn test_debug_format() {
        let game = Game::initialize(4, 42).unwrap();
        let debug = format!("{:?}", game);
        assert!(debug.contains("Game"));
        assert!(debug.contains("score"));
    }

    #[test]
    fn test_transition_serializes() {
        let mut game = game_with([[0, 0, 0, 2], [0; 4], [0; 4], [0; 4]], FirstEmpty(4));
        let transition = game.handle_direction(Direction::Left).unwrap();
        let json = serde_json::to_value(&transition).unwrap();
        assert_eq!(json["moved"], true);
        assert_eq!(json["records"][0]["from_col"], 3);
        assert_eq!(json["records"][0]["to_col"], 0);
        assert_eq!(json["spawned"]["value"], 4);
        assert_eq!(json["game_over"], false);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{"size": 5}"#).unwrap();
        assert_eq!(config, GameConfig { size: 5, seed: 42 });
    }
}
