use crate::game::grid::{Grid, GRID_SIZE};
use crate::game::rules::GameRules;
use crate::game::tile::value_rank;
use crate::Result;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Snapshot of a 2048 game as exchanged with the live game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub grid: Grid,
    #[serde(default)]
    pub score: u64,
    #[serde(default)]
    pub over: bool,
    #[serde(default)]
    pub won: bool,
    #[serde(default)]
    pub keep_playing: bool,
}

impl GameState {
    pub fn new(grid: Grid, score: u64) -> Self {
        Self {
            grid,
            score,
            over: false,
            won: false,
            keep_playing: true,
        }
    }

    /// Build a state from row-major values, deriving the terminal flag from `rules`.
    pub fn from_rows<R: GameRules + ?Sized>(
        rows: [[u32; GRID_SIZE]; GRID_SIZE],
        score: u64,
        rules: &R,
    ) -> Result<Self> {
        let grid = Grid::from_rows(rows)?;
        let mut state = Self::new(grid, score);
        state.over = !rules.moves_available(&state.grid);
        Ok(state)
    }

    /// Fresh game with the rules' start tiles.
    pub fn new_game<R: GameRules + ?Sized>(rules: &R, rng: &mut dyn RngCore) -> Self {
        let mut grid = Grid::empty();
        for _ in 0..rules.start_tiles() {
            rules.spawn_tile(&mut grid, rng);
        }
        Self::new(grid, 0)
    }

    /// Whether no further move should be played.
    pub fn is_terminated(&self) -> bool {
        self.over || (self.won && !self.keep_playing)
    }

    /// Largest tile value and its exponent.
    pub fn biggest_tile(&self) -> (u32, u32) {
        let value = self.grid.max_value();
        (value, value_rank(value))
    }
}
