use serde::{Deserialize, Serialize};

/// Largest tile value the board can hold.
pub const MAX_TILE_VALUE: u32 = 32768;

/// Tile value that marks a won game.
pub const WINNING_TILE_VALUE: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

/// An occupied cell: a power-of-two value and where it sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub value: u32,
    pub position: Position,
}

impl Tile {
    pub fn new(value: u32, x: usize, y: usize) -> Self {
        Self {
            value,
            position: Position { x, y },
        }
    }

    /// Exponent of the tile value (`2 -> 1`, `2048 -> 11`).
    pub fn rank(&self) -> u32 {
        value_rank(self.value)
    }
}

/// `log2(value)` for a tile value, `0` for an empty cell.
pub fn value_rank(value: u32) -> u32 {
    if value == 0 {
        0
    } else {
        value.trailing_zeros()
    }
}

pub fn is_valid_tile_value(value: u32) -> bool {
    value >= 2 && value <= MAX_TILE_VALUE && value.is_power_of_two()
}
