use serde::{Deserialize, Serialize};

/// External key code of the left arrow key.
pub const KEY_LEFT: u32 = 37;
/// External key code of the up arrow key.
pub const KEY_UP: u32 = 38;
/// External key code of the right arrow key.
pub const KEY_RIGHT: u32 = 39;
/// External key code of the down arrow key.
pub const KEY_DOWN: u32 = 40;

/// One of the four sliding directions.
///
/// The discriminant is the internal action index used by every learning
/// structure (network outputs, transitions). The key code is what gets
/// relayed to the live game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Direction {
    /// All directions in internal index order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Direction> {
        Self::ALL.get(index).copied()
    }

    pub fn key_code(self) -> u32 {
        match self {
            Direction::Up => KEY_UP,
            Direction::Right => KEY_RIGHT,
            Direction::Down => KEY_DOWN,
            Direction::Left => KEY_LEFT,
        }
    }

    pub fn from_key_code(code: u32) -> Option<Direction> {
        match code {
            KEY_UP => Some(Direction::Up),
            KEY_RIGHT => Some(Direction::Right),
            KEY_DOWN => Some(Direction::Down),
            KEY_LEFT => Some(Direction::Left),
            _ => None,
        }
    }

    /// Unit vector `(dx, dy)` with `y` growing downwards.
    pub fn vector(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Up => "Up",
            Direction::Right => "Right",
            Direction::Down => "Down",
            Direction::Left => "Left",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
