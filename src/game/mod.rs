pub mod direction;
pub mod game_state;
pub mod grid;
pub mod rules;
pub mod simulator;
pub mod tile;

pub use direction::Direction;
pub use game_state::GameState;
pub use grid::{Grid, CELL_COUNT, GRID_SIZE};
pub use rules::{ClassicRules, GameRules, RulesHooks, SlideOutcome};
pub use simulator::{apply_move, encode_state, play_move, valid_moves, EncodedState, MoveOutcome};
pub use tile::{Position, Tile};
