//! Hypothetical and live move application.
//!
//! `apply_move` never touches its input: it works on a copy and reports what
//! the move would do. `play_move` is the live counterpart used during
//! self-play, which also spawns the next tile.

use crate::game::direction::Direction;
use crate::game::game_state::GameState;
use crate::game::grid::CELL_COUNT;
use crate::game::rules::GameRules;
use crate::game::tile::value_rank;
use rand::RngCore;

/// Network input: one `log2(value)` per cell, row-major, `0.0` for empty.
pub type EncodedState = [f32; CELL_COUNT];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub direction: Direction,
    pub state: GameState,
    /// True iff any cell differs from the input grid.
    pub was_moved: bool,
    pub score_delta: u64,
}

/// Apply `direction` to a copy of `state` without spawning a new tile.
///
/// The result's `over` flag tells whether the slid grid has any move left.
/// Calling this on a terminated state is a caller error.
pub fn apply_move<R: GameRules + ?Sized>(
    state: &GameState,
    direction: Direction,
    rules: &R,
) -> MoveOutcome {
    let slide = rules.slide(&state.grid, direction);
    let was_moved = !slide.grid.values_equal(&state.grid);

    let mut next = state.clone();
    next.grid = slide.grid;
    next.score += slide.score_gained;
    if slide.merged_max >= rules.winning_value() {
        next.won = true;
    }
    next.over = !rules.moves_available(&next.grid);

    MoveOutcome {
        direction,
        state: next,
        was_moved,
        score_delta: slide.score_gained,
    }
}

/// Play `direction` on the live game: slide, spawn a tile when the grid
/// changed, then refresh the terminal flag. Returns the move outcome
/// describing the post-spawn state.
pub fn play_move<R: GameRules + ?Sized>(
    state: &mut GameState,
    direction: Direction,
    rules: &R,
    rng: &mut dyn RngCore,
) -> MoveOutcome {
    let mut outcome = apply_move(state, direction, rules);
    if outcome.was_moved {
        rules.spawn_tile(&mut outcome.state.grid, rng);
        outcome.state.over = !rules.moves_available(&outcome.state.grid);
    }
    *state = outcome.state.clone();

    let hooks = rules.hooks();
    (hooks.on_actuate)(state);
    if state.over {
        (hooks.on_game_over)(state);
    }
    outcome
}

/// Directions that change the grid, in index order.
pub fn valid_moves<R: GameRules + ?Sized>(state: &GameState, rules: &R) -> Vec<Direction> {
    Direction::ALL
        .into_iter()
        .filter(|&direction| apply_move(state, direction, rules).was_moved)
        .collect()
}

/// `log2` encoding of every cell. Persisted weights depend on this layout.
pub fn encode_state(state: &GameState) -> EncodedState {
    let mut encoded = [0.0f32; CELL_COUNT];
    for (slot, value) in encoded.iter_mut().zip(state.grid.values()) {
        *slot = value_rank(value) as f32;
    }
    encoded
}
