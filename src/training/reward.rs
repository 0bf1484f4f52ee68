//! Reward shaping for self-play moves.
//!
//! Every shaping function compares the board before a move with the slid
//! board after it (before the new tile spawns). Invalid moves always earn
//! `INVALID_MOVE_PENALTY`, whatever the shaping.

use crate::game::game_state::GameState;
use crate::game::tile::Position;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const INVALID_MOVE_PENALTY: f32 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RewardShaping {
    /// +1 when merges reduced the tile count, 0 when unchanged, -1 otherwise.
    #[default]
    TileCount,
    /// +1 when the move scored.
    ScoreIncrease,
    /// +1 when some value group shrank, checking the biggest values first.
    Merge,
    /// +1/-1 when the number of equal tiles with no equal neighbour fell/rose.
    Adjacency,
    /// Relative drop of the mean distance between equal tiles.
    Distance,
}

impl RewardShaping {
    /// Reward for a valid move from `before` to `after`.
    pub fn reward(self, before: &GameState, after: &GameState) -> f32 {
        match self {
            RewardShaping::TileCount => tile_count_reward(before, after),
            RewardShaping::ScoreIncrease => {
                if after.score > before.score {
                    1.0
                } else {
                    0.0
                }
            }
            RewardShaping::Merge => merge_reward(before, after),
            RewardShaping::Adjacency => adjacency_reward(before, after),
            RewardShaping::Distance => distance_reward(before, after),
        }
    }

    /// Reward for an attempted move; `None` means the move was invalid.
    pub fn reward_for(self, before: &GameState, after: Option<&GameState>) -> f32 {
        match after {
            Some(after) => self.reward(before, after),
            None => INVALID_MOVE_PENALTY,
        }
    }
}

fn sign(delta: i64) -> f32 {
    match delta.cmp(&0) {
        std::cmp::Ordering::Greater => 1.0,
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Less => -1.0,
    }
}

fn tile_count_reward(before: &GameState, after: &GameState) -> f32 {
    let previous = before.grid.occupied_count() as i64;
    let current = after.grid.occupied_count() as i64;
    sign(previous - current)
}

fn grouped_by_value(state: &GameState) -> BTreeMap<u32, Vec<Position>> {
    let mut grouped: BTreeMap<u32, Vec<Position>> = BTreeMap::new();
    for tile in state.grid.tiles() {
        grouped.entry(tile.value).or_default().push(tile.position);
    }
    grouped
}

fn merge_reward(before: &GameState, after: &GameState) -> f32 {
    let previous = grouped_by_value(before);
    let next = grouped_by_value(after);
    for (value, positions) in previous.iter().rev() {
        let remaining = next.get(value).map_or(0, Vec::len);
        if remaining < positions.len() {
            return 1.0;
        }
    }
    0.0
}

fn adjacent(a: &Position, b: &Position) -> bool {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y) == 1
}

/// Tiles sharing their value with another tile but touching none of them.
fn isolated_equal_tiles(state: &GameState) -> usize {
    grouped_by_value(state)
        .values()
        .filter(|positions| positions.len() > 1)
        .map(|positions| {
            positions
                .iter()
                .filter(|p| !positions.iter().any(|other| adjacent(p, other)))
                .count()
        })
        .sum()
}

fn adjacency_reward(before: &GameState, after: &GameState) -> f32 {
    let previous = isolated_equal_tiles(before) as i64;
    let next = isolated_equal_tiles(after) as i64;
    sign(previous - next)
}

/// Mean Manhattan distance over all pairs of equal-valued tiles.
fn mean_pair_distance(state: &GameState) -> f64 {
    let mut total = 0usize;
    let mut pairs = 0usize;
    for positions in grouped_by_value(state).values() {
        for (i, a) in positions.iter().enumerate() {
            for b in &positions[i + 1..] {
                total += a.x.abs_diff(b.x) + a.y.abs_diff(b.y);
                pairs += 1;
            }
        }
    }
    if pairs == 0 {
        0.0
    } else {
        total as f64 / pairs as f64
    }
}

fn distance_reward(before: &GameState, after: &GameState) -> f32 {
    let old = mean_pair_distance(before);
    let new = mean_pair_distance(after);
    let average = (old + new) / 2.0;
    if average == 0.0 {
        return 0.0;
    }
    ((old - new) / average) as f32
}
