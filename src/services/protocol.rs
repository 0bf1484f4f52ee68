//! Typed request/response messages exchanged with the move dispatcher.
//!
//! Requests are JSON objects tagged by `kind`:
//! `{"kind":"get-move","state":{...},"strategy":"heuristic"}` and
//! `{"kind":"train","episodes":10}`. A board may be given either as a full
//! game state (`{"grid":{"cells":...},"score":0}`) or as row-major values
//! (`{"rows":[[0,2,0,0],...],"score":0}`).

use crate::game::direction::Direction;
use crate::game::game_state::GameState;
use crate::game::grid::{Grid, GRID_SIZE};
use crate::game::rules::GameRules;
use crate::training::stats::TrainingStats;
use crate::{Auto2048Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Random,
    #[default]
    Heuristic,
    TrainedNetwork,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoardInput {
    Rows {
        rows: [[u32; GRID_SIZE]; GRID_SIZE],
        #[serde(default)]
        score: u64,
    },
    State(GameState),
}

impl BoardInput {
    /// Validated game state with its terminal flag derived from `rules`.
    pub fn into_state<R: GameRules + ?Sized>(self, rules: &R) -> Result<GameState> {
        match self {
            BoardInput::Rows { rows, score } => GameState::from_rows(rows, score, rules),
            BoardInput::State(state) => {
                let mut checked = GameState::from_rows(state.grid.to_rows(), state.score, rules)?;
                checked.won = state.won;
                checked.keep_playing = state.keep_playing;
                checked.over |= state.over;
                Ok(checked)
            }
        }
    }
}

impl From<&GameState> for BoardInput {
    fn from(state: &GameState) -> Self {
        BoardInput::State(state.clone())
    }
}

impl From<Grid> for BoardInput {
    fn from(grid: Grid) -> Self {
        BoardInput::Rows {
            rows: grid.to_rows(),
            score: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Request {
    GetMove {
        state: BoardInput,
        #[serde(default)]
        strategy: Strategy,
    },
    Train {
        episodes: usize,
    },
}

const KNOWN_KINDS: [&str; 2] = ["get-move", "train"];

impl Request {
    /// Parse one JSON request. A missing or unknown `kind` is reported as
    /// `UnknownRequest`; a known kind with a bad payload as `Json`.
    pub fn from_json(text: &str) -> Result<Request> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let kind = value
            .get("kind")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        if !KNOWN_KINDS.contains(&kind) {
            return Err(Auto2048Error::UnknownRequest(kind.to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Move {
        #[serde(rename = "move")]
        direction: Direction,
        #[serde(rename = "keyCode")]
        key_code: u32,
    },
    Stats {
        stats: TrainingStats,
    },
    Error {
        error: String,
    },
}

impl Response {
    pub fn for_move(direction: Direction) -> Self {
        Response::Move {
            direction,
            key_code: direction.key_code(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
