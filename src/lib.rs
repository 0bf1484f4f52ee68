//! # auto2048
//!
//! Plays 2048 on its own and learns to play it better.
//!
//! ## Features
//!
//! - **Game model**: board state, classic rules and a side-effect free move simulator
//! - **Heuristic search**: bounded breadth-first lookahead ranking the four moves
//! - **Experience memory**: bounded replay store with random and top-N recall
//! - **Q-learning**: self-play trainer with an online and a target value network
//! - **Dispatcher**: typed request channel serving moves and training runs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use auto2048::{
//!     game::{ClassicRules, GameState},
//!     search::{rank_moves, SearchHyperparameters},
//! };
//! use rand::SeedableRng;
//!
//! let rules = ClassicRules::default();
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//! let state = GameState::new_game(&rules, &mut rng);
//! let ranking = rank_moves(&state, &rules, &SearchHyperparameters::default(), &mut rng);
//! println!("best move: {}", ranking[0]);
//! ```

// ============================================================================
// PUBLIC API MODULES
// ============================================================================

/// Board model, rules and move simulation
pub mod game;

/// Bounded tree lookahead
pub mod search;

/// Experience replay storage
pub mod memory;

/// Value network interface and its libtorch implementation
pub mod neural;

/// Q-learning loop and training sessions
pub mod training;

/// Move dispatcher and request protocol
pub mod services;

/// Training statistics output
pub mod recording;

pub mod logging;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Main error type for the auto2048 library
#[derive(Debug, thiserror::Error)]
pub enum Auto2048Error {
    #[error("Game error: {0}")]
    Game(String),

    #[error("No valid move for a non-terminal board")]
    NoValidMove,

    #[error("Search tree has no node for the observed board")]
    SearchTreeCorrupted,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Training was interrupted; restart to train again")]
    Cancelled,

    #[error("Unknown request kind: '{0}'")]
    UnknownRequest(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<tch::TchError> for Auto2048Error {
    fn from(err: tch::TchError) -> Self {
        Auto2048Error::Network(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Auto2048Error>;

// ============================================================================
// LIBRARY VERSION INFO
// ============================================================================

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
