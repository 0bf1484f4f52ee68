//! Q-learning hyperparameters.

use crate::search::hyperparameters::SearchHyperparameters;
use crate::training::epsilon::decay_epsilon;
use crate::training::reward::RewardShaping;
use crate::{Auto2048Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where exploratory moves come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExplorationStrategy {
    /// Bounded lookahead search.
    #[default]
    Heuristic,
    /// Uniformly shuffled moves.
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearnConfig {
    /// Default: 4
    pub num_actions: usize,
    /// One log2 feature per cell.
    /// Default: 16
    pub num_inputs: usize,

    /// Current exploration rate, rewritten by `decay`.
    /// Default: 0.9
    pub epsilon: f64,
    /// Default: 0.001
    pub min_epsilon: f64,
    /// Default: 0.9
    pub max_epsilon: f64,
    /// Default: 1e-5
    pub epsilon_decay_speed: f64,

    /// Bellman discount applied to the target network's estimate.
    /// Default: 0.95
    pub learning_discount: f64,
    /// Default: 1e-3
    pub learning_rate: f64,

    /// Games kept for replay.
    /// Default: 100
    pub game_memory_size: usize,
    /// Transitions kept per game.
    /// Default: 1000
    pub move_memory_size: usize,
    /// Transitions sampled from each replayed game per learn step.
    /// Default: 200
    pub batch_size: usize,
    /// Share of the best games (by total reward) replayed per learn step.
    /// Default: 0.5
    pub top_game_fraction: f64,

    /// Default: 1
    pub learn_steps_per_game: usize,
    /// Learn steps between two copies of the online weights into the
    /// target network.
    /// Default: 10
    pub target_sync_interval: usize,

    /// Default: 10
    pub games_per_batch: usize,
    /// Batches without a new best average before a checkpoint is forced.
    /// Default: 5
    pub max_batches_without_improvement: usize,

    /// Default: heuristic
    pub exploration: ExplorationStrategy,
    /// Default: tile-count
    pub reward: RewardShaping,
    /// Store invalid attempts as penalised transitions that keep the board.
    /// Default: true
    pub record_invalid_moves: bool,
    /// Self-play steps between two cooperative yields.
    /// Default: 32
    pub yield_every_steps: usize,

    /// Lookahead used by heuristic exploration.
    pub search: SearchHyperparameters,
}

impl Default for QLearnConfig {
    fn default() -> Self {
        Self {
            num_actions: 4,
            num_inputs: 16,
            epsilon: 0.9,
            min_epsilon: 0.001,
            max_epsilon: 0.9,
            epsilon_decay_speed: 1e-5,
            learning_discount: 0.95,
            learning_rate: 1e-3,
            game_memory_size: 100,
            move_memory_size: 1000,
            batch_size: 200,
            top_game_fraction: 0.5,
            learn_steps_per_game: 1,
            target_sync_interval: 10,
            games_per_batch: 10,
            max_batches_without_improvement: 5,
            exploration: ExplorationStrategy::default(),
            reward: RewardShaping::default(),
            record_invalid_moves: true,
            yield_every_steps: 32,
            search: SearchHyperparameters::default(),
        }
    }
}

impl QLearnConfig {
    /// Recompute `epsilon` for the cumulative step counter `steps`.
    pub fn decay(&mut self, steps: u64) -> f64 {
        self.epsilon = decay_epsilon(
            self.min_epsilon,
            self.max_epsilon,
            self.epsilon_decay_speed,
            steps,
        );
        self.epsilon
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Auto2048Error::Config(msg));

        if self.num_actions != 4 {
            return fail(format!("num_actions must be 4, got {}", self.num_actions));
        }
        if self.num_inputs != 16 {
            return fail(format!("num_inputs must be 16, got {}", self.num_inputs));
        }
        if !(0.0..=1.0).contains(&self.min_epsilon) || !(0.0..=1.0).contains(&self.max_epsilon) {
            return fail("epsilon bounds must lie in [0, 1]".to_string());
        }
        if self.min_epsilon > self.max_epsilon {
            return fail(format!(
                "min_epsilon {} exceeds max_epsilon {}",
                self.min_epsilon, self.max_epsilon
            ));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return fail(format!("epsilon {} must lie in [0, 1]", self.epsilon));
        }
        if self.epsilon_decay_speed < 0.0 {
            return fail("epsilon_decay_speed must be non-negative".to_string());
        }
        if !(0.0..=1.0).contains(&self.learning_discount) {
            return fail(format!(
                "learning_discount {} must lie in [0, 1]",
                self.learning_discount
            ));
        }
        if self.learning_rate <= 0.0 {
            return fail("learning_rate must be positive".to_string());
        }
        if self.game_memory_size == 0 || self.move_memory_size == 0 || self.batch_size == 0 {
            return fail("memory sizes and batch_size must be positive".to_string());
        }
        if !(self.top_game_fraction > 0.0 && self.top_game_fraction <= 1.0) {
            return fail(format!(
                "top_game_fraction {} must lie in (0, 1]",
                self.top_game_fraction
            ));
        }
        if self.target_sync_interval == 0 || self.games_per_batch == 0 {
            return fail("target_sync_interval and games_per_batch must be positive".to_string());
        }
        if self.yield_every_steps == 0 {
            return fail("yield_every_steps must be positive".to_string());
        }
        self.search.validate().map_err(Auto2048Error::Config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}
