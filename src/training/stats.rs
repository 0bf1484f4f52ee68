//! Per-batch self-play statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one finished self-play game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeResult {
    pub steps: usize,
    pub invalid_steps: usize,
    pub total_reward: f64,
    pub score: u64,
    pub biggest_tile: u32,
    pub won: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingStats {
    pub games: usize,
    pub total_moves: usize,
    pub total_invalid: usize,
    pub total_score: u64,
    pub total_reward: f64,
    pub average_moves: f64,
    pub average_invalid: f64,
    pub average_score: f64,
    pub average_reward: f64,
    pub median_score: u64,
    pub min_score: u64,
    pub best_score: u64,
    pub biggest_tile: u32,
    pub epsilon: f64,
    /// Mean loss of the learn steps run during the batch.
    pub loss: Option<f64>,
}

impl TrainingStats {
    pub fn from_episodes(episodes: &[EpisodeResult], epsilon: f64, losses: &[f64]) -> Self {
        let games = episodes.len();
        let mut stats = TrainingStats {
            games,
            epsilon,
            loss: mean(losses),
            ..TrainingStats::default()
        };
        if games == 0 {
            return stats;
        }

        let mut scores: Vec<u64> = episodes.iter().map(|e| e.score).collect();
        scores.sort_unstable();

        stats.total_moves = episodes.iter().map(|e| e.steps).sum();
        stats.total_invalid = episodes.iter().map(|e| e.invalid_steps).sum();
        stats.total_score = scores.iter().sum();
        stats.total_reward = episodes.iter().map(|e| e.total_reward).sum();
        stats.average_moves = stats.total_moves as f64 / games as f64;
        stats.average_invalid = stats.total_invalid as f64 / games as f64;
        stats.average_score = stats.total_score as f64 / games as f64;
        stats.average_reward = stats.total_reward / games as f64;
        stats.median_score = scores[games / 2];
        stats.min_score = scores[0];
        stats.best_score = scores[games - 1];
        stats.biggest_tile = episodes.iter().map(|e| e.biggest_tile).max().unwrap_or(0);
        stats
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

impl fmt::Display for TrainingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "games={} | moves avg={:.1} invalid avg={:.1} | score avg={:.1} median={} min={} best={} | reward avg={:.3} | tile={} | eps={:.4}",
            self.games,
            self.average_moves,
            self.average_invalid,
            self.average_score,
            self.median_score,
            self.min_score,
            self.best_score,
            self.average_reward,
            self.biggest_tile,
            self.epsilon,
        )?;
        if let Some(loss) = self.loss {
            write!(f, " | loss={loss:.5}")?;
        }
        Ok(())
    }
}
