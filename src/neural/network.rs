//! Value-estimation network interface.
//!
//! The trainer and the dispatcher only talk to the network through
//! `QNetwork`: batched prediction, one optimizer step on a batch, weight
//! copy for the target network, and persistence.

use crate::game::direction::Direction;
use crate::game::simulator::EncodedState;
use crate::search::heuristic::Ranking;
use crate::Result;
use std::path::Path;

/// Predicted value of each action, indexed by `Direction::index`.
pub type QValues = [f32; 4];

/// Inputs for one gradient step: the Q-value of `actions[i]` in
/// `states[i]` is pulled towards `targets[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingBatch {
    pub states: Vec<EncodedState>,
    pub actions: Vec<Direction>,
    pub targets: Vec<f32>,
}

impl TrainingBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            states: Vec::with_capacity(capacity),
            actions: Vec::with_capacity(capacity),
            targets: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, state: EncodedState, action: Direction, target: f32) {
        self.states.push(state);
        self.actions.push(action);
        self.targets.push(target);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitMetrics {
    /// Mean squared error before the step
    pub loss: f64,
    pub samples: usize,
}

pub trait QNetwork: Sized {
    fn predict(&self, states: &[EncodedState]) -> Result<Vec<QValues>>;

    /// One optimizer step minimising the squared error between the
    /// predicted value of the taken action and its target.
    fn fit(&mut self, batch: &TrainingBatch) -> Result<FitMetrics>;

    fn copy_weights_from(&mut self, source: &Self) -> Result<()>;

    /// Independent network with the same weights.
    fn try_clone(&self) -> Result<Self>;

    fn save(&self, path: &Path) -> Result<()>;

    fn load(&mut self, path: &Path) -> Result<()>;

    fn predict_one(&self, state: &EncodedState) -> Result<QValues> {
        let mut values = self.predict(std::slice::from_ref(state))?;
        values
            .pop()
            .ok_or_else(|| crate::Auto2048Error::Network("empty prediction".to_string()))
    }
}

/// Moves ordered by predicted value, highest first. Equal values keep
/// index order.
pub fn rank_by_q(values: &QValues) -> Ranking {
    let mut ranking = Direction::ALL;
    ranking.sort_by(|a, b| {
        values[b.index()]
            .partial_cmp(&values[a.index()])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranking
}

pub fn max_q(values: &QValues) -> f32 {
    values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_by_q_sorts_descending() {
        let ranking = rank_by_q(&[0.1, 0.7, -0.3, 0.4]);
        assert_eq!(
            ranking,
            [Direction::Right, Direction::Left, Direction::Up, Direction::Down]
        );
    }

    #[test]
    fn test_rank_by_q_ties_keep_index_order() {
        let ranking = rank_by_q(&[0.5, 0.5, 0.5, 0.5]);
        assert_eq!(ranking, Direction::ALL);
    }

    #[test]
    fn test_max_q() {
        assert_eq!(max_q(&[0.1, 0.7, -0.3, 0.4]), 0.7);
    }
}
