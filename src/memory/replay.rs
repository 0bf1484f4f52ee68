//! Bounded experience store with random and quality-biased recall.

use rand::seq::index::sample;
use rand::RngCore;
use std::cmp::Ordering;
use std::collections::VecDeque;

/// What happens when an `add` pushes the memory past its capacity.
pub enum EvictionPolicy<T> {
    /// Drop the oldest item.
    Fifo,
    /// Rank all items by `score` and keep only the best `keep_fraction`
    /// of the capacity (rounded up, at least one).
    KeepBest {
        score: fn(&T) -> f64,
        keep_fraction: f64,
    },
}

impl<T> Clone for EvictionPolicy<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EvictionPolicy<T> {}

impl<T> std::fmt::Debug for EvictionPolicy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvictionPolicy::Fifo => f.write_str("Fifo"),
            EvictionPolicy::KeepBest { keep_fraction, .. } => f
                .debug_struct("KeepBest")
                .field("keep_fraction", keep_fraction)
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Memory<T> {
    capacity: usize,
    items: VecDeque<T>,
    policy: EvictionPolicy<T>,
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// `ceil(len * fraction)`, clamped to `0..=len`.
fn top_count(len: usize, fraction: f64) -> usize {
    ((len as f64 * fraction).ceil().max(0.0) as usize).min(len)
}

impl<T> Memory<T> {
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, EvictionPolicy::Fifo)
    }

    pub fn keep_best(capacity: usize, score: fn(&T) -> f64, keep_fraction: f64) -> Self {
        Self::with_policy(
            capacity,
            EvictionPolicy::KeepBest {
                score,
                keep_fraction,
            },
        )
    }

    pub fn with_policy(capacity: usize, policy: EvictionPolicy<T>) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity.min(4096)),
            policy,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Append `item`, evicting per the policy when over capacity.
    pub fn add(&mut self, item: T) {
        self.items.push_back(item);
        if self.items.len() <= self.capacity {
            return;
        }

        match self.policy {
            EvictionPolicy::Fifo => {
                while self.items.len() > self.capacity {
                    self.items.pop_front();
                }
            }
            EvictionPolicy::KeepBest {
                score,
                keep_fraction,
            } => {
                let keep = top_count(self.capacity, keep_fraction).max(1);
                let mut ranked: Vec<T> = self.items.drain(..).collect();
                ranked.sort_by(|a, b| descending(score(a), score(b)));
                ranked.truncate(keep);
                self.items.extend(ranked);
            }
        }
    }

    /// Up to `count` distinct items picked uniformly at random.
    pub fn recall_randomly(&self, count: usize, rng: &mut dyn RngCore) -> Vec<&T> {
        let amount = count.min(self.items.len());
        sample(rng, self.items.len(), amount)
            .into_iter()
            .map(|index| &self.items[index])
            .collect()
    }

    /// The best `fraction` of the items by `score`, best first, rounding the
    /// count up.
    pub fn recall_top_by<F>(&self, score: F, fraction: f64) -> Vec<&T>
    where
        F: Fn(&T) -> f64,
    {
        let mut ranked: Vec<&T> = self.items.iter().collect();
        ranked.sort_by(|a, b| descending(score(a), score(b)));
        ranked.truncate(top_count(self.items.len(), fraction));
        ranked
    }
}
