use crate::game::direction::Direction;
use crate::game::game_state::GameState;
use crate::game::rules::GameRules;
use crate::search::hyperparameters::SearchHyperparameters;
use crate::search::tree::SearchTree;
use crate::{Auto2048Error, Result};
use rand::seq::SliceRandom;
use rand::RngCore;

/// A complete ordering of the four moves, best first.
pub type Ranking = [Direction; 4];

/// Uniformly shuffled permutation of the four moves.
pub fn random_ranking(rng: &mut dyn RngCore) -> Ranking {
    let mut ranking = Direction::ALL;
    ranking.shuffle(rng);
    ranking
}

/// Put `best` first (when known) and fill the rest in random order.
pub fn pad_ranking(best: Option<Direction>, rng: &mut dyn RngCore) -> Ranking {
    let mut rest: Vec<Direction> = Direction::ALL
        .into_iter()
        .filter(|&direction| Some(direction) != best)
        .collect();
    rest.shuffle(rng);

    let mut ranking = Direction::ALL;
    let ordered = best.into_iter().chain(rest);
    for (slot, direction) in ranking.iter_mut().zip(ordered) {
        *slot = direction;
    }
    ranking
}

/// Rank the four moves with a fresh lookahead tree.
pub fn rank_moves<R: GameRules + ?Sized>(
    state: &GameState,
    rules: &R,
    params: &SearchHyperparameters,
    rng: &mut dyn RngCore,
) -> Ranking {
    let mut tree = SearchTree::new(state.clone());
    tree.expand(rules, params.max_depth);
    let best = tree.best_node().map(|node| node.first_move);
    log::trace!("search: {} nodes, best first move {:?}", tree.len(), best);
    pad_ranking(best, rng)
}

/// Lookahead search that keeps its tree between calls.
#[derive(Debug, Clone, Default)]
pub struct IncrementalSearch {
    params: SearchHyperparameters,
    tree: Option<SearchTree>,
    reused: usize,
    rebuilt: usize,
}

impl IncrementalSearch {
    pub fn new(params: SearchHyperparameters) -> Self {
        Self {
            params,
            tree: None,
            reused: 0,
            rebuilt: 0,
        }
    }

    pub fn params(&self) -> &SearchHyperparameters {
        &self.params
    }

    /// Times a kept subtree matched the observed board.
    pub fn reused(&self) -> usize {
        self.reused
    }

    /// Times the tree had to be built from scratch.
    pub fn rebuilt(&self) -> usize {
        self.rebuilt
    }

    pub fn reset(&mut self) {
        self.tree = None;
    }

    /// Rank the moves for `state`, reusing the subtree that matches it. A
    /// live board matches the node of the move just played once its
    /// spawned tile is accounted for.
    ///
    /// With `strict_tree` set, a kept tree that does not contain the board
    /// is reported as `SearchTreeCorrupted` instead of being rebuilt.
    pub fn rank_moves<R: GameRules + ?Sized>(
        &mut self,
        state: &GameState,
        rules: &R,
        rng: &mut dyn RngCore,
    ) -> Result<Ranking> {
        if !self.params.incremental {
            return Ok(rank_moves(state, rules, &self.params, rng));
        }

        let mut tree = match self.tree.take() {
            Some(mut tree) => match tree.find_matching(state) {
                Some(index) => {
                    tree.reroot(index, state.clone(), rules);
                    self.reused += 1;
                    tree
                }
                None if self.params.strict_tree => {
                    return Err(Auto2048Error::SearchTreeCorrupted);
                }
                None => {
                    log::debug!("search tree has no node for the observed board, rebuilding");
                    self.rebuilt += 1;
                    SearchTree::new(state.clone())
                }
            },
            None => {
                self.rebuilt += 1;
                SearchTree::new(state.clone())
            }
        };

        let created = tree.expand(rules, self.params.max_depth);
        let best = tree.best_node().map(|node| node.first_move);
        log::trace!(
            "incremental search: {} nodes ({} new), best first move {:?}",
            tree.len(),
            created,
            best
        );
        self.tree = Some(tree);
        Ok(pad_ranking(best, rng))
    }
}
