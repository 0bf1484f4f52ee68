//! Search tree node
//!
//! Nodes live in the `SearchTree` arena and refer to each other by index.
//! `parent` is a back-reference only; a node owns the nodes listed in
//! `children`.

use crate::game::direction::Direction;
use crate::game::game_state::GameState;

#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Simulated board reached by the moves leading here
    pub state: GameState,

    /// Move that produced this node, `None` for the root
    pub direction: Option<Direction>,

    /// Score gained since the root, divided by the parent's depth (if non-zero)
    pub weighted_score: f64,

    /// Index of the parent node
    pub parent: Option<usize>,

    /// Indices of the child nodes
    pub children: Vec<usize>,

    /// Number of moves from the root
    pub depth: usize,

    /// Whether the legal moves of this node were already enumerated
    pub expanded: bool,
}

impl SearchNode {
    pub fn root(state: GameState) -> Self {
        Self {
            state,
            direction: None,
            weighted_score: 0.0,
            parent: None,
            children: Vec::new(),
            depth: 0,
            expanded: false,
        }
    }

    pub fn child(state: GameState, direction: Direction, parent: usize, depth: usize) -> Self {
        Self {
            state,
            direction: Some(direction),
            weighted_score: 0.0,
            parent: Some(parent),
            children: Vec::new(),
            depth,
            expanded: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Depth-penalised score: the raw gain for first moves, then the gain
/// divided by the parent's depth, so shallow merges outrank deep lucky ones.
pub fn weighted_score(score_change: u64, parent_depth: usize) -> f64 {
    if parent_depth == 0 {
        score_change as f64
    } else {
        score_change as f64 / parent_depth as f64
    }
}
