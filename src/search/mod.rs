pub mod heuristic;
pub mod hyperparameters;
pub mod node;
pub mod tree;

pub use heuristic::{pad_ranking, random_ranking, rank_moves, IncrementalSearch, Ranking};
pub use hyperparameters::SearchHyperparameters;
pub use node::SearchNode;
pub use tree::{BestNode, SearchTree};
