//! Arena-backed lookahead tree.
//!
//! The tree is a flat `Vec<SearchNode>` with an explicit root index. Moving
//! the root to a matching descendant keeps that subtree and drops the rest,
//! so repeated searches only simulate the nodes they have not seen yet.

use crate::game::direction::Direction;
use crate::game::game_state::GameState;
use crate::game::rules::GameRules;
use crate::game::simulator::apply_move;
use crate::search::node::{weighted_score, SearchNode};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
    root: usize,
}

/// Best node found so far while scanning the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestNode {
    pub index: usize,
    pub weighted_score: f64,
    pub depth: usize,
    pub first_move: Direction,
}

impl SearchTree {
    pub fn new(state: GameState) -> Self {
        Self {
            nodes: vec![SearchNode::root(state)],
            root: 0,
        }
    }

    pub fn root(&self) -> &SearchNode {
        &self.nodes[self.root]
    }

    pub fn root_index(&self) -> usize {
        self.root
    }

    pub fn node(&self, index: usize) -> &SearchNode {
        &self.nodes[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Breadth-first expansion of every unexpanded node shallower than
    /// `max_depth`. Moves that leave the grid unchanged produce no child, and
    /// a move that already has a child is not simulated again.
    /// Returns the number of nodes simulated by this call.
    pub fn expand<R: GameRules + ?Sized>(&mut self, rules: &R, max_depth: usize) -> usize {
        let root_score = self.nodes[self.root].state.score;
        let mut created = 0;
        let mut queue = VecDeque::from([self.root]);

        while let Some(index) = queue.pop_front() {
            let depth = self.nodes[index].depth;
            if depth >= max_depth {
                continue;
            }

            if !self.nodes[index].expanded && !self.nodes[index].state.over {
                let known: Vec<Option<Direction>> = self.nodes[index]
                    .children
                    .iter()
                    .map(|&child| self.nodes[child].direction)
                    .collect();
                for direction in Direction::ALL {
                    if known.contains(&Some(direction)) {
                        continue;
                    }
                    let outcome = apply_move(&self.nodes[index].state, direction, rules);
                    if !outcome.was_moved {
                        continue;
                    }
                    let score_change = outcome.state.score.saturating_sub(root_score);
                    let mut child = SearchNode::child(outcome.state, direction, index, depth + 1);
                    child.weighted_score = weighted_score(score_change, depth);

                    let child_index = self.nodes.len();
                    self.nodes.push(child);
                    self.nodes[index].children.push(child_index);
                    created += 1;
                }
                self.nodes[index].expanded = true;
            }

            queue.extend(self.nodes[index].children.iter().copied());
        }

        created
    }

    /// Highest weighted score anywhere below the root. Only strictly
    /// positive scores qualify. Ties go to the node with fewer hops, then to
    /// the first one met in breadth-first order.
    pub fn best_node(&self) -> Option<BestNode> {
        let mut best: Option<BestNode> = None;

        for index in self.descendants(self.root) {
            let node = &self.nodes[index];
            if node.weighted_score <= 0.0 {
                continue;
            }
            let better = match best {
                None => true,
                Some(current) => {
                    node.weighted_score > current.weighted_score
                        || (node.weighted_score == current.weighted_score
                            && node.depth < current.depth)
                }
            };
            if better {
                if let Some(first_move) = self.first_move_towards(index) {
                    best = Some(BestNode {
                        index,
                        weighted_score: node.weighted_score,
                        depth: node.depth,
                        first_move,
                    });
                }
            }
        }

        best
    }

    /// Direction of the root's child on the path to `index`.
    pub fn first_move_towards(&self, index: usize) -> Option<Direction> {
        let mut current = index;
        while let Some(parent) = self.nodes[current].parent {
            if parent == self.root {
                return self.nodes[current].direction;
            }
            current = parent;
        }
        None
    }

    /// Node indices below `start`, breadth-first.
    pub fn descendants(&self, start: usize) -> Vec<usize> {
        let mut order = Vec::new();
        let mut queue: VecDeque<usize> = self.nodes[start].children.iter().copied().collect();
        while let Some(index) = queue.pop_front() {
            order.push(index);
            queue.extend(self.nodes[index].children.iter().copied());
        }
        order
    }

    /// Node the observed board continues from, root included, breadth-first.
    ///
    /// A node whose grid has the same values as `observed` wins. Otherwise
    /// the first node that `observed` extends by a single spawned tile is
    /// returned, which is how a live board relates to the slid board the
    /// lookahead simulated for the move that was played.
    pub fn find_matching(&self, observed: &GameState) -> Option<usize> {
        let mut candidates = vec![self.root];
        candidates.extend(self.descendants(self.root));

        let grid = &observed.grid;
        candidates
            .iter()
            .copied()
            .find(|&index| self.nodes[index].state.grid.values_equal(grid))
            .or_else(|| {
                candidates
                    .iter()
                    .copied()
                    .find(|&index| self.nodes[index].state.grid.spawned_cell(grid).is_some())
            })
    }

    /// Make the subtree under `new_root` the whole tree, with `observed` as
    /// the root state. Depths and weighted scores are recomputed relative to
    /// the new root.
    ///
    /// When `observed` differs from the node's grid (a spawned tile), every
    /// kept node is replayed from its parent's new state. Moves the spawn
    /// made invalid are dropped with their subtree, and replayed nodes are
    /// marked unexpanded so the next `expand` adds moves the spawn opened up.
    pub fn reroot<R: GameRules + ?Sized>(
        &mut self,
        new_root: usize,
        observed: GameState,
        rules: &R,
    ) {
        let replay = !self.nodes[new_root].state.grid.values_equal(&observed.grid);
        let score_offset = observed.score as i128 - self.nodes[new_root].state.score as i128;

        let mut old_nodes: Vec<Option<SearchNode>> =
            std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        let Some(mut root) = old_nodes.get_mut(new_root).and_then(Option::take) else {
            *self = Self::new(observed);
            return;
        };

        let mut queue: VecDeque<(usize, usize)> = std::mem::take(&mut root.children)
            .into_iter()
            .map(|child| (child, 0))
            .collect();
        root.parent = None;
        root.depth = 0;
        root.direction = None;
        root.weighted_score = 0.0;
        root.state = observed;
        if replay {
            root.expanded = false;
        }
        let root_score = root.state.score;
        let mut nodes = vec![root];

        while let Some((old_index, parent)) = queue.pop_front() {
            let Some(mut node) = old_nodes[old_index].take() else {
                continue;
            };
            if replay {
                let Some(direction) = node.direction else {
                    continue;
                };
                let outcome = apply_move(&nodes[parent].state, direction, rules);
                if !outcome.was_moved {
                    continue;
                }
                node.state = outcome.state;
                node.expanded = false;
            } else {
                node.state.score = (node.state.score as i128 + score_offset).max(0) as u64;
            }

            let parent_depth = nodes[parent].depth;
            node.parent = Some(parent);
            node.depth = parent_depth + 1;
            node.weighted_score =
                weighted_score(node.state.score.saturating_sub(root_score), parent_depth);

            let index = nodes.len();
            queue.extend(
                std::mem::take(&mut node.children)
                    .into_iter()
                    .map(|child| (child, index)),
            );
            nodes[parent].children.push(index);
            nodes.push(node);
        }

        self.nodes = nodes;
        self.root = 0;
    }
}
