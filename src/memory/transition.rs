use crate::game::direction::Direction;
use crate::game::simulator::EncodedState;
use crate::memory::replay::Memory;

/// One recorded step: the encoded board, the action tried, the reward it
/// earned and the encoded board after it (`None` once the game is over).
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: EncodedState,
    pub action: Direction,
    pub reward: f32,
    pub next_state: Option<EncodedState>,
}

impl Transition {
    pub fn is_terminal(&self) -> bool {
        self.next_state.is_none()
    }
}

/// A whole self-play game: its transitions in play order and how well it did.
#[derive(Debug, Clone)]
pub struct GameMemory {
    pub total_reward: f64,
    pub final_score: u64,
    pub moves: Memory<Transition>,
}

impl GameMemory {
    pub fn new(move_capacity: usize) -> Self {
        Self {
            total_reward: 0.0,
            final_score: 0,
            moves: Memory::new(move_capacity),
        }
    }

    pub fn record(&mut self, transition: Transition) {
        self.total_reward += f64::from(transition.reward);
        self.moves.add(transition);
    }

    pub fn total_reward(game: &GameMemory) -> f64 {
        game.total_reward
    }
}
