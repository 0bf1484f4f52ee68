pub mod config;
pub mod epsilon;
pub mod qlearn;
pub mod reward;
pub mod stats;
pub mod trainer;

pub use config::{ExplorationStrategy, QLearnConfig};
pub use epsilon::decay_epsilon;
pub use qlearn::{bellman_target, first_valid_move, QLearn};
pub use reward::{RewardShaping, INVALID_MOVE_PENALTY};
pub use stats::{EpisodeResult, TrainingStats};
pub use tokio_util::sync::CancellationToken;
pub use trainer::{BatchReport, Checkpoint, Trainer, TrainerOptions};
