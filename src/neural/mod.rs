pub mod model_io;
pub mod network;
pub mod qvalue_net;
pub mod tensor_conversion;

pub use network::{max_q, rank_by_q, FitMetrics, QNetwork, QValues, TrainingBatch};
pub use qvalue_net::{NetworkConfig, QValueNet, TchQNetwork};
