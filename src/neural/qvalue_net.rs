//! Convolutional Q-value network over the 4x4 board.
//!
//! Input is the log2-encoded board as `[batch, 1, 4, 4]`; output is one
//! value per direction in `Direction::index` order.

use crate::game::simulator::EncodedState;
use crate::neural::model_io::{load_varstore, save_varstore};
use crate::neural::network::{FitMetrics, QNetwork, QValues, TrainingBatch};
use crate::neural::tensor_conversion::{
    actions_to_tensor, states_to_tensor, targets_to_tensor, tensor_to_q_values,
};
use crate::Result;
use std::path::Path;
use tch::nn::OptimizerConfig;
use tch::{nn, Device, Tensor};

/// Largest log2 rank a cell can hold; used to bring inputs into `0..=1`.
const INPUT_SCALE: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkConfig {
    pub device: Device,
    pub learning_rate: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            learning_rate: 1e-3,
        }
    }
}

pub struct QValueNet {
    conv1: nn::Conv2D,
    conv2: nn::Conv2D,
    fc1: nn::Linear,
    fc2: nn::Linear,
    qvalue_head: nn::Linear,
}

impl QValueNet {
    pub fn new(vs: &nn::VarStore) -> Self {
        let p = vs.root();

        // 2x2 windows see every horizontal and vertical neighbour pair.
        let conv1 = nn::conv2d(&p / "conv1", 1, 128, 2, Default::default());
        let conv2 = nn::conv2d(&p / "conv2", 128, 128, 2, Default::default());

        let fc1 = nn::linear(&p / "fc1", 128 * 2 * 2, 256, Default::default());
        let fc2 = nn::linear(&p / "fc2", 256, 64, Default::default());
        let qvalue_head = nn::linear(&p / "qvalue_head", 64, 4, Default::default());

        Self {
            conv1,
            conv2,
            fc1,
            fc2,
            qvalue_head,
        }
    }

    pub fn forward(&self, x: &Tensor) -> Tensor {
        let h = (x / INPUT_SCALE).apply(&self.conv1).relu();
        let h = h.apply(&self.conv2).relu();
        let h = h.flat_view();
        let h = h.apply(&self.fc1).relu();
        let h = h.apply(&self.fc2).relu();
        h.apply(&self.qvalue_head)
    }
}

/// `QNetwork` backed by libtorch, trained with Adam.
pub struct TchQNetwork {
    vs: nn::VarStore,
    net: QValueNet,
    optimizer: nn::Optimizer,
    config: NetworkConfig,
}

impl TchQNetwork {
    pub fn new(config: NetworkConfig) -> Result<Self> {
        let vs = nn::VarStore::new(config.device);
        let net = QValueNet::new(&vs);
        let optimizer = nn::Adam::default().build(&vs, config.learning_rate)?;
        Ok(Self {
            vs,
            net,
            optimizer,
            config,
        })
    }

    pub fn config(&self) -> NetworkConfig {
        self.config
    }
}

impl QNetwork for TchQNetwork {
    fn predict(&self, states: &[EncodedState]) -> Result<Vec<QValues>> {
        if states.is_empty() {
            return Ok(Vec::new());
        }
        let input = states_to_tensor(states, self.config.device);
        let output = tch::no_grad(|| self.net.forward(&input));
        tensor_to_q_values(&output)
    }

    fn fit(&mut self, batch: &TrainingBatch) -> Result<FitMetrics> {
        if batch.is_empty() {
            return Ok(FitMetrics {
                loss: 0.0,
                samples: 0,
            });
        }
        let device = self.config.device;
        let states = states_to_tensor(&batch.states, device);
        let actions = actions_to_tensor(&batch.actions, device);
        let targets = targets_to_tensor(&batch.targets, device);

        let predicted = self
            .net
            .forward(&states)
            .gather(1, &actions, false)
            .squeeze_dim(1);
        let loss = predicted.mse_loss(&targets, tch::Reduction::Mean);

        self.optimizer.zero_grad();
        loss.backward();
        self.optimizer.step();

        Ok(FitMetrics {
            loss: loss.double_value(&[]),
            samples: batch.len(),
        })
    }

    fn copy_weights_from(&mut self, source: &Self) -> Result<()> {
        self.vs.copy(&source.vs)?;
        Ok(())
    }

    fn try_clone(&self) -> Result<Self> {
        let mut copy = Self::new(self.config)?;
        copy.copy_weights_from(self)?;
        Ok(copy)
    }

    fn save(&self, path: &Path) -> Result<()> {
        save_varstore(&self.vs, path)
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        load_varstore(&mut self.vs, path)
    }
}
