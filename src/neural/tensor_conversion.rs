use crate::game::direction::Direction;
use crate::game::grid::GRID_SIZE;
use crate::game::simulator::EncodedState;
use crate::neural::network::QValues;
use crate::{Auto2048Error, Result};
use tch::{Device, Kind, Tensor};

/// Encoded boards as a `[batch, 1, 4, 4]` float tensor.
pub fn states_to_tensor(states: &[EncodedState], device: Device) -> Tensor {
    let flat: Vec<f32> = states.iter().flat_map(|state| state.iter().copied()).collect();
    Tensor::from_slice(&flat)
        .view([states.len() as i64, 1, GRID_SIZE as i64, GRID_SIZE as i64])
        .to_device(device)
}

/// Action indices as a `[batch, 1]` int64 tensor, ready for `gather`.
pub fn actions_to_tensor(actions: &[Direction], device: Device) -> Tensor {
    let indices: Vec<i64> = actions.iter().map(|action| action.index() as i64).collect();
    Tensor::from_slice(&indices)
        .view([actions.len() as i64, 1])
        .to_device(device)
}

pub fn targets_to_tensor(targets: &[f32], device: Device) -> Tensor {
    Tensor::from_slice(targets).to_device(device)
}

/// Split a `[batch, 4]` output into per-state Q-values.
pub fn tensor_to_q_values(output: &Tensor) -> Result<Vec<QValues>> {
    let flat = Vec::<f32>::try_from(
        &output
            .to_device(Device::Cpu)
            .to_kind(Kind::Float)
            .flatten(0, -1)
            .contiguous(),
    )?;
    if flat.len() % 4 != 0 {
        return Err(Auto2048Error::Network(format!(
            "expected 4 outputs per state, got {} values",
            flat.len()
        )));
    }
    Ok(flat
        .chunks_exact(4)
        .map(|chunk| [chunk[0], chunk[1], chunk[2], chunk[3]])
        .collect())
}
