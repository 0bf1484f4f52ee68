//! Weight persistence in the safetensors format.
//!
//! Only float32 parameters are written. The header metadata records the
//! board encoding so a file trained on another layout is rejected on load.

use crate::{Auto2048Error, Result};
use safetensors::serialize_to_file;
use safetensors::tensor::{Dtype, SafeTensors, TensorView};
use std::collections::HashMap;
use std::path::Path;
use tch::{nn, Device, Kind, Tensor};

pub const ENCODING_KEY: &str = "encoding";
pub const ENCODING_VERSION: &str = "log2-row-major-4x4";

fn safetensors_error(err: safetensors::SafeTensorError) -> Auto2048Error {
    Auto2048Error::Network(format!("safetensors: {err}"))
}

pub fn save_varstore(vs: &nn::VarStore, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut buffers: Vec<(String, Vec<usize>, Vec<u8>)> = Vec::new();
    for (name, tensor) in vs.variables() {
        let shape: Vec<usize> = tensor.size().iter().map(|&d| d as usize).collect();
        let flat = tensor
            .to_device(Device::Cpu)
            .to_kind(Kind::Float)
            .flatten(0, -1)
            .contiguous();
        let data = Vec::<f32>::try_from(&flat)?;
        let bytes: Vec<u8> = data.iter().flat_map(|x| x.to_le_bytes()).collect();
        buffers.push((name, shape, bytes));
    }

    let mut views: HashMap<String, TensorView<'_>> = HashMap::new();
    for (name, shape, bytes) in &buffers {
        let view = TensorView::new(Dtype::F32, shape.clone(), bytes).map_err(safetensors_error)?;
        views.insert(name.clone(), view);
    }

    let metadata = HashMap::from([(ENCODING_KEY.to_string(), ENCODING_VERSION.to_string())]);
    serialize_to_file(views, &Some(metadata), path).map_err(safetensors_error)?;
    Ok(())
}

/// Copy every variable of `vs` from the file. A missing variable, a shape
/// mismatch or a foreign encoding tag is an error and leaves the
/// remaining variables untouched.
pub fn load_varstore(vs: &mut nn::VarStore, path: impl AsRef<Path>) -> Result<()> {
    let buffer = std::fs::read(path.as_ref())?;

    let (_, header) = SafeTensors::read_metadata(&buffer).map_err(safetensors_error)?;
    if let Some(encoding) = header.metadata().as_ref().and_then(|m| m.get(ENCODING_KEY)) {
        if encoding != ENCODING_VERSION {
            return Err(Auto2048Error::Network(format!(
                "model was trained on encoding '{encoding}', expected '{ENCODING_VERSION}'"
            )));
        }
    }

    let tensors = SafeTensors::deserialize(&buffer).map_err(safetensors_error)?;
    for (name, mut var) in vs.variables() {
        let view = tensors
            .tensor(&name)
            .map_err(|_| Auto2048Error::Network(format!("tensor '{name}' missing from model file")))?;
        let loaded = view_to_tensor(&view)?.to_device(var.device());
        if loaded.size() != var.size() {
            return Err(Auto2048Error::Network(format!(
                "tensor '{}' has shape {:?}, expected {:?}",
                name,
                loaded.size(),
                var.size()
            )));
        }
        tch::no_grad(|| var.f_copy_(&loaded))?;
    }
    Ok(())
}

fn view_to_tensor(view: &TensorView<'_>) -> Result<Tensor> {
    if view.dtype() != Dtype::F32 {
        return Err(Auto2048Error::Network(format!(
            "unsupported dtype {:?}",
            view.dtype()
        )));
    }
    let shape: Vec<i64> = view.shape().iter().map(|&d| d as i64).collect();
    let floats: Vec<f32> = view
        .data()
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    Ok(Tensor::from_slice(&floats).reshape(shape.as_slice()))
}
