//! The seam between the pipeline and the inference engine.
//!
//! Every neural stage consumes the same narrow contract: a [`CompiledModel`]
//! that can hand out fresh [`ExecutionHandle`]s, each of which turns one NCHW
//! float tensor into one dense float output. The `ort`-backed implementation
//! lives in [`ort_model`]; tests inject fakes through the same traits.

mod ort_model;

pub use ort_model::{OrtHandle, OrtModel};

use crate::core::errors::OcrError;
use ndarray::{Array2, Array3, Array4, ArrayD};

/// 2D tensor: `[batch, classes]`.
pub type Tensor2D = Array2<f32>;
/// 3D tensor: `[batch, timesteps, classes]`.
pub type Tensor3D = Array3<f32>;
/// 4D tensor: `[batch, channels, height, width]`.
pub type Tensor4D = Array4<f32>;

/// A compiled inference artifact, safe to share across threads.
///
/// Implementations must not require exclusive access for handle creation;
/// exclusivity of actual execution is arranged by the caller, normally
/// through an [`crate::core::pool::InferencePool`].
pub trait CompiledModel: Send + Sync {
    /// Human-readable model name used in error messages and logs.
    fn name(&self) -> &str;

    /// Creates a fresh execution handle against this artifact.
    fn create_handle(&self) -> Result<Box<dyn ExecutionHandle>, OcrError>;
}

/// One checked-out execution context. Used exclusively by one thread at a
/// time; obtain one through the pool rather than sharing it.
pub trait ExecutionHandle: Send {
    /// Runs a blocking forward pass over one NCHW input batch.
    fn run(&mut self, input: &Tensor4D) -> Result<ArrayD<f32>, OcrError>;
}

/// Validates and reshapes a dynamic output into `[batch, classes]`.
pub fn into_2d(model: &str, output: ArrayD<f32>) -> Result<Tensor2D, OcrError> {
    let shape = output.shape().to_vec();
    output
        .into_dimensionality::<ndarray::Ix2>()
        .map_err(|_| shape_mismatch(model, 2, &shape))
}

/// Validates and reshapes a dynamic output into `[batch, timesteps, classes]`.
pub fn into_3d(model: &str, output: ArrayD<f32>) -> Result<Tensor3D, OcrError> {
    let shape = output.shape().to_vec();
    output
        .into_dimensionality::<ndarray::Ix3>()
        .map_err(|_| shape_mismatch(model, 3, &shape))
}

/// Validates and reshapes a dynamic output into `[batch, channels, h, w]`.
pub fn into_4d(model: &str, output: ArrayD<f32>) -> Result<Tensor4D, OcrError> {
    let shape = output.shape().to_vec();
    output
        .into_dimensionality::<ndarray::Ix4>()
        .map_err(|_| shape_mismatch(model, 4, &shape))
}

fn shape_mismatch(model: &str, expected: usize, got: &[usize]) -> OcrError {
    OcrError::invalid_input(format!(
        "model '{model}' produced a {}D output where {expected}D was expected (shape {got:?})",
        got.len(),
    ))
}
