//! Core building blocks shared across the pipeline.
//!
//! This module hosts the crate-wide error type, the configuration structs,
//! the inference-engine seam, and the request pool that bounds concurrent
//! access to a single compiled model.

pub mod config;
pub mod errors;
pub mod inference;
pub mod pool;

pub use errors::OcrError;
pub use inference::{CompiledModel, ExecutionHandle, Tensor2D, Tensor3D, Tensor4D};
pub use pool::{InferencePool, PoolPolicy};

/// Number of usable CPU cores, falling back to 1 when unknown.
pub(crate) fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
