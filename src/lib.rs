//! # ferrocr
//!
//! An OCR pipeline that composes three pretrained ONNX inference stages —
//! text region detection, optional text-line orientation classification, and
//! text-line recognition — into a single image-to-text call, plus a
//! bounded-concurrency service that lets many callers share a small pool of
//! pipeline instances.
//!
//! ## Components
//!
//! - **Text Detection**: converts a DB-style probability map into oriented,
//!   enlarged, filtered text boxes
//! - **Geometric Rectification**: extracts upright crops from oriented boxes
//!   via perspective warp
//! - **Line Orientation**: decides per crop whether it is upside-down
//! - **Text Recognition**: aspect-ratio batching plus greedy CTC decoding
//! - **Concurrency**: an inference-request pool bounding concurrent use of a
//!   compiled model, and a producer/consumer OCR service with a fixed worker
//!   pool and bounded-queue backpressure
//!
//! ## Modules
//!
//! * [`core`] - Error handling, configuration, and the inference-engine seam
//! * [`pipeline`] - The `OcrPipeline` orchestrator and the `OcrService`
//! * [`predictor`] - Detector, classifier, and recognizer predictors
//! * [`processors`] - Geometry, post-processing, batching, and decoding
//! * [`utils`] - Image and perspective-transform utilities
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferrocr::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detection = Arc::new(OrtModel::from_file("models/det.onnx")?);
//! let recognition = Arc::new(OrtModel::from_file("models/rec.onnx")?);
//!
//! let charset: Vec<char> = std::fs::read_to_string("models/dict.txt")?
//!     .lines()
//!     .filter_map(|l| l.chars().next())
//!     .collect();
//!
//! let pipeline = OcrPipeline::builder(PipelineConfig::default())
//!     .detection_model(detection, PoolPolicy::Auto)
//!     .recognition_model(recognition, PoolPolicy::Auto, charset)
//!     .build()?;
//!
//! let image = image::open("document.jpg")?;
//! let output = pipeline.run(&image)?;
//! for region in &output.regions {
//!     println!("{} ({:.3})", region.text, region.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod pipeline;
pub mod predictor;
pub mod processors;
pub mod utils;

#[cfg(test)]
pub(crate) mod testkit;

/// Prelude module for convenient imports.
///
/// Bring the essentials into scope with a single use statement:
///
/// ```rust
/// use ferrocr::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::config::{
        ClassifierConfig, DetectorConfig, PipelineConfig, RecognizerConfig,
    };
    pub use crate::core::errors::OcrError;
    pub use crate::core::inference::{CompiledModel, ExecutionHandle, OrtModel};
    pub use crate::core::pool::{InferencePool, PoolPolicy};
    pub use crate::pipeline::service::{CancelToken, OcrService};
    pub use crate::pipeline::{OcrOutput, OcrPipeline, TextRegion};
    pub use crate::processors::geometry::OrientedBox;
}
