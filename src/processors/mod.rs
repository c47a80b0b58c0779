//! Post-inference processing: geometry, detection post-processing, batching,
//! resizing, normalization, and CTC decoding.

pub mod batching;
pub mod db_postprocess;
pub mod decode;
pub mod geometry;
pub mod normalization;
pub mod resize;

pub use batching::{plan_batches, RecognitionBatch};
pub use db_postprocess::DbPostProcess;
pub use decode::CtcDecoder;
pub use geometry::{OrientedBox, Point};
