//! The three neural stage predictors: detection, orientation classification,
//! and recognition. Each owns a pooled handle to its compiled model and wraps
//! pre-processing, inference, and post-processing into one call.

pub mod classifier;
pub mod detector;
pub mod recognizer;

pub use classifier::{LineOrientation, LineOrientationClassifier};
pub use detector::TextDetector;
pub use recognizer::TextRecognizer;
