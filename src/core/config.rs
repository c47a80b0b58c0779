//! Configuration for the OCR pipeline.
//!
//! All thresholds and shape hints live in plain serde structs with defaults,
//! so a pipeline can be described in JSON and tuned per deployment. The
//! structs are immutable once handed to the pipeline.

use serde::{Deserialize, Serialize};

/// Configuration for the text detection stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum mean probability a contour must score to be kept.
    /// `None` disables the score check.
    #[serde(default = "DetectorConfig::default_box_score_threshold")]
    pub box_score_threshold: Option<f32>,

    /// Threshold for binarizing the probability map before contour
    /// extraction. `None` feeds the raw 8-bit map to the contour finder.
    #[serde(default = "DetectorConfig::default_binarization_threshold")]
    pub binarization_threshold: Option<f32>,

    /// Boxes whose enlarged width or height is at or below this are dropped.
    #[serde(default = "DetectorConfig::default_min_box_size")]
    pub min_box_size: f32,

    /// Ratio controlling how far boxes are enlarged beyond the shrunk
    /// segmentation target (`d = ratio * area / perimeter`).
    #[serde(default = "DetectorConfig::default_unclip_ratio")]
    pub unclip_ratio: f32,

    /// Optional static network input shape as (height, width). Images smaller
    /// than this are never upscaled; larger ones are scaled down to fit.
    #[serde(default)]
    pub static_shape: Option<(u32, u32)>,

    /// Maximum side length when no static shape is configured.
    #[serde(default = "DetectorConfig::default_max_side_limit")]
    pub max_side_limit: u32,
}

impl DetectorConfig {
    fn default_box_score_threshold() -> Option<f32> {
        Some(0.6)
    }

    fn default_binarization_threshold() -> Option<f32> {
        Some(0.3)
    }

    fn default_min_box_size() -> f32 {
        3.0
    }

    fn default_unclip_ratio() -> f32 {
        2.0
    }

    fn default_max_side_limit() -> u32 {
        960
    }

    /// Sets the box score threshold.
    pub fn with_box_score_threshold(mut self, threshold: Option<f32>) -> Self {
        self.box_score_threshold = threshold;
        self
    }

    /// Sets the binarization threshold.
    pub fn with_binarization_threshold(mut self, threshold: Option<f32>) -> Self {
        self.binarization_threshold = threshold;
        self
    }

    /// Sets the minimum kept box side length.
    pub fn with_min_box_size(mut self, size: f32) -> Self {
        self.min_box_size = size;
        self
    }

    /// Sets the unclip ratio.
    pub fn with_unclip_ratio(mut self, ratio: f32) -> Self {
        self.unclip_ratio = ratio;
        self
    }

    /// Sets a static (height, width) network input shape.
    pub fn with_static_shape(mut self, shape: Option<(u32, u32)>) -> Self {
        self.static_shape = shape;
        self
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            box_score_threshold: Self::default_box_score_threshold(),
            binarization_threshold: Self::default_binarization_threshold(),
            min_box_size: Self::default_min_box_size(),
            unclip_ratio: Self::default_unclip_ratio(),
            static_shape: None,
            max_side_limit: Self::default_max_side_limit(),
        }
    }
}

/// Configuration for the text-line orientation classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Fixed network input height.
    #[serde(default = "ClassifierConfig::default_input_height")]
    pub input_height: u32,

    /// Fixed network input width. Wider crops are cropped, narrower ones are
    /// right-padded with black.
    #[serde(default = "ClassifierConfig::default_input_width")]
    pub input_width: u32,

    /// Minimum confidence required before a crop is actually rotated.
    #[serde(default = "ClassifierConfig::default_rotation_threshold")]
    pub rotation_threshold: f32,
}

impl ClassifierConfig {
    fn default_input_height() -> u32 {
        48
    }

    fn default_input_width() -> u32 {
        192
    }

    fn default_rotation_threshold() -> f32 {
        0.75
    }

    /// Sets the rotation confidence threshold.
    pub fn with_rotation_threshold(mut self, threshold: f32) -> Self {
        self.rotation_threshold = threshold;
        self
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            input_height: Self::default_input_height(),
            input_width: Self::default_input_width(),
            rotation_threshold: Self::default_rotation_threshold(),
        }
    }
}

/// Configuration for the text recognition stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// Fixed network input height.
    #[serde(default = "RecognizerConfig::default_input_height")]
    pub input_height: u32,

    /// Optional static network input width. When set, every crop is resized
    /// to this width and all crops form a single batch.
    #[serde(default)]
    pub static_width: Option<u32>,

    /// Number of crops per recognition batch. `None` uses
    /// `min(8, available_parallelism)`.
    #[serde(default)]
    pub batch_size: Option<usize>,
}

impl RecognizerConfig {
    fn default_input_height() -> u32 {
        48
    }

    /// Sets a static network input width.
    pub fn with_static_width(mut self, width: Option<u32>) -> Self {
        self.static_width = width;
        self
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Resolved batch size, defaulting to `min(8, available_parallelism)`.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size
            .unwrap_or_else(|| 8.min(crate::core::available_parallelism()))
            .max(1)
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            input_height: Self::default_input_height(),
            static_width: None,
            batch_size: None,
        }
    }
}

/// Immutable top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Detection stage settings.
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Orientation classifier settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Recognition stage settings.
    #[serde(default)]
    pub recognizer: RecognizerConfig,

    /// When true, detected boxes are rectified with a perspective warp;
    /// otherwise the clamped axis-aligned bounding box is cropped.
    #[serde(default = "PipelineConfig::default_true")]
    pub rotated_crop: bool,

    /// When true, crops run through the orientation classifier before
    /// recognition. Requires a classifier model to be configured.
    #[serde(default)]
    pub correct_orientation: bool,
}

impl PipelineConfig {
    fn default_true() -> bool {
        true
    }

    /// Enables or disables perspective rectification of detected boxes.
    pub fn with_rotated_crop(mut self, enabled: bool) -> Self {
        self.rotated_crop = enabled;
        self
    }

    /// Enables or disables orientation correction.
    pub fn with_orientation_correction(mut self, enabled: bool) -> Self {
        self.correct_orientation = enabled;
        self
    }

    /// Replaces the detector section.
    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    /// Replaces the classifier section.
    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replaces the recognizer section.
    pub fn with_recognizer(mut self, recognizer: RecognizerConfig) -> Self {
        self.recognizer = recognizer;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            classifier: ClassifierConfig::default(),
            recognizer: RecognizerConfig::default(),
            rotated_crop: Self::default_true(),
            correct_orientation: false,
        }
    }
}
