//! Text region detection.

use crate::core::config::DetectorConfig;
use crate::core::errors::OcrError;
use crate::core::inference::into_4d;
use crate::core::pool::InferencePool;
use crate::processors::db_postprocess::DbPostProcess;
use crate::processors::geometry::OrientedBox;
use crate::processors::normalization::detection_tensor;
use crate::processors::resize::resize_for_detection;
use crate::utils::image::validate_non_empty;
use image::RgbImage;
use ndarray::Axis;
use std::sync::Arc;
use tracing::debug;

/// Finds oriented text boxes in a source image.
///
/// One `run` call resizes the image onto the network canvas, executes the
/// detection model through the pool, and reduces the resulting probability
/// map to sorted boxes in source coordinates.
pub struct TextDetector {
    pool: Arc<InferencePool>,
    config: DetectorConfig,
    postprocess: DbPostProcess,
}

impl TextDetector {
    /// Creates a detector over a pooled detection model.
    pub fn new(pool: Arc<InferencePool>, config: DetectorConfig) -> Self {
        let postprocess = DbPostProcess::from_config(&config);
        Self {
            pool,
            config,
            postprocess,
        }
    }

    /// Detects text boxes, sorted ascending by `(center.y, center.x)`.
    pub fn run(&self, image: &RgbImage) -> Result<Vec<OrientedBox>, OcrError> {
        validate_non_empty(image)?;

        let resized = resize_for_detection(image, &self.config)?;
        let input = detection_tensor(&resized.image);

        let mut slot = self.pool.checkout()?;
        let output = slot.run(&input)?;
        slot.release();

        let map = into_4d(self.pool.model_name(), output)?;
        if map.shape()[0] != 1 || map.shape()[1] != 1 {
            return Err(OcrError::invalid_input(format!(
                "detection model '{}' produced shape {:?}, expected [1, 1, h, w]",
                self.pool.model_name(),
                map.shape()
            )));
        }
        let prob_map = map.index_axis(Axis(0), 0).index_axis(Axis(0), 0).to_owned();

        let boxes = self.postprocess.extract_boxes(
            &prob_map,
            resized.active_width,
            resized.active_height,
            resized.scale_to_source,
        );
        debug!(boxes = boxes.len(), "text detection finished");
        Ok(boxes)
    }
}
