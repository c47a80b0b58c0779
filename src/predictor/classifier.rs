//! Text-line orientation classification.

use crate::core::config::ClassifierConfig;
use crate::core::errors::OcrError;
use crate::core::inference::into_2d;
use crate::core::pool::InferencePool;
use crate::processors::normalization::centered_batch_tensor;
use crate::processors::resize::resize_for_classification;
use image::{imageops, RgbImage};
use std::sync::Arc;
use tracing::debug;

/// Orientation decision for one crop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineOrientation {
    rotated: bool,
    confidence: f32,
}

impl LineOrientation {
    /// Whether the crop was judged upside-down with enough confidence to act.
    pub fn is_rotated(&self) -> bool {
        self.rotated
    }

    /// Probability of the winning class, regardless of the decision.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// Decides, per crop, whether the text line is upside-down.
///
/// The model emits a 2-class probability vector per crop; the odd class means
/// "rotated 180°". A crop only counts as rotated when that class wins with a
/// probability above the configured threshold.
pub struct LineOrientationClassifier {
    pool: Arc<InferencePool>,
    config: ClassifierConfig,
}

impl LineOrientationClassifier {
    /// Creates a classifier over a pooled orientation model.
    pub fn new(pool: Arc<InferencePool>, config: ClassifierConfig) -> Self {
        Self { pool, config }
    }

    /// Classifies each crop without touching it.
    pub fn orientations(&self, crops: &[RgbImage]) -> Result<Vec<LineOrientation>, OcrError> {
        if crops.is_empty() {
            return Ok(Vec::new());
        }

        let resized: Vec<RgbImage> = crops
            .iter()
            .map(|crop| {
                resize_for_classification(crop, self.config.input_height, self.config.input_width)
            })
            .collect();
        let input = centered_batch_tensor(&resized)?;

        let mut slot = self.pool.checkout()?;
        let output = slot.run(&input)?;
        slot.release();

        let scores = into_2d(self.pool.model_name(), output)?;
        if scores.shape()[0] != crops.len() {
            return Err(OcrError::invalid_input(format!(
                "classifier '{}' returned {} rows for {} crops",
                self.pool.model_name(),
                scores.shape()[0],
                crops.len()
            )));
        }

        let results = scores
            .outer_iter()
            .map(|row| {
                let (winner, probability) = row
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| {
                        a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .map(|(i, &p)| (i, p))
                    .unwrap_or((0, 0.0));
                LineOrientation {
                    rotated: winner % 2 == 1 && probability > self.config.rotation_threshold,
                    confidence: probability,
                }
            })
            .collect();
        Ok(results)
    }

    /// Classifies each crop and rotates the upside-down ones 180° in place.
    pub fn classify_and_correct(
        &self,
        crops: &mut [RgbImage],
    ) -> Result<Vec<LineOrientation>, OcrError> {
        let orientations = self.orientations(crops)?;
        let mut corrected = 0usize;
        for (crop, orientation) in crops.iter_mut().zip(&orientations) {
            if orientation.is_rotated() {
                imageops::rotate180_in_place(crop);
                corrected += 1;
            }
        }
        debug!(
            crops = crops.len(),
            corrected, "orientation classification finished"
        );
        Ok(orientations)
    }
}
