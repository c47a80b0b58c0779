//! Text-line recognition.

use crate::core::config::RecognizerConfig;
use crate::core::errors::OcrError;
use crate::core::inference::into_3d;
use crate::core::pool::InferencePool;
use crate::processors::batching::plan_batches;
use crate::processors::decode::{CtcDecoder, RecognizedText};
use crate::processors::normalization::centered_batch_tensor;
use crate::processors::resize::resize_for_recognition;
use image::RgbImage;
use std::sync::Arc;
use tracing::debug;

/// Recognizes the text on a set of upright line crops.
///
/// Crops are grouped into batches of similar aspect ratio, resized and padded
/// to each batch's shared width, run through the pooled recognition model, and
/// greedily CTC-decoded. Results come back in the caller's input order.
pub struct TextRecognizer {
    pool: Arc<InferencePool>,
    config: RecognizerConfig,
    decoder: CtcDecoder,
}

impl TextRecognizer {
    /// Creates a recognizer over a pooled recognition model and its character
    /// vocabulary.
    pub fn new(pool: Arc<InferencePool>, config: RecognizerConfig, charset: Vec<char>) -> Self {
        Self {
            pool,
            config,
            decoder: CtcDecoder::new(charset),
        }
    }

    /// Recognizes every crop, returning results in input order. An empty
    /// input returns immediately without touching the model.
    pub fn run(&self, crops: &[RgbImage]) -> Result<Vec<RecognizedText>, OcrError> {
        if crops.is_empty() {
            return Ok(Vec::new());
        }

        let dims: Vec<(u32, u32)> = crops.iter().map(|c| c.dimensions()).collect();
        let batches = plan_batches(
            &dims,
            self.config.input_height,
            self.config.effective_batch_size(),
            self.config.static_width,
        );

        let mut slot = self.pool.checkout()?;
        let mut results: Vec<Option<RecognizedText>> = vec![None; crops.len()];

        for batch in &batches {
            let resized: Vec<RgbImage> = batch
                .indices
                .iter()
                .map(|&i| {
                    resize_for_recognition(&crops[i], self.config.input_height, batch.target_width)
                })
                .collect();
            let input = centered_batch_tensor(&resized)?;

            let output = slot.run(&input)?;
            let predictions = into_3d(self.pool.model_name(), output)?;
            if predictions.shape()[0] != batch.indices.len() {
                return Err(OcrError::invalid_input(format!(
                    "recognizer '{}' returned {} items for a batch of {}",
                    self.pool.model_name(),
                    predictions.shape()[0],
                    batch.indices.len()
                )));
            }

            for (&index, decoded) in batch
                .indices
                .iter()
                .zip(self.decoder.decode_batch(&predictions))
            {
                results[index] = Some(decoded);
            }
        }
        slot.release();

        debug!(
            crops = crops.len(),
            batches = batches.len(),
            "text recognition finished"
        );
        results
            .into_iter()
            .map(|r| r.ok_or_else(|| OcrError::invalid_input("batch plan missed a crop")))
            .collect()
    }
}
