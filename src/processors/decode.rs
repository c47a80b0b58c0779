//! Greedy CTC decoding for text recognition outputs.
//!
//! The recognition network emits a `[batch, timesteps, labels]` probability
//! tensor with a reserved blank label at index 0. Decoding takes the argmax
//! per timestep, drops blanks, collapses consecutive repeats, and averages
//! the surviving probabilities into a confidence score.

use crate::core::inference::Tensor3D;
use ndarray::Axis;
use tracing::debug;

/// Text and confidence for one recognized line.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    /// The decoded string, possibly empty.
    pub text: String,
    /// Sum of accepted label probabilities divided by decoded length.
    /// NaN when nothing was decoded; callers decide how to treat that.
    pub score: f32,
}

/// Greedy CTC decoder over a fixed character vocabulary.
///
/// Label index 0 is the blank; index `i > 0` maps to `charset[i - 1]`.
#[derive(Debug, Clone)]
pub struct CtcDecoder {
    charset: Vec<char>,
}

/// The blank label index reserved by the recognition head.
pub const BLANK_LABEL: usize = 0;

impl CtcDecoder {
    /// Creates a decoder over the given character vocabulary (without the
    /// blank; it is implicit at index 0).
    pub fn new(charset: Vec<char>) -> Self {
        Self { charset }
    }

    /// Number of label classes including the blank.
    pub fn label_count(&self) -> usize {
        self.charset.len() + 1
    }

    /// Decodes every batch item of a `[batch, timesteps, labels]` tensor.
    pub fn decode_batch(&self, predictions: &Tensor3D) -> Vec<RecognizedText> {
        let batch = predictions.shape()[0];
        let mut results = Vec::with_capacity(batch);
        for item in predictions.axis_iter(Axis(0)) {
            let mut text = String::new();
            let mut score_sum = 0.0f32;
            let mut accepted = 0usize;
            let mut previous = BLANK_LABEL;

            for row in item.outer_iter() {
                let (label, prob) = match row
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                {
                    Some((idx, &p)) => (idx, p),
                    None => (BLANK_LABEL, 0.0),
                };

                if label != BLANK_LABEL && label != previous {
                    if let Some(&ch) = self.charset.get(label - 1) {
                        text.push(ch);
                        score_sum += prob;
                        accepted += 1;
                    }
                }
                previous = label;
            }

            // Deliberately NaN for an all-blank decode; see score docs.
            let score = score_sum / accepted as f32;
            results.push(RecognizedText { text, score });
        }

        debug!(
            batch,
            decoded = results.iter().filter(|r| !r.text.is_empty()).count(),
            "ctc decode finished"
        );
        results
    }
}
