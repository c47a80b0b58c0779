//! Aspect-ratio batching for text recognition.
//!
//! Crops of similar aspect ratio are grouped so that each batch shares one
//! padded width, keeping the padding waste (and its accuracy cost) low while
//! still amortizing inference over several crops. Batch composition is pure
//! planning — the actual resize/pad happens in [`crate::processors::resize`].

use crate::utils::image::needed_width_for_height;
use tracing::debug;

/// Width stride the recognition network requires.
pub const WIDTH_STRIDE: u32 = 32;

/// One planned recognition batch: which input indices it contains and the
/// padded width they all share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionBatch {
    /// Indices into the caller's crop list, aspect-ratio order.
    pub indices: Vec<usize>,
    /// Common padded width for every crop in the batch.
    pub target_width: u32,
}

/// Rounds a width up to the next multiple of [`WIDTH_STRIDE`].
pub fn round_up_to_stride(width: u32) -> u32 {
    width.div_ceil(WIDTH_STRIDE) * WIDTH_STRIDE
}

/// Plans recognition batches over crops with the given `(width, height)`
/// dimensions.
///
/// Crops are sorted by aspect ratio ascending and split into consecutive
/// chunks of `batch_size`. Each chunk's target width is the largest
/// stride-rounded width needed by any member at `model_height`. When
/// `static_width` is configured the network shape is fixed: every crop
/// becomes its own batch at exactly that width.
pub fn plan_batches(
    dims: &[(u32, u32)],
    model_height: u32,
    batch_size: usize,
    static_width: Option<u32>,
) -> Vec<RecognitionBatch> {
    if dims.is_empty() {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..dims.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = dims[a].0 as f32 / dims[a].1.max(1) as f32;
        let rb = dims[b].0 as f32 / dims[b].1.max(1) as f32;
        ra.partial_cmp(&rb).unwrap_or(std::cmp::Ordering::Equal)
    });

    let chunk_size = if static_width.is_some() {
        1
    } else {
        batch_size.max(1)
    };

    let batches: Vec<RecognitionBatch> = order
        .chunks(chunk_size)
        .map(|chunk| {
            let target_width = match static_width {
                Some(width) => width,
                None => chunk
                    .iter()
                    .map(|&i| {
                        let (w, h) = dims[i];
                        round_up_to_stride(needed_width_for_height(w, h, model_height))
                    })
                    .max()
                    .unwrap_or(WIDTH_STRIDE),
            };
            RecognitionBatch {
                indices: chunk.to_vec(),
                target_width,
            }
        })
        .collect();

    debug!(
        crops = dims.len(),
        batches = batches.len(),
        "planned recognition batches"
    );
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_plans_nothing() {
        assert!(plan_batches(&[], 48, 8, None).is_empty());
    }

    #[test]
    fn chunk_width_is_max_of_members() {
        // Heights equal the model height so needed width == source width.
        let dims = [(100, 48), (300, 48), (220, 48)];
        let batches = plan_batches(&dims, 48, 8, None);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].target_width, round_up_to_stride(300));
        // Aspect-ratio ascending: 100, 220, 300.
        assert_eq!(batches[0].indices, vec![0, 2, 1]);
    }

    #[test]
    fn splits_into_consecutive_chunks_of_batch_size() {
        let dims: Vec<(u32, u32)> = (1..=5).map(|i| (i * 64, 48)).collect();
        let batches = plan_batches(&dims, 48, 2, None);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].indices.len(), 2);
        assert_eq!(batches[2].indices.len(), 1);
        // Widths are non-decreasing because of the aspect-ratio sort.
        assert!(batches[0].target_width <= batches[1].target_width);
        assert!(batches[1].target_width <= batches[2].target_width);
    }

    #[test]
    fn static_width_makes_single_image_batches() {
        let dims = [(100, 30), (600, 20), (50, 50)];
        let batches = plan_batches(&dims, 48, 8, Some(512));
        assert_eq!(batches.len(), 3);
        for batch in &batches {
            assert_eq!(batch.indices.len(), 1);
            assert_eq!(batch.target_width, 512);
        }
    }

    #[test]
    fn widths_are_stride_multiples() {
        let dims = [(294, 27), (1024, 48), (512, 30)];
        for batch in plan_batches(&dims, 48, 1, None) {
            assert_eq!(batch.target_width % WIDTH_STRIDE, 0);
        }
    }

    #[test]
    fn every_index_appears_exactly_once() {
        let dims: Vec<(u32, u32)> = (0..13).map(|i| (64 + i * 17, 20 + i)).collect();
        let batches = plan_batches(&dims, 48, 4, None);
        let mut seen: Vec<usize> = batches.iter().flat_map(|b| b.indices.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..13).collect::<Vec<_>>());
    }
}
