//! Pixel normalization into NCHW inference tensors.
//!
//! Detection uses the ImageNet channel statistics its backbone was trained
//! with; recognition and classification both map pixels into `[-1, 1]`.

use crate::core::errors::OcrError;
use crate::core::inference::Tensor4D;
use image::RgbImage;
use ndarray::Array4;

const DETECTION_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const DETECTION_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Builds the `[1, 3, h, w]` detection input tensor, normalized per channel
/// with the ImageNet mean and standard deviation.
pub fn detection_tensor(image: &RgbImage) -> Tensor4D {
    let (w, h) = image.dimensions();
    let mut tensor = Array4::zeros((1, 3, h as usize, w as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel.0[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - DETECTION_MEAN[c]) / DETECTION_STD[c];
        }
    }
    tensor
}

/// Stacks equally-sized crops into a `[n, 3, h, w]` tensor with each pixel
/// mapped to `p * (2/255) - 1`.
///
/// Used by both recognition and classification. Fails on an empty list or
/// mismatched crop dimensions.
pub fn centered_batch_tensor(images: &[RgbImage]) -> Result<Tensor4D, OcrError> {
    let first = images
        .first()
        .ok_or_else(|| OcrError::invalid_input("cannot build a tensor from zero crops"))?;
    let (w, h) = first.dimensions();

    let mut tensor = Array4::zeros((images.len(), 3, h as usize, w as usize));
    for (n, image) in images.iter().enumerate() {
        if image.dimensions() != (w, h) {
            return Err(OcrError::invalid_input(format!(
                "crop {} is {}x{}, batch expects {}x{}",
                n,
                image.width(),
                image.height(),
                w,
                h
            )));
        }
        for (x, y, pixel) in image.enumerate_pixels() {
            for c in 0..3 {
                tensor[[n, c, y as usize, x as usize]] = pixel.0[c] as f32 * (2.0 / 255.0) - 1.0;
            }
        }
    }
    Ok(tensor)
}
