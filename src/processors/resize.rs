//! Network-input resizing for detection, classification, and recognition.
//!
//! The detection network takes a stride-aligned canvas with the image content
//! in the top-left corner; recognition and classification take fixed-height
//! line crops padded or clipped to a target width.

use crate::core::config::DetectorConfig;
use crate::core::errors::OcrError;
use crate::processors::batching::round_up_to_stride;
use crate::utils::image::needed_width_for_height;
use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::trace;

/// A detection input canvas plus the bookkeeping needed to map results back.
#[derive(Debug)]
pub struct ResizedDetectionInput {
    /// Stride-aligned canvas with content in the top-left corner.
    pub image: RgbImage,
    /// Width of the content region before padding.
    pub active_width: u32,
    /// Height of the content region before padding.
    pub active_height: u32,
    /// Multiply processed coordinates by this to get source coordinates.
    pub scale_to_source: (f32, f32),
}

/// Resizes a source image for the detection network.
///
/// With a static shape configured the image is scaled down to fit inside it
/// and never upscaled; otherwise the longer side is capped at
/// `max_side_limit`. The content is placed top-left on a black canvas whose
/// sides are multiples of the network stride.
pub fn resize_for_detection(
    image: &RgbImage,
    config: &DetectorConfig,
) -> Result<ResizedDetectionInput, OcrError> {
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(OcrError::invalid_input("cannot resize an empty image"));
    }

    let (scale, canvas_w, canvas_h) = match config.static_shape {
        Some((shape_h, shape_w)) => {
            if shape_w == 0 || shape_h == 0 {
                return Err(OcrError::config(format!(
                    "static detection shape {}x{} must be positive",
                    shape_w, shape_h
                )));
            }
            let scale = (shape_w as f32 / src_w as f32)
                .min(shape_h as f32 / src_h as f32)
                .min(1.0);
            (
                scale,
                round_up_to_stride(shape_w),
                round_up_to_stride(shape_h),
            )
        }
        None => {
            let longest = src_w.max(src_h);
            let scale = (config.max_side_limit as f32 / longest as f32).min(1.0);
            let active_w = ((src_w as f32 * scale).round() as u32).max(1);
            let active_h = ((src_h as f32 * scale).round() as u32).max(1);
            (
                scale,
                round_up_to_stride(active_w),
                round_up_to_stride(active_h),
            )
        }
    };

    let active_w = ((src_w as f32 * scale).round() as u32).max(1).min(canvas_w);
    let active_h = ((src_h as f32 * scale).round() as u32).max(1).min(canvas_h);

    let resized = if (active_w, active_h) == (src_w, src_h) {
        image.clone()
    } else {
        imageops::resize(image, active_w, active_h, FilterType::Triangle)
    };

    let mut canvas = RgbImage::new(canvas_w, canvas_h);
    imageops::replace(&mut canvas, &resized, 0, 0);

    trace!(
        src_w,
        src_h,
        active_w,
        active_h,
        canvas_w,
        canvas_h,
        "resized detection input"
    );
    Ok(ResizedDetectionInput {
        image: canvas,
        active_width: active_w,
        active_height: active_h,
        scale_to_source: (src_w as f32 / active_w as f32, src_h as f32 / active_h as f32),
    })
}

/// Resizes a line crop for recognition: aspect-preserving to `model_height`,
/// width clamped to `target_width`, right-padded with black.
pub fn resize_for_recognition(image: &RgbImage, model_height: u32, target_width: u32) -> RgbImage {
    let (src_w, src_h) = image.dimensions();
    let needed = needed_width_for_height(src_w, src_h, model_height).max(1);
    let width = needed.min(target_width);
    let resized = imageops::resize(image, width, model_height, FilterType::Triangle);

    let mut canvas = RgbImage::new(target_width, model_height);
    let pad_top = (model_height - resized.height()) / 2;
    imageops::replace(&mut canvas, &resized, 0, pad_top as i64);
    canvas
}

/// Resizes a crop for the orientation classifier: aspect-preserving to
/// `model_height`, then clipped to `model_width` (cropped if wider,
/// right-padded with black if narrower).
pub fn resize_for_classification(image: &RgbImage, model_height: u32, model_width: u32) -> RgbImage {
    let (src_w, src_h) = image.dimensions();
    let needed = needed_width_for_height(src_w, src_h, model_height).max(1);
    let resized = imageops::resize(image, needed, model_height, FilterType::Triangle);

    if needed >= model_width {
        return imageops::crop_imm(&resized, 0, 0, model_width, model_height).to_image();
    }
    let mut canvas = RgbImage::new(model_width, model_height);
    imageops::replace(&mut canvas, &resized, 0, 0);
    canvas
}
