//! Pixel-buffer helpers: validation, channel conversion, clamped cropping,
//! and edge-replicated padding.

use crate::core::errors::OcrError;
use image::{imageops, ColorType, DynamicImage, RgbImage};

/// Width an image needs after an aspect-preserving resize to `target_height`.
pub fn needed_width_for_height(width: u32, height: u32, target_height: u32) -> u32 {
    if height == 0 {
        return 0;
    }
    ((width as u64 * target_height as u64).div_ceil(height as u64)) as u32
}

/// Rejects empty images before any inference runs.
pub fn validate_non_empty(image: &RgbImage) -> Result<(), OcrError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(OcrError::invalid_input(format!(
            "empty image ({}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

/// Converts caller input to RGB, accepting only 1- or 3-channel sources.
pub fn ensure_rgb(image: &DynamicImage) -> Result<RgbImage, OcrError> {
    match image.color() {
        ColorType::L8 | ColorType::L16 | ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => {
        }
        other => {
            return Err(OcrError::invalid_input(format!(
                "unsupported channel layout {:?}: expected 1 or 3 channels",
                other
            )));
        }
    }
    let rgb = image.to_rgb8();
    validate_non_empty(&rgb)?;
    Ok(rgb)
}

/// Crops the intersection of `(x0, y0)..(x1, y1)` with the image bounds.
pub fn crop_clamped(
    image: &RgbImage,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
) -> Result<RgbImage, OcrError> {
    let left = x0.clamp(0, image.width() as i64) as u32;
    let top = y0.clamp(0, image.height() as i64) as u32;
    let right = x1.clamp(0, image.width() as i64) as u32;
    let bottom = y1.clamp(0, image.height() as i64) as u32;
    if right <= left || bottom <= top {
        return Err(OcrError::invalid_input(format!(
            "crop region ({x0},{y0})..({x1},{y1}) lies outside the {}x{} image",
            image.width(),
            image.height()
        )));
    }
    Ok(imageops::crop_imm(image, left, top, right - left, bottom - top).to_image())
}

/// Pads an image by replicating its edge pixels.
pub fn pad_replicate(image: &RgbImage, left: u32, top: u32, right: u32, bottom: u32) -> RgbImage {
    if left == 0 && top == 0 && right == 0 && bottom == 0 {
        return image.clone();
    }
    let (w, h) = image.dimensions();
    let mut padded = RgbImage::new(w + left + right, h + top + bottom);
    for y in 0..padded.height() {
        let src_y = (y as i64 - top as i64).clamp(0, h as i64 - 1) as u32;
        for x in 0..padded.width() {
            let src_x = (x as i64 - left as i64).clamp(0, w as i64 - 1) as u32;
            padded.put_pixel(x, y, *image.get_pixel(src_x, src_y));
        }
    }
    padded
}

/// Swaps the image's axes: `out(x, y) = in(y, x)`.
pub fn transpose(image: &RgbImage) -> RgbImage {
    let (w, h) = image.dimensions();
    let mut out = RgbImage::new(h, w);
    for y in 0..h {
        for x in 0..w {
            out.put_pixel(y, x, *image.get_pixel(x, y));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn needed_width_rounds_up() {
        assert_eq!(needed_width_for_height(294, 27, 48), 523);
        assert_eq!(needed_width_for_height(100, 50, 50), 100);
        assert_eq!(needed_width_for_height(10, 0, 48), 0);
    }

    #[test]
    fn ensure_rgb_rejects_alpha_layouts() {
        let rgba = DynamicImage::new_rgba8(4, 4);
        assert!(matches!(
            ensure_rgb(&rgba),
            Err(OcrError::InvalidInput { .. })
        ));

        let gray = DynamicImage::new_luma8(4, 4);
        assert!(ensure_rgb(&gray).is_ok());
    }

    #[test]
    fn ensure_rgb_rejects_empty_images() {
        let empty = DynamicImage::new_rgb8(0, 0);
        assert!(ensure_rgb(&empty).is_err());
    }

    #[test]
    fn crop_clamped_intersects_with_bounds() {
        let img = RgbImage::from_pixel(10, 10, Rgb([7, 7, 7]));
        let crop = crop_clamped(&img, -5, -5, 4, 4).expect("crop");
        assert_eq!(crop.dimensions(), (4, 4));

        assert!(crop_clamped(&img, 20, 20, 30, 30).is_err());
    }

    #[test]
    fn pad_replicate_extends_edges() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([10, 0, 0]));
        img.put_pixel(1, 0, Rgb([20, 0, 0]));

        let padded = pad_replicate(&img, 1, 1, 1, 1);
        assert_eq!(padded.dimensions(), (4, 3));
        assert_eq!(padded.get_pixel(0, 0).0, [10, 0, 0]);
        assert_eq!(padded.get_pixel(3, 2).0, [20, 0, 0]);
    }

    #[test]
    fn transpose_swaps_axes() {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(2, 0, Rgb([9, 9, 9]));
        let t = transpose(&img);
        assert_eq!(t.dimensions(), (2, 3));
        assert_eq!(t.get_pixel(0, 2).0, [9, 9, 9]);
    }
}
