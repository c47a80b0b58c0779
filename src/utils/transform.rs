//! Perspective rectification of oriented text boxes.
//!
//! Detected boxes are rotated rectangles in source-image coordinates. Before
//! recognition each one is warped into an upright crop: the region under the
//! box is cut out (edge-replicating where the box reaches past the image), a
//! perspective transform maps the box corners onto an axis-aligned rectangle,
//! and the result is re-oriented so the text reads left to right.

use crate::core::errors::OcrError;
use crate::processors::geometry::{OrientedBox, Point};
use crate::utils::image::{crop_clamped, pad_replicate, transpose};
use image::{imageops, RgbImage};
use nalgebra::{SMatrix, SVector};
use rayon::prelude::*;

/// Maximum tilt, in degrees, at which a wide box is taken to read in its
/// natural corner order.
const UPRIGHT_ANGLE_LIMIT: f32 = 45.0;

/// Warps the region under `bounds` into an upright crop of the box's own
/// width and height.
///
/// Boxes taller than wide come back transposed so the text runs
/// horizontally; wide boxes tilted past 45° are flipped horizontally to
/// restore reading direction. Returns [`OcrError::InvalidInput`] when the
/// box lies entirely outside the image.
pub fn rectify_oriented_box(source: &RgbImage, bounds: &OrientedBox) -> Result<RgbImage, OcrError> {
    let (min_x, min_y, max_x, max_y) = bounds.bounding_rect();
    let left = min_x.floor() as i64;
    let top = min_y.floor() as i64;
    let right = max_x.ceil() as i64 + 1;
    let bottom = max_y.ceil() as i64 + 1;

    let pad_left = (-left).max(0) as u32;
    let pad_top = (-top).max(0) as u32;
    let pad_right = (right - source.width() as i64).max(0) as u32;
    let pad_bottom = (bottom - source.height() as i64).max(0) as u32;

    let cropped = crop_clamped(source, left, top, right, bottom)?;
    let region = pad_replicate(&cropped, pad_left, pad_top, pad_right, pad_bottom);

    // Box corners relative to the padded region's origin.
    let corners = bounds
        .corner_points()
        .map(|p| Point::new(p.x - left as f32, p.y - top as f32));

    let out_w = (bounds.width.round() as u32).max(1);
    let out_h = (bounds.height.round() as u32).max(1);
    let destination = [
        Point::new(0.0, 0.0),
        Point::new(out_w as f32, 0.0),
        Point::new(out_w as f32, out_h as f32),
        Point::new(0.0, out_h as f32),
    ];

    let matrix = perspective_coefficients(&destination, &corners)?;
    let warped = warp_nearest(&region, &matrix, out_w, out_h);

    if !bounds.is_wide() {
        return Ok(transpose(&warped));
    }
    if bounds.angle > UPRIGHT_ANGLE_LIMIT {
        let mut flipped = warped;
        imageops::flip_horizontal_in_place(&mut flipped);
        return Ok(flipped);
    }
    Ok(warped)
}

/// Clamped axis-aligned crop of the box's bounding rectangle, used when
/// rotation-aware cropping is disabled.
pub fn axis_aligned_crop(source: &RgbImage, bounds: &OrientedBox) -> Result<RgbImage, OcrError> {
    let (min_x, min_y, max_x, max_y) = bounds.bounding_rect();
    crop_clamped(
        source,
        min_x.floor() as i64,
        min_y.floor() as i64,
        max_x.ceil() as i64,
        max_y.ceil() as i64,
    )
}

/// Solves for the homography mapping `from` points onto `to` points.
///
/// The eight coefficients `a..h` satisfy, for each correspondence,
/// `x = (a*u + b*v + c) / (g*u + h*v + 1)` and
/// `y = (d*u + e*v + f) / (g*u + h*v + 1)`.
fn perspective_coefficients(from: &[Point; 4], to: &[Point; 4]) -> Result<[f64; 8], OcrError> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for i in 0..4 {
        let (u, v) = (from[i].x as f64, from[i].y as f64);
        let (x, y) = (to[i].x as f64, to[i].y as f64);

        a[(2 * i, 0)] = u;
        a[(2 * i, 1)] = v;
        a[(2 * i, 2)] = 1.0;
        a[(2 * i, 6)] = -u * x;
        a[(2 * i, 7)] = -v * x;
        b[2 * i] = x;

        a[(2 * i + 1, 3)] = u;
        a[(2 * i + 1, 4)] = v;
        a[(2 * i + 1, 5)] = 1.0;
        a[(2 * i + 1, 6)] = -u * y;
        a[(2 * i + 1, 7)] = -v * y;
        b[2 * i + 1] = y;
    }

    let solution = a
        .lu()
        .solve(&b)
        .ok_or_else(|| OcrError::invalid_input("degenerate box corners: no perspective solution"))?;

    let mut coefficients = [0.0; 8];
    coefficients.copy_from_slice(solution.as_slice());
    Ok(coefficients)
}

/// Nearest-neighbor perspective warp with replicate-border sampling.
fn warp_nearest(source: &RgbImage, matrix: &[f64; 8], out_w: u32, out_h: u32) -> RgbImage {
    let (src_w, src_h) = source.dimensions();
    let max_x = src_w.saturating_sub(1) as i64;
    let max_y = src_h.saturating_sub(1) as i64;
    let mut buffer = vec![0u8; out_w as usize * out_h as usize * 3];

    buffer
        .par_chunks_mut(out_w as usize * 3)
        .enumerate()
        .for_each(|(row, pixels)| {
            let v = row as f64 + 0.5;
            for col in 0..out_w as usize {
                let u = col as f64 + 0.5;
                let denominator = matrix[6] * u + matrix[7] * v + 1.0;
                let x = (matrix[0] * u + matrix[1] * v + matrix[2]) / denominator;
                let y = (matrix[3] * u + matrix[4] * v + matrix[5]) / denominator;

                // Pixel centers sit at half-integer coordinates, so the
                // nearest source pixel is the floor of the mapped point.
                let sx = (x.floor() as i64).clamp(0, max_x) as u32;
                let sy = (y.floor() as i64).clamp(0, max_y) as u32;
                let pixel = source.get_pixel(sx, sy).0;
                pixels[col * 3..col * 3 + 3].copy_from_slice(&pixel);
            }
        });

    RgbImage::from_raw(out_w, out_h, buffer).unwrap_or_else(|| RgbImage::new(out_w, out_h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Image whose pixel at (x, y) encodes its own coordinates.
    fn coordinate_image(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([x as u8, y as u8, 0]))
    }

    #[test]
    fn axis_aligned_wide_box_matches_direct_crop() {
        let img = coordinate_image(40, 30);
        let bounds = OrientedBox::new(Point::new(20.0, 15.0), 10.0, 4.0, 0.0);

        let rectified = rectify_oriented_box(&img, &bounds).expect("rectify");
        assert_eq!(rectified.dimensions(), (10, 4));
        // Top-left of the box sits at (15, 13); the warp is a translation.
        assert_eq!(rectified.get_pixel(0, 0).0[0], 15);
        assert_eq!(rectified.get_pixel(0, 0).0[1], 13);
        assert_eq!(rectified.get_pixel(9, 3).0[0], 24);
    }

    #[test]
    fn tall_box_comes_back_transposed() {
        let img = coordinate_image(40, 40);
        let bounds = OrientedBox::new(Point::new(20.0, 20.0), 4.0, 12.0, 0.0);

        let rectified = rectify_oriented_box(&img, &bounds).expect("rectify");
        assert_eq!(rectified.dimensions(), (12, 4));
    }

    #[test]
    fn out_of_bounds_box_replicates_edges() {
        let img = RgbImage::from_pixel(10, 10, Rgb([50, 50, 50]));
        let bounds = OrientedBox::new(Point::new(0.0, 5.0), 8.0, 4.0, 0.0);

        let rectified = rectify_oriented_box(&img, &bounds).expect("rectify");
        assert_eq!(rectified.dimensions(), (8, 4));
        // The left half lies outside the image and replicates column zero.
        assert_eq!(rectified.get_pixel(0, 0).0, [50, 50, 50]);
    }

    #[test]
    fn fully_outside_box_is_rejected() {
        let img = RgbImage::new(10, 10);
        let bounds = OrientedBox::new(Point::new(100.0, 100.0), 8.0, 4.0, 0.0);
        assert!(matches!(
            rectify_oriented_box(&img, &bounds),
            Err(OcrError::InvalidInput { .. })
        ));
    }

    #[test]
    fn rotated_box_is_warped_upright() {
        // A 16x6 stripe rotated 30 degrees inside a dark background.
        let mut img = RgbImage::new(60, 60);
        let bounds = OrientedBox::new(Point::new(30.0, 30.0), 16.0, 6.0, 30.0);
        let corners = bounds.corner_points();
        let (rad_s, rad_c) = 30.0_f32.to_radians().sin_cos();
        for y in 0..60 {
            for x in 0..60 {
                // Inverse-rotate into the box frame to paint the stripe.
                let dx = x as f32 - 30.0;
                let dy = y as f32 - 30.0;
                let bx = dx * rad_c + dy * rad_s;
                let by = -dx * rad_s + dy * rad_c;
                if bx.abs() <= 8.0 && by.abs() <= 3.0 {
                    img.put_pixel(x, y, Rgb([255, 255, 255]));
                }
            }
        }
        assert!(corners.iter().all(|p| p.x > 0.0 && p.y > 0.0));

        let rectified = rectify_oriented_box(&img, &bounds).expect("rectify");
        assert_eq!(rectified.dimensions(), (16, 6));
        // Interior of the upright crop is stripe, not background.
        let center = rectified.get_pixel(8, 3).0;
        assert_eq!(center, [255, 255, 255]);
    }

    #[test]
    fn steep_wide_box_is_flipped_horizontally() {
        let img = coordinate_image(50, 50);
        let bounds = OrientedBox::new(Point::new(25.0, 25.0), 12.0, 5.0, 60.0);

        let rectified = rectify_oriented_box(&img, &bounds).expect("rectify");
        assert_eq!(rectified.dimensions(), (12, 5));

        // X coordinates must decrease left to right after the flip.
        let left = rectified.get_pixel(1, 2).0;
        let right = rectified.get_pixel(10, 2).0;
        assert!(left[0] > right[0]);
    }

    #[test]
    fn axis_aligned_crop_clamps_to_image() {
        let img = coordinate_image(20, 20);
        let bounds = OrientedBox::new(Point::new(0.0, 0.0), 10.0, 6.0, 0.0);
        let crop = axis_aligned_crop(&img, &bounds).expect("crop");
        assert_eq!(crop.dimensions(), (5, 3));
        assert_eq!(crop.get_pixel(0, 0).0, [0, 0, 0]);
    }
}
