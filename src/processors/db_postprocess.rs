//! Post-processing for DB-style text detection probability maps.
//!
//! [`DbPostProcess`] turns the raw per-pixel probability map produced by the
//! detection network into oriented text boxes: threshold, contour extraction,
//! polygon scoring, minimum-area rectangle, unclip enlargement, and rescaling
//! back to source-image coordinates.

use crate::core::config::DetectorConfig;
use crate::processors::geometry::{
    contour_points, min_area_rect, polygon_area, polygon_perimeter, OrientedBox, Point,
};
use image::GrayImage;
use imageproc::contours::find_contours;
use ndarray::Array2;
use tracing::debug;

/// Converts a detection probability map into sorted oriented text boxes.
#[derive(Debug)]
pub struct DbPostProcess {
    /// Minimum mean probability for a contour to survive. `None` disables
    /// the score check.
    pub score_threshold: Option<f32>,
    /// Binarization threshold applied before contour extraction, if any.
    pub binarization_threshold: Option<f32>,
    /// Boxes with enlarged width or height at or below this are dropped.
    pub min_box_size: f32,
    /// Unclip enlargement ratio.
    pub unclip_ratio: f32,
    /// Upper bound on contours considered per map.
    pub max_candidates: usize,
}

impl DbPostProcess {
    /// Builds a post-processor from the detector configuration.
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            score_threshold: config.box_score_threshold,
            binarization_threshold: config.binarization_threshold,
            min_box_size: config.min_box_size,
            unclip_ratio: config.unclip_ratio,
            max_candidates: 1000,
        }
    }

    /// Extracts oriented boxes from a probability map.
    ///
    /// `prob_map` covers the padded network input; only the
    /// `active_width x active_height` top-left sub-rectangle carries image
    /// content. `scale_to_source` maps processed coordinates back to the
    /// source image. Malformed or empty contour sets yield an empty vec.
    pub fn extract_boxes(
        &self,
        prob_map: &Array2<f32>,
        active_width: u32,
        active_height: u32,
        scale_to_source: (f32, f32),
    ) -> Vec<OrientedBox> {
        let map_h = prob_map.shape()[0] as u32;
        let map_w = prob_map.shape()[1] as u32;
        let active_w = active_width.min(map_w) as usize;
        let active_h = active_height.min(map_h) as usize;
        if active_w == 0 || active_h == 0 {
            return Vec::new();
        }

        let mut mask = GrayImage::new(active_w as u32, active_h as u32);
        for y in 0..active_h {
            for x in 0..active_w {
                let p = prob_map[[y, x]];
                let value = match self.binarization_threshold {
                    Some(threshold) => {
                        if p > threshold {
                            255
                        } else {
                            0
                        }
                    }
                    None => (p.clamp(0.0, 1.0) * 255.0) as u8,
                };
                mask.put_pixel(x as u32, y as u32, image::Luma([value]));
            }
        }

        let contours = find_contours::<u32>(&mask);
        let candidates = contours.len();
        let mut boxes = Vec::new();

        for contour in contours.into_iter().take(self.max_candidates) {
            let points = contour_points(&contour);
            if points.len() < 3 {
                continue;
            }

            if let Some(threshold) = self.score_threshold {
                let score = mean_score_in_polygon(prob_map, &points, active_w, active_h);
                if score < threshold {
                    continue;
                }
            }

            let perimeter = polygon_perimeter(&points);
            if perimeter <= f32::EPSILON {
                continue;
            }
            let margin = self.unclip_ratio * polygon_area(&points) / perimeter;

            let enlarged = min_area_rect(&points).enlarged(margin);

            // Size filtering happens before rescaling to source coordinates.
            if enlarged.width <= self.min_box_size || enlarged.height <= self.min_box_size {
                continue;
            }

            boxes.push(enlarged.scaled(scale_to_source.0, scale_to_source.1));
        }

        boxes.sort_by(|a, b| a.reading_order(b));
        debug!(
            candidates,
            kept = boxes.len(),
            "detection post-processing finished"
        );
        boxes
    }
}

/// Mean probability under the filled polygon, restricted to the polygon's
/// bounding box. Scanline fill: for each row, pixels between successive
/// edge-intersection pairs are inside the polygon.
fn mean_score_in_polygon(
    prob_map: &Array2<f32>,
    polygon: &[Point],
    active_w: usize,
    active_h: usize,
) -> f32 {
    let min_y = polygon
        .iter()
        .map(|p| p.y)
        .fold(f32::INFINITY, f32::min)
        .max(0.0) as usize;
    let max_y = (polygon.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max) as usize)
        .min(active_h.saturating_sub(1));

    let mut total = 0.0;
    let mut pixels = 0usize;
    let mut intersections: Vec<f32> = Vec::with_capacity(polygon.len());
    let n = polygon.len();

    for y in min_y..=max_y {
        let scan_y = y as f32;
        intersections.clear();
        for i in 0..n {
            let p1 = polygon[i];
            let p2 = polygon[(i + 1) % n];
            let crosses = (p1.y <= scan_y && scan_y < p2.y) || (p2.y <= scan_y && scan_y < p1.y);
            if crosses && (p2.y - p1.y).abs() > f32::EPSILON {
                intersections.push(p1.x + (scan_y - p1.y) * (p2.x - p1.x) / (p2.y - p1.y));
            }
        }
        intersections.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        for pair in intersections.chunks(2) {
            if pair.len() < 2 {
                continue;
            }
            let x1 = pair[0].max(0.0) as usize;
            let x2 = (pair[1] as usize).min(active_w.saturating_sub(1));
            for x in x1..=x2 {
                total += prob_map[[y, x]];
                pixels += 1;
            }
        }
    }

    if pixels == 0 {
        0.0
    } else {
        total / pixels as f32
    }
}
