//! Segmentation detectors.
//!
//! The tracker treats a detector as a black box producing one mask and one
//! confidence score per frame. [ColorDetector] is a deterministic stand-in
//! that fills the largest outer contour inside an HSV colour range.

use crate::{frame_source::Frame, mask::Mask};
use image::{imageops::replace, GrayImage, Luma};
use imageproc::{
    contours::{find_contours, BorderType},
    map::map_colors,
    point::Point,
    region_labelling::{connected_components, Connectivity},
};
use itertools::Itertools;
use noisy_float::prelude::r64;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// One frame's segmentation result.
#[derive(Clone, Debug)]
pub struct Detection {
    pub mask: Mask,
    /// Confidence in `[0, 1]`.
    pub score: f64,
}

pub trait Detector {
    fn predict(&mut self, frame: &Frame) -> Detection;
}

impl<F> Detector for F
where
    F: FnMut(&Frame) -> Detection,
{
    fn predict(&mut self, frame: &Frame) -> Detection {
        self(frame)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorDetectorConfig {
    /// Inclusive lower HSV bound, hue in `0..180`.
    pub hsv_lower: [u8; 3],
    /// Inclusive upper HSV bound, hue in `0..180`.
    pub hsv_upper: [u8; 3],
    /// Contours must enclose strictly more than this polygon area.
    pub min_area: f64,
    /// Score reported for an accepted blob.
    pub found_score: f64,
    /// Score reported when only contours below `min_area` were found.
    pub too_small_score: f64,
    /// Score reported when no pixel matched.
    pub missing_score: f64,
}

impl Default for ColorDetectorConfig {
    fn default() -> Self {
        Self {
            hsv_lower: [40, 40, 40],
            hsv_upper: [80, 255, 255],
            min_area: 100.0,
            found_score: 0.95,
            too_small_score: 0.1,
            missing_score: 0.05,
        }
    }
}

/// Keeps the largest outer contour within a colour range, filled.
#[derive(Clone, Debug, Default)]
pub struct ColorDetector {
    config: ColorDetectorConfig,
}

impl ColorDetector {
    pub fn new(config: ColorDetectorConfig) -> Self {
        Self { config }
    }

    fn in_range(&self, hsv: [u8; 3]) -> bool {
        let ColorDetectorConfig {
            hsv_lower,
            hsv_upper,
            ..
        } = &self.config;
        (0..3).all(|c| hsv_lower[c] <= hsv[c] && hsv[c] <= hsv_upper[c])
    }
}

impl Detector for ColorDetector {
    fn predict(&mut self, frame: &Frame) -> Detection {
        let (width, height) = (frame.width() as usize, frame.height() as usize);
        let threshold: GrayImage = map_colors(frame, |pixel| {
            Luma([if self.in_range(rgb_to_hsv(pixel.0)) { 255 } else { 0 }])
        });
        // Contours are traced on a copy framed by one background pixel.
        let mut padded = GrayImage::new(width as u32 + 2, height as u32 + 2);
        replace(&mut padded, &threshold, 1, 1);

        let largest = find_contours::<i32>(&padded)
            .into_iter()
            .filter(|contour| matches!(contour.border_type, BorderType::Outer))
            .map(|contour| (polygon_area(&contour.points), contour.points))
            .max_by_key(|(area, _)| r64(*area));

        let (mask, score) = match largest {
            Some((area, points)) if area > self.config.min_area => {
                (fill_contour(&points, width, height), self.config.found_score)
            }
            Some((area, _)) => {
                trace!(area, "contour below minimum area");
                (Mask::new(width, height), self.config.too_small_score)
            }
            None => (Mask::new(width, height), self.config.missing_score),
        };
        Detection { mask, score }
    }
}

/// 8-bit HSV with hue halved into `0..180`.
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };
    let h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [
        ((h / 2.0).round() as u8).min(179),
        s.round() as u8,
        v as u8,
    ]
}

/// Shoelace area of a closed contour through pixel centres.
fn polygon_area(points: &[Point<i32>]) -> f64 {
    let twice: i64 = points
        .iter()
        .circular_tuple_windows()
        .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
        .sum();
    twice.abs() as f64 / 2.0
}

/// Everything the contour encloses, holes included, plus the contour itself.
///
/// `points` are in the one-pixel padded frame. Whatever is not 4-connected
/// to the padding lies inside.
fn fill_contour(points: &[Point<i32>], width: usize, height: usize) -> Mask {
    let mut canvas = GrayImage::new(width as u32 + 2, height as u32 + 2);
    for point in points {
        canvas.put_pixel(point.x as u32, point.y as u32, Luma([255]));
    }
    let labels = connected_components(&canvas, Connectivity::Four, Luma([255]));
    let outside = labels.get_pixel(0, 0).0[0];
    Mask::from_fn(width, height, |x, y| {
        labels.get_pixel(x as u32 + 1, y as u32 + 1).0[0] != outside
    })
}
