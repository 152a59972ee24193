use crate::mask::Mask;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub type Frame = RgbImage;

#[derive(Clone, Debug)]
pub struct FrameRecord {
    pub frame: Frame,
    pub index: usize,
    pub ground_truth: Option<Mask>,
}

/// A sequential, finite stream of frames. It cannot be rewound.
pub trait FrameSource: Iterator<Item = FrameRecord> {}

impl<I> FrameSource for I where I: Iterator<Item = FrameRecord> {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticVideoConfig {
    pub num_frames: usize,
    pub width: u32,
    pub height: u32,
    pub radius: u32,
    /// Centre of the disk on frame 0.
    pub start: (i64, i64),
    /// Displacement of the disk per frame.
    pub step: (i64, i64),
    /// Frames strictly inside these bounds show no object.
    pub occluded_after: usize,
    pub occluded_before: usize,
}

impl Default for SyntheticVideoConfig {
    fn default() -> Self {
        Self {
            num_frames: 100,
            width: 640,
            height: 480,
            radius: 20,
            start: (50, 240),
            step: (5, 0),
            occluded_after: 40,
            occluded_before: 60,
        }
    }
}

/// A green disk moving over a black background, hidden for a while.
#[derive(Clone, Debug)]
pub struct SyntheticVideo {
    config: SyntheticVideoConfig,
    frames: Range<usize>,
}

impl SyntheticVideo {
    pub fn new(config: SyntheticVideoConfig) -> Self {
        let frames = 0..config.num_frames;
        Self { config, frames }
    }

    pub fn is_occluded(&self, index: usize) -> bool {
        let SyntheticVideoConfig {
            occluded_after,
            occluded_before,
            ..
        } = self.config;
        occluded_after < index && index < occluded_before
    }

    /// Centre of the object on frame `index`, visible or not.
    pub fn object_center(&self, index: usize) -> (i64, i64) {
        let SyntheticVideoConfig { start, step, .. } = self.config;
        let index = index as i64;
        (start.0 + step.0 * index, start.1 + step.1 * index)
    }

    fn render(&self, index: usize) -> FrameRecord {
        let SyntheticVideoConfig {
            width,
            height,
            radius,
            ..
        } = self.config;
        let (cx, cy) = self.object_center(index);
        let r2 = i64::from(radius) * i64::from(radius);
        let visible = !self.is_occluded(index);
        let covers = |x: i64, y: i64| visible && (x - cx).pow(2) + (y - cy).pow(2) <= r2;

        let frame = RgbImage::from_fn(width, height, |x, y| {
            if covers(i64::from(x), i64::from(y)) {
                Rgb([0, 255, 0])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let ground_truth = Mask::from_fn(width as usize, height as usize, |x, y| {
            covers(x as i64, y as i64)
        });

        FrameRecord {
            frame,
            index,
            ground_truth: Some(ground_truth),
        }
    }
}

impl Default for SyntheticVideo {
    fn default() -> Self {
        Self::new(SyntheticVideoConfig::default())
    }
}

impl Iterator for SyntheticVideo {
    type Item = FrameRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.frames.next()?;
        Some(self.render(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.frames.size_hint()
    }
}
