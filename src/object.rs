use crate::mask::Mask;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Tracking,
    Occluded,
}

impl Status {
    pub fn is_occluded(&self) -> bool {
        matches!(self, Status::Occluded)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Tracking => f.write_str("Tracking"),
            Status::Occluded => f.write_str("Occluded (KF Prediction)"),
        }
    }
}

/// Reliability verdict for one frame's detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub is_reliable: bool,
    /// Weighted fusion of detector score and normalized area.
    pub quality: f64,
    /// Threshold the quality was compared against.
    pub threshold: f64,
    /// Foreground pixels over total pixels.
    pub norm_area: f64,
}

/// Snapshot of the tracker's motion state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerState {
    pub position_estimate: Point2<f64>,
    pub velocity_estimate: Vector2<f64>,
    pub last_valid_position: Option<Point2<f64>>,
    pub is_occluded: bool,
}

/// What the tracker emits for every frame.
#[derive(Clone, Debug)]
pub struct FrameOutput {
    pub frame_index: usize,
    /// Never empty.
    pub refined_mask: Mask,
    pub position: (i32, i32),
    pub status: Status,
    pub assessment: QualityAssessment,
    /// Frame index of the memory entry the mask was recovered from, if any.
    pub recovered_from: Option<usize>,
}
