use crate::{
    config::Config,
    error::Result,
    kalman::KalmanFilter,
    mask::Mask,
    memory::MaskMemory,
    object::{FrameOutput, Status, TrackerState},
    quality_gate::QualityGate,
};
use nalgebra::Point2;
use tracing::{debug, info};

/// This is the main struct to follow one object through a video.
///
/// Every frame runs predict, evaluate and then either correct-and-store or
/// recover, in that order. One tracker serves exactly one stream.
pub struct Tracker {
    kalman_filter: KalmanFilter,
    quality_gate: QualityGate,
    memory: Option<MaskMemory>,
    fallback_radius: u32,
    last_valid_position: Option<Point2<f64>>,
    status: Option<Status>,
}

impl Tracker {
    /// This is the function to build a Tracker.
    ///
    /// Example:
    ///
    /// ```rust
    /// use mask_tracking::config::Config;
    /// use mask_tracking::Tracker;
    ///
    /// let mut config = Config::default();
    /// config.quality_gate.window_size = 10;
    /// config.memory.capacity = 30;
    /// let tracker = Tracker::new(&config).unwrap();
    /// ```
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        info!(
            adaptive_gate = config.quality_gate.enabled,
            memory_recovery = config.memory.enabled,
            "tracker created"
        );
        Ok(Self {
            kalman_filter: KalmanFilter::new(&config.estimator),
            quality_gate: QualityGate::new(&config.quality_gate),
            memory: config.memory.enabled.then(|| MaskMemory::new(&config.memory)),
            fallback_radius: config.fallback_radius,
            last_valid_position: None,
            status: None,
        })
    }

    /// This is the function to track the object in one frame.
    ///
    /// Example:
    ///
    /// ```rust
    /// # use mask_tracking::config::Config;
    /// # use mask_tracking::Tracker;
    /// use mask_tracking::mask::Mask;
    /// use mask_tracking::object::Status;
    ///
    /// let mut tracker = Tracker::new(&Config::default()).unwrap();
    /// let blob = Mask::from_fn(64, 48, |x, y| (20..30).contains(&x) && (10..20).contains(&y));
    /// let output = tracker.track_frame(0, &blob, 0.95);
    /// assert_eq!(output.status, Status::Tracking);
    /// assert_eq!(output.position, (24, 14));
    ///
    /// let output = tracker.track_frame(1, &Mask::new(64, 48), 0.0);
    /// assert_eq!(output.status, Status::Occluded);
    /// assert!(!output.refined_mask.is_empty());
    /// ```
    pub fn track_frame(&mut self, frame_index: usize, mask: &Mask, score: f64) -> FrameOutput {
        let predicted = self.kalman_filter.predict();
        let assessment = self.quality_gate.evaluate(mask, score);

        let measured = if assessment.is_reliable {
            mask.centroid()
        } else {
            None
        };

        let output = match measured {
            Some(measured) => {
                self.kalman_filter.correct(measured);
                if let Some(memory) = &mut self.memory {
                    memory.store(frame_index, mask, assessment.quality);
                }
                self.last_valid_position = Some(measured);
                FrameOutput {
                    frame_index,
                    refined_mask: mask.clone(),
                    position: to_pixel(measured),
                    status: Status::Tracking,
                    assessment,
                    recovered_from: None,
                }
            }
            None => {
                let (width, height) = mask.shape();
                let recovered = self
                    .memory
                    .as_ref()
                    .and_then(|memory| memory.retrieve(predicted, (width, height)))
                    .filter(|recovered| !recovered.mask.is_empty());
                let position = to_pixel(predicted);

                let (refined_mask, recovered_from) = match recovered {
                    Some(recovered) => (recovered.mask, Some(recovered.source_frame)),
                    None => {
                        debug!(frame_index, x = position.0, y = position.1, "synthetic fallback mask");
                        let center = (i64::from(position.0), i64::from(position.1));
                        (Mask::disk(width, height, center, self.fallback_radius), None)
                    }
                };
                FrameOutput {
                    frame_index,
                    refined_mask,
                    position,
                    status: Status::Occluded,
                    assessment,
                    recovered_from,
                }
            }
        };

        if self.status != Some(output.status) {
            info!(frame_index, status = %output.status, "tracking status changed");
        }
        self.status = Some(output.status);
        debug!(
            frame_index,
            status = %output.status,
            quality = output.assessment.quality,
            threshold = output.assessment.threshold,
            "frame tracked"
        );
        output
    }

    pub fn state(&self) -> TrackerState {
        let state = &self.kalman_filter.state;
        TrackerState {
            position_estimate: state.position(),
            velocity_estimate: state.velocity(),
            last_valid_position: self.last_valid_position,
            is_occluded: self.status.map_or(false, |status| status.is_occluded()),
        }
    }

    /// Status of the last tracked frame, `None` before the first frame.
    pub fn status(&self) -> Option<Status> {
        self.status
    }

    pub fn memory(&self) -> Option<&MaskMemory> {
        self.memory.as_ref()
    }
}

/// Truncates towards zero, saturating at the `i32` range.
fn to_pixel(point: Point2<f64>) -> (i32, i32) {
    (point.x as i32, point.y as i32)
}
