use crate::{
    detector::Detector, frame_source::FrameSource, object::FrameOutput, tracker::Tracker,
};
use tracing::debug;

/// Drives a tracker over a frame source, one detection per frame.
///
/// Frames are processed strictly in the order the source yields them.
/// Dropping the pipeline or stopping iteration ends the run.
pub struct Pipeline<S, D> {
    source: S,
    detector: D,
    tracker: Tracker,
}

impl<S, D> Pipeline<S, D>
where
    S: FrameSource,
    D: Detector,
{
    pub fn new(source: S, detector: D, tracker: Tracker) -> Self {
        Self {
            source,
            detector,
            tracker,
        }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn into_tracker(self) -> Tracker {
        self.tracker
    }
}

impl<S, D> Iterator for Pipeline<S, D>
where
    S: FrameSource,
    D: Detector,
{
    type Item = FrameOutput;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.source.next()?;
        let detection = self.detector.predict(&record.frame);
        debug!(
            frame_index = record.index,
            score = detection.score,
            area = detection.mask.foreground_count(),
            "detection received"
        );
        Some(
            self.tracker
                .track_frame(record.index, &detection.mask, detection.score),
        )
    }
}
