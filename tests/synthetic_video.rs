use mask_tracking::{
    config::Config,
    detector::ColorDetector,
    frame_source::{SyntheticVideo, SyntheticVideoConfig},
    object::Status,
    pipeline::Pipeline,
    Tracker,
};

fn video() -> SyntheticVideo {
    SyntheticVideo::new(SyntheticVideoConfig {
        num_frames: 60,
        width: 320,
        height: 240,
        radius: 20,
        start: (30, 120),
        step: (3, 0),
        occluded_after: 20,
        occluded_before: 35,
    })
}

#[test]
fn colour_detector_pipeline_bridges_the_hidden_frames() {
    let source = video();
    let reference = source.clone();
    let tracker = Tracker::new(&Config::default()).unwrap();
    let outputs: Vec<_> = Pipeline::new(source, ColorDetector::default(), tracker).collect();
    assert_eq!(outputs.len(), 60);

    for output in &outputs {
        assert!(!output.refined_mask.is_empty());
        let expected = if reference.is_occluded(output.frame_index) {
            Status::Occluded
        } else {
            Status::Tracking
        };
        assert_eq!(output.status, expected, "frame {}", output.frame_index);
    }

    for output in outputs.iter().filter(|o| o.status == Status::Occluded) {
        let source_frame = output.recovered_from.expect("recovered from memory");
        assert!(source_frame <= 20);

        let (tx, ty) = reference.object_center(output.frame_index);
        let (px, py) = output.position;
        let error = ((i64::from(px) - tx).pow(2) + (i64::from(py) - ty).pow(2)) as f64;
        assert!(error.sqrt() < 25.0, "frame {} drifted too far", output.frame_index);
    }
}

#[test]
fn tracked_positions_follow_the_object() {
    let source = video();
    let reference = source.clone();
    let tracker = Tracker::new(&Config::default()).unwrap();
    let pipeline = Pipeline::new(source.take(20), ColorDetector::default(), tracker);

    for output in pipeline {
        let (tx, ty) = reference.object_center(output.frame_index);
        assert!((i64::from(output.position.0) - tx).abs() <= 1);
        assert!((i64::from(output.position.1) - ty).abs() <= 1);
    }
}

#[test]
fn stopping_early_leaves_tracker_usable() {
    let tracker = Tracker::new(&Config::default()).unwrap();
    let mut pipeline = Pipeline::new(video(), ColorDetector::default(), tracker);
    assert_eq!(pipeline.by_ref().take(5).count(), 5);
    assert_eq!(pipeline.tracker().status(), Some(Status::Tracking));

    let tracker = pipeline.into_tracker();
    let state = tracker.state();
    assert!(!state.is_occluded);
    assert!(state.last_valid_position.is_some());
    assert!(state.velocity_estimate.x > 0.0);
}
