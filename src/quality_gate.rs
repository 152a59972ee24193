use crate::{
    config::QualityGateConfig, mask::Mask, object::QualityAssessment, ring_buffer::RingBuffer,
};
use tracing::trace;

const SCORE_WEIGHT: f64 = 0.6;
const AREA_WEIGHT: f64 = 0.4;
const MIN_THRESHOLD: f64 = 0.35;
const MAX_THRESHOLD: f64 = 0.85;
const FIXED_THRESHOLD: f64 = 0.5;

/// Turns a raw `(mask, score)` detection into a reliability decision.
#[derive(Clone, Debug)]
pub enum QualityGate {
    /// Threshold follows the rolling mean of recent scores and areas.
    Adaptive {
        scores: RingBuffer<f64>,
        areas: RingBuffer<f64>,
        min_samples: usize,
    },
    /// Fixed 0.5 threshold on the raw score, without history.
    Fixed,
}

impl QualityGate {
    pub fn new(config: &QualityGateConfig) -> Self {
        if config.enabled {
            Self::adaptive(config.window_size, config.min_samples)
        } else {
            Self::Fixed
        }
    }

    pub fn adaptive(window_size: usize, min_samples: usize) -> Self {
        Self::Adaptive {
            scores: RingBuffer::new(window_size),
            areas: RingBuffer::new(window_size),
            min_samples,
        }
    }

    pub fn evaluate(&mut self, mask: &Mask, score: f64) -> QualityAssessment {
        let score = if score.is_finite() { score } else { 0.0 };
        let foreground = mask.foreground_count();
        let norm_area = match mask.total_pixels() {
            0 => 0.0,
            total => foreground as f64 / total as f64,
        };
        let quality = SCORE_WEIGHT * score + AREA_WEIGHT * norm_area;

        let (threshold, is_reliable) = match self {
            Self::Adaptive {
                scores,
                areas,
                min_samples,
            } => {
                scores.push(score);
                areas.push(norm_area);
                let threshold = if scores.len() < *min_samples {
                    MIN_THRESHOLD
                } else {
                    let avg_score = scores.mean().unwrap_or(0.0);
                    let avg_area = areas.mean().unwrap_or(0.0);
                    (0.5 * avg_score + 0.4 * avg_area).clamp(MIN_THRESHOLD, MAX_THRESHOLD)
                };
                (threshold, quality >= threshold)
            }
            Self::Fixed => (FIXED_THRESHOLD, score > FIXED_THRESHOLD && foreground > 0),
        };

        trace!(score, norm_area, quality, threshold, is_reliable, "quality evaluated");
        QualityAssessment {
            is_reliable,
            quality,
            threshold,
            norm_area,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// A 100-pixel raster with `count` foreground pixels.
    fn mask_with(count: usize) -> Mask {
        Mask::from_fn(10, 10, |x, y| y * 10 + x < count)
    }

    fn gate() -> QualityGate {
        QualityGate::new(&QualityGateConfig::default())
    }

    #[test]
    fn bootstrap_then_dynamic_threshold() {
        let mut gate = gate();
        let mask = mask_with(5);
        for frame in 0..5 {
            let assessment = gate.evaluate(&mask, 0.95);
            assert_abs_diff_eq!(assessment.norm_area, 0.05, epsilon = 1e-12);
            assert_abs_diff_eq!(assessment.quality, 0.59, epsilon = 1e-12);
            if frame < 4 {
                assert_abs_diff_eq!(assessment.threshold, 0.35, epsilon = 1e-12);
            } else {
                // 0.5 * 0.95 + 0.4 * 0.05
                assert_abs_diff_eq!(assessment.threshold, 0.495, epsilon = 1e-12);
            }
            assert!(assessment.is_reliable);
        }
    }

    #[test]
    fn threshold_stays_clamped() {
        let mut gate = gate();
        let full = mask_with(100);
        let empty = mask_with(0);
        for _ in 0..20 {
            let high = gate.evaluate(&full, 1.0);
            assert!((0.35..=0.85).contains(&high.threshold));
        }
        let high = gate.evaluate(&full, 1.0);
        assert_abs_diff_eq!(high.threshold, 0.85, epsilon = 1e-12);

        for _ in 0..20 {
            let low = gate.evaluate(&empty, 0.0);
            assert!((0.35..=0.85).contains(&low.threshold));
        }
        let low = gate.evaluate(&empty, 0.0);
        assert_abs_diff_eq!(low.threshold, 0.35, epsilon = 1e-12);
        assert!(!low.is_reliable);
    }

    #[test]
    fn window_forgets_old_samples() {
        let mut gate = QualityGate::adaptive(3, 1);
        let mask = mask_with(0);
        gate.evaluate(&mask, 1.0);
        gate.evaluate(&mask, 1.0);
        gate.evaluate(&mask, 1.0);
        let assessment = gate.evaluate(&mask, 0.7);
        // Window now holds [1.0, 1.0, 0.7].
        assert_abs_diff_eq!(assessment.threshold, 0.5 * 0.9, epsilon = 1e-12);
        if let QualityGate::Adaptive { scores, .. } = &gate {
            assert_eq!(scores.len(), 3);
            assert_eq!(scores.evicted(), 1);
        }
    }

    #[test]
    fn empty_mask_is_not_an_error() {
        let mut gate = gate();
        let assessment = gate.evaluate(&Mask::new(0, 0), 0.2);
        assert_eq!(assessment.norm_area, 0.0);
        assert!(!assessment.is_reliable);
    }

    #[test]
    fn fixed_gate_uses_raw_score() {
        let mut gate = QualityGate::new(&QualityGateConfig {
            enabled: false,
            ..QualityGateConfig::default()
        });
        let object = mask_with(5);
        let reliable = gate.evaluate(&object, 0.95);
        assert!(reliable.is_reliable);
        assert_abs_diff_eq!(reliable.threshold, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(reliable.quality, 0.59, epsilon = 1e-12);

        assert!(!gate.evaluate(&object, 0.5).is_reliable);
        assert!(!gate.evaluate(&mask_with(0), 0.95).is_reliable);
    }

    #[test]
    fn non_finite_score_counts_as_zero() {
        let mut gate = gate();
        let assessment = gate.evaluate(&mask_with(10), f64::NAN);
        assert_abs_diff_eq!(assessment.quality, 0.04, epsilon = 1e-12);
    }
}
