use crate::{config::MemoryConfig, mask::Mask, ring_buffer::RingBuffer};
use nalgebra::{distance, Point2};
use noisy_float::prelude::R64;
use std::cmp::Reverse;
use tracing::{debug, trace, warn};

/// A mask accepted while tracking, kept for later recovery.
#[derive(Clone, Debug)]
pub struct MemoryEntry {
    pub frame_index: usize,
    pub mask: Mask,
    pub quality: f64,
    pub centroid: Point2<f64>,
}

/// A stored mask re-registered onto a predicted point.
#[derive(Clone, Debug)]
pub struct RecoveredMask {
    pub mask: Mask,
    /// Frame the stored mask was taken from.
    pub source_frame: usize,
}

/// Bounded recency memory of good masks.
#[derive(Clone, Debug)]
pub struct MaskMemory {
    entries: RingBuffer<MemoryEntry>,
    distance_penalty: f64,
}

impl MaskMemory {
    pub fn new(config: &MemoryConfig) -> Self {
        Self::with_capacity(config.capacity, config.distance_penalty)
    }

    /// A non-finite or negative `distance_penalty` is replaced by 0.
    pub fn with_capacity(capacity: usize, distance_penalty: f64) -> Self {
        let distance_penalty = if distance_penalty.is_finite() && distance_penalty >= 0.0 {
            distance_penalty
        } else {
            warn!(distance_penalty, "unusable distance penalty, ignoring distance");
            0.0
        };
        Self {
            entries: RingBuffer::new(capacity),
            distance_penalty,
        }
    }

    /// Remember `mask` if it has positive quality and a defined centroid.
    /// Returns whether the mask was stored.
    pub fn store(&mut self, frame_index: usize, mask: &Mask, quality: f64) -> bool {
        if !(quality > 0.0) {
            trace!(frame_index, quality, "memory store rejected: quality");
            return false;
        }
        let Some(centroid) = mask.centroid() else {
            trace!(frame_index, "memory store rejected: empty mask");
            return false;
        };

        let entry = MemoryEntry {
            frame_index,
            mask: mask.clone(),
            quality,
            centroid,
        };
        if let Some(evicted) = self.entries.push(entry) {
            trace!(frame_index, evicted = evicted.frame_index, "memory entry evicted");
        }
        true
    }

    /// Pick the entry with the best `quality - penalty * distance` to
    /// `predicted` and shift its mask so its centroid lands there.
    ///
    /// Ties go to the oldest entry. Returns `None` when the memory is empty,
    /// the point is not finite, or the shifted mask falls outside the frame.
    pub fn retrieve(
        &self,
        predicted: Point2<f64>,
        frame_shape: (usize, usize),
    ) -> Option<RecoveredMask> {
        if !predicted.x.is_finite() || !predicted.y.is_finite() {
            return None;
        }

        let best = self
            .entries
            .iter()
            .filter_map(|entry| Some((entry, R64::try_new(self.score(entry, &predicted))?)))
            .min_by_key(|&(_, score)| Reverse(score))
            .map(|(entry, _)| entry)?;

        let (width, height) = frame_shape;
        let mask = best
            .mask
            .translated(predicted - best.centroid, width, height);
        if mask.is_empty() {
            debug!(
                source_frame = best.frame_index,
                "recovered mask shifted out of frame"
            );
            return None;
        }

        debug!(
            source_frame = best.frame_index,
            x = predicted.x,
            y = predicted.y,
            "mask recovered from memory"
        );
        Some(RecoveredMask {
            mask,
            source_frame: best.frame_index,
        })
    }

    fn score(&self, entry: &MemoryEntry, predicted: &Point2<f64>) -> f64 {
        entry.quality - self.distance_penalty * distance(predicted, &entry.centroid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Stored entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.iter()
    }
}
