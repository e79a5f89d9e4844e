//! Per-frame state and the final repaint.
//!
//! A [`Frame`] owns its outlier groups for its whole lifetime and walks a
//! strictly monotonic state machine from `Unprocessed` to `Complete`.
//! Attempting to move backwards is a programming fault and panics.

use std::collections::HashMap;

use ndarray::Array3;

use crate::config::Config;
use crate::outlier::OutlierGroup;
use crate::paint::PaintReason;

/// Processing states, in order. A frame never skips backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrameState {
    Unprocessed,
    LoadingImages,
    DetectingOutliers,
    ReadyForInterFrameProcessing,
    InterFrameProcessing,
    OutlierProcessingComplete,
    ReloadingImages,
    Painting,
    WritingOutputFile,
    Complete,
}

/// Observer invoked on every state transition.
pub type StateChangeCallback = dyn Fn(usize, FrameState) + Send + Sync;

/// One frame of the sequence with its detected outlier groups.
pub struct Frame {
    pub index: usize,
    pub width: usize,
    pub height: usize,
    /// Adjacent frame indices used for detection and painting, nearest
    /// first.
    pub neighbor_indices: Vec<usize>,
    pub outlier_groups: HashMap<String, OutlierGroup>,
    /// Candidates dropped by the early reject filter, kept only for
    /// test-paint overlays.
    pub discarded: Vec<crate::detect::DiscardedGroup>,
    state: FrameState,
}

impl Frame {
    pub fn new(
        index: usize,
        width: usize,
        height: usize,
        neighbor_indices: Vec<usize>,
        outlier_groups: HashMap<String, OutlierGroup>,
    ) -> Self {
        Frame {
            index,
            width,
            height,
            neighbor_indices,
            outlier_groups,
            discarded: Vec::new(),
            state: FrameState::Unprocessed,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Advance the state machine, notifying `observer` when present.
    ///
    /// Panics if `new_state` is not strictly later than the current state.
    pub fn set_state(&mut self, new_state: FrameState, observer: Option<&StateChangeCallback>) {
        assert!(
            new_state > self.state,
            "frame {} state cannot move from {:?} to {:?}",
            self.index,
            self.state,
            new_state
        );
        log::debug!("frame {} -> {:?}", self.index, new_state);
        self.state = new_state;
        if let Some(observer) = observer {
            observer(self.index, new_state);
        }
    }

    /// Number of groups currently decided to be painted.
    pub fn paintable_group_count(&self) -> usize {
        self.outlier_groups.values().filter(|g| g.will_paint()).count()
    }

    /// Repaint every to-be-painted group's pixels using data from one
    /// adjacent frame.
    ///
    /// The blend weight for each pixel follows its detection delta: a
    /// pixel barely over the grow threshold keeps most of its own value,
    /// one at or past the seed threshold is fully replaced. This keeps the
    /// soft edges of a trail from leaving a hard repaint boundary.
    pub fn paint_over(
        &self,
        config: &Config,
        buffer: &mut Array3<u16>,
        source: &Array3<u16>,
    ) {
        let min = f64::from(config.min_pixel_distance());
        let max = f64::from(config.max_pixel_distance());

        let mut painted_pixels = 0usize;
        for group in self.outlier_groups.values() {
            if !group.will_paint() {
                continue;
            }
            for ((my, mx), &amount) in group.pixels.indexed_iter() {
                if amount == 0 {
                    continue;
                }
                let y = group.bounds.min.y + my;
                let x = group.bounds.min.x + mx;

                let alpha = ((f64::from(amount) - min) / (max - min)).clamp(0.0, 1.0);
                for c in 0..3 {
                    let orig = f64::from(buffer[[y, x, c]]);
                    let new = f64::from(source[[y, x, c]]);
                    buffer[[y, x, c]] = (orig * (1.0 - alpha) + new * alpha) as u16;
                }
                painted_pixels += 1;
            }
        }
        log::info!(
            "frame {} painted {painted_pixels} pixels across {} groups",
            self.index,
            self.paintable_group_count()
        );
    }

    /// Tint every group's pixels by its paint reason instead of repairing
    /// them. Debug aid for threshold tuning.
    pub fn test_paint(&self, buffer: &mut Array3<u16>, discarded: &[crate::detect::DiscardedGroup]) {
        for group in self.outlier_groups.values() {
            let Some(reason) = group.should_paint() else {
                continue;
            };
            let color = reason.test_paint_color();
            for ((my, mx), &amount) in group.pixels.indexed_iter() {
                if amount == 0 {
                    continue;
                }
                let y = group.bounds.min.y + my;
                let x = group.bounds.min.x + mx;
                for c in 0..3 {
                    buffer[[y, x, c]] = color[c];
                }
            }
        }
        // discarded candidates only have bounds left; outline those
        for discard in discarded {
            let color = discard.reason.test_paint_color();
            let b = &discard.bounds;
            for x in b.min.x..=b.max.x {
                for c in 0..3 {
                    buffer[[b.min.y, x, c]] = color[c];
                    buffer[[b.max.y, x, c]] = color[c];
                }
            }
            for y in b.min.y..=b.max.y {
                for c in 0..3 {
                    buffer[[y, b.min.x, c]] = color[c];
                    buffer[[y, b.max.x, c]] = color[c];
                }
            }
        }
    }

    /// Apply a manual review verdict to one group.
    pub fn user_select(&mut self, group_name: &str, paint: bool) -> bool {
        match self.outlier_groups.get_mut(group_name) {
            Some(group) => group.set_should_paint(PaintReason::UserSelected(paint)),
            None => false,
        }
    }
}
