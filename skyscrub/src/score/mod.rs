//! Heuristic paint-likelihood scoring for outlier groups.
//!
//! Five sub-scores are computed per group, each by comparing one feature
//! value against a pair of fitted reference histograms (see [`reference`]):
//! hough line structure, group size, aspect ratio, surface area ratio, and
//! brightness. The default paint decision blends the hough, size, and
//! brightness scores; the shape scores are computed for diagnostics and
//! debug output but carry no weight in the blend.
//!
//! One strong signal can decide alone: a group whose line-structure score
//! clears [`LOOKS_LIKE_LINE_MIN_SCORE`] with at least
//! [`LOOKS_LIKE_LINE_MIN_SIZE`] pixels is painted as a line regardless of
//! the blended score.
//!
//! Scoring is pure: given a group's immutable fields it always produces
//! the same result, and its only effect is the paint decision it returns.

pub mod reference;

use crate::hough;
use crate::outlier::OutlierGroup;
use crate::paint::PaintReason;

const HOUGH_WEIGHT: f64 = 3.0;
const SIZE_WEIGHT: f64 = 0.6;
const BRIGHTNESS_WEIGHT: f64 = 1.5;

/// Combined score above this paints the group.
pub const GOOD_SCORE_THRESHOLD: f64 = 0.5;

/// Line-structure score above this, on a large enough group, decides alone.
pub const LOOKS_LIKE_LINE_MIN_SCORE: f64 = 0.5;
pub const LOOKS_LIKE_LINE_MIN_SIZE: usize = 300;

/// All sub-scores for one group, each in `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct GroupScores {
    pub hough: f64,
    pub size: f64,
    pub aspect_ratio: f64,
    pub surface_area: f64,
    pub brightness: f64,
    pub combined: f64,
}

/// Line-structure score for a set of hough lines.
pub fn hough_score(lines: &[hough::Line]) -> f64 {
    reference::KEYS_OVER_LINES.score(hough::keys_over_lines(lines))
}

/// Score every feature of a group.
pub fn score_group(group: &OutlierGroup) -> GroupScores {
    let hough = group.hough_score;
    let size = reference::GROUP_SIZE.score(group.size as f64);
    let aspect_ratio = reference::ASPECT_RATIO.score(group.aspect_ratio());
    let surface_area = reference::SURFACE_AREA_RATIO.score(group.surface_area_to_size_ratio);
    let brightness = reference::BRIGHTNESS.score(group.brightness as f64);

    let combined = (hough * HOUGH_WEIGHT + size * SIZE_WEIGHT + brightness * BRIGHTNESS_WEIGHT)
        / (HOUGH_WEIGHT + SIZE_WEIGHT + BRIGHTNESS_WEIGHT);

    GroupScores {
        hough,
        size,
        aspect_ratio,
        surface_area,
        brightness,
        combined,
    }
}

/// The scorer's default decision for a group, before any cross-frame or
/// manual revision.
pub fn default_decision(group: &OutlierGroup) -> PaintReason {
    let scores = score_group(group);
    if scores.hough > LOOKS_LIKE_LINE_MIN_SCORE && group.size >= LOOKS_LIKE_LINE_MIN_SIZE {
        return PaintReason::LooksLikeALine(scores.hough);
    }
    if scores.combined > GOOD_SCORE_THRESHOLD {
        PaintReason::GoodScore(scores.combined)
    } else {
        PaintReason::BadScore(scores.combined)
    }
}

/// Combined-score decision only, ignoring the line shortcut. Used when a
/// discarded weak streak resets its members to the scorer's baseline.
pub fn combined_score_decision(group: &OutlierGroup) -> PaintReason {
    let scores = score_group(group);
    if scores.combined > GOOD_SCORE_THRESHOLD {
        PaintReason::GoodScore(scores.combined)
    } else {
        PaintReason::BadScore(scores.combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounding_box::{BoundingBox, Coord};
    use crate::hough::Line;
    use ndarray::Array2;

    fn group(size_w: usize, size_h: usize, brightness: u64, hough_score: f64) -> OutlierGroup {
        let mask = Array2::from_elem((size_h, size_w), 1000u32);
        OutlierGroup::new(
            "0_0".into(),
            0,
            size_w * size_h,
            brightness,
            BoundingBox::new(Coord::new(0, 0), Coord::new(size_w - 1, size_h - 1)),
            mask,
            vec![Line { theta: 45.0, rho: 10.0, count: 500 }],
            hough_score,
        )
    }

    #[test]
    fn test_scores_in_unit_range() {
        let g = group(40, 3, 8000, 0.7);
        let s = score_group(&g);
        for v in [s.hough, s.size, s.aspect_ratio, s.surface_area, s.brightness, s.combined] {
            assert!((0.0..=1.0).contains(&v), "score {v} out of range");
        }
    }

    #[test]
    fn test_looks_like_a_line_needs_size() {
        // strong line score on a 360 pixel group decides alone
        let big = group(120, 3, 8000, 0.9);
        assert_eq!(
            default_decision(&big),
            PaintReason::LooksLikeALine(0.9)
        );

        // the same score on a tiny group falls through to the blend
        let small = group(10, 2, 8000, 0.9);
        assert!(!matches!(
            default_decision(&small),
            PaintReason::LooksLikeALine(_)
        ));
    }

    #[test]
    fn test_weak_group_gets_bad_score() {
        let g = group(8, 8, 300, 0.05);
        match default_decision(&g) {
            PaintReason::BadScore(score) => assert!(score <= GOOD_SCORE_THRESHOLD),
            other => panic!("expected BadScore, got {other:?}"),
        }
    }

    #[test]
    fn test_combined_decision_skips_line_shortcut() {
        let g = group(120, 3, 300, 0.9);
        // default takes the line shortcut
        assert!(matches!(
            default_decision(&g),
            PaintReason::LooksLikeALine(_)
        ));
        // the combined-only path never does
        assert!(!matches!(
            combined_score_decision(&g),
            PaintReason::LooksLikeALine(_)
        ));
    }

    #[test]
    fn test_hough_score_from_lines() {
        let concentrated: Vec<Line> = (0..50)
            .map(|i| Line {
                theta: 45.0 + i as f64 * 0.1,
                rho: 10.0,
                count: 1000,
            })
            .collect();
        assert!(hough_score(&concentrated) > 0.5);

        let diffuse: Vec<Line> = (0..50)
            .map(|i| Line {
                theta: i as f64 * 3.0,
                rho: i as f64,
                count: 100 + i,
            })
            .collect();
        assert!(hough_score(&diffuse) < 0.5);
    }
}
