//! Hough transform over a sparse brightness mask.
//!
//! The transform parameterizes candidate lines as `(theta, rho)`: `theta`
//! is the angle of the line's normal in degrees and `rho` its distance
//! from the origin in pixels. Every nonzero mask pixel casts one vote for
//! each line passing through it, at half-degree theta resolution. Bins
//! below a small vote floor are dropped as noise; the rest are returned
//! sorted by vote count descending, so `lines[0]` is always the strongest
//! line evidence in the mask. Votes are unweighted; the fitted histograms
//! that score [`keys_over_lines`] assume binary masks.
//!
//! Negative rho values are folded positive by flipping theta 180 degrees,
//! which is why downstream theta comparisons always consider the 180
//! degree complement as well.

use ndarray::Array2;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// A line in polar form with its accumulated vote weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Angle in degrees, `[0, 360)` after the positive-rho fold.
    pub theta: f64,
    /// Distance from the origin in pixels, always non-negative.
    pub rho: f64,
    /// Number of mask pixels voting for this line.
    pub count: u64,
}

/// Smallest absolute theta difference treating lines 180 degrees apart as
/// the same orientation. Symmetric in its arguments.
pub fn theta_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(180.0);
    d.min(180.0 - d)
}

/// Hough transform accumulator sized for a specific mask.
pub struct HoughTransform {
    width: usize,
    height: usize,
    rmax: f64,
    /// rho axis rows, `2 * rmax` so negative rho has room before folding
    rho_bins: usize,
    /// theta axis columns, half a degree each
    theta_bins: usize,
    dr: f64,
}

const THETA_BINS: usize = 360;

/// Accumulator bins with fewer votes than this are noise, not lines.
const MIN_LINE_VOTES: u32 = 5;

/// `(cos, sin)` per theta bin. The theta axis does not depend on mask
/// size, so one table serves every transform.
static THETA_TABLE: Lazy<Vec<(f64, f64)>> = Lazy::new(|| {
    let dth = std::f64::consts::PI / THETA_BINS as f64;
    (0..THETA_BINS)
        .map(|k| {
            let th = dth * k as f64;
            (th.cos(), th.sin())
        })
        .collect()
});

impl HoughTransform {
    pub fn new(width: usize, height: usize) -> Self {
        let rmax = ((width * width + height * height) as f64).sqrt();
        let rho_bins = (rmax * 2.0) as usize;
        HoughTransform {
            width,
            height,
            rmax,
            rho_bins,
            theta_bins: THETA_BINS,
            dr: 2.0 * rmax / rho_bins as f64,
        }
    }

    /// Run the transform over `mask` (row-major, `height x width`, zero
    /// means not part of the group) and return lines sorted by count
    /// descending, truncated to `max_count` when given.
    pub fn lines(&self, mask: &Array2<u32>, max_count: Option<usize>) -> Vec<Line> {
        debug_assert_eq!(mask.dim(), (self.height, self.width));

        let mut counts = Array2::<u32>::zeros((self.theta_bins, self.rho_bins));

        for ((y, x), &value) in mask.indexed_iter() {
            if value == 0 {
                continue;
            }
            for (k, &(cos, sin)) in THETA_TABLE.iter().enumerate() {
                let r = x as f64 * cos + y as f64 * sin;
                let iry = (self.rmax + r / self.dr) as usize;
                if iry < self.rho_bins {
                    counts[[k, iry]] += 1;
                }
            }
        }

        let mut lines = Vec::new();
        for k in 0..self.theta_bins {
            for r in 0..self.rho_bins {
                let count = counts[[k, r]];
                if count < MIN_LINE_VOTES {
                    continue;
                }

                let mut theta = k as f64 / 2.0;
                let mut rho = r as f64 - self.rmax;
                if rho < 0.0 {
                    rho = -rho;
                    theta = (theta + 180.0) % 360.0;
                }
                lines.push(Line {
                    theta,
                    rho,
                    count: u64::from(count),
                });
            }
        }

        // stable sort keeps scan order among equal counts, so the result
        // is deterministic even when a line fills several adjacent bins
        lines.sort_by(|a, b| b.count.cmp(&a.count));
        if let Some(max_count) = max_count {
            lines.truncate(max_count);
        }
        lines
    }
}

/// The "keys over lines" feature: distinct vote counts divided by the
/// number of lines. True lines concentrate votes into a few counts, so
/// lower values mean stronger line structure. Zero lines yields 1.0 (no
/// structure at all).
pub fn keys_over_lines(lines: &[Line]) -> f64 {
    if lines.is_empty() {
        return 1.0;
    }
    let mut counts: Vec<u64> = lines.iter().map(|l| l.count).collect();
    counts.sort_unstable();
    counts.dedup();
    counts.len() as f64 / lines.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn horizontal_line_mask(width: usize, height: usize, row: usize) -> Array2<u32> {
        let mut mask = Array2::zeros((height, width));
        for x in 0..width {
            mask[[row, x]] = 1000;
        }
        mask
    }

    #[test]
    fn test_horizontal_line_theta() {
        let mask = horizontal_line_mask(32, 16, 8);
        let lines = HoughTransform::new(32, 16).lines(&mask, Some(10));
        assert!(!lines.is_empty());
        // a horizontal run of pixels has a vertical normal, theta near 90
        let best = lines[0];
        assert!(
            theta_diff(best.theta, 90.0) < 3.0,
            "expected theta near 90, got {}",
            best.theta
        );
        assert!((best.rho - 8.0).abs() < 2.0, "rho {} not near 8", best.rho);
    }

    #[test]
    fn test_diagonal_line_theta() {
        let mut mask = Array2::zeros((32, 32));
        for i in 0..32 {
            mask[[i, i]] = 1000;
        }
        let lines = HoughTransform::new(32, 32).lines(&mask, Some(10));
        assert!(!lines.is_empty());
        // y = x has a normal at 135 degrees (or its 180 complement)
        assert!(
            theta_diff(lines[0].theta, 135.0) < 4.0,
            "theta {}",
            lines[0].theta
        );
    }

    #[test]
    fn test_lines_sorted_by_count() {
        let mask = horizontal_line_mask(32, 16, 8);
        let lines = HoughTransform::new(32, 16).lines(&mask, None);
        for pair in lines.windows(2) {
            assert!(pair[0].count >= pair[1].count);
        }
    }

    #[test]
    fn test_empty_mask_no_lines() {
        let mask = Array2::zeros((8, 8));
        let lines = HoughTransform::new(8, 8).lines(&mask, None);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_rho_always_non_negative() {
        let mut mask = Array2::zeros((32, 32));
        for i in 0..32 {
            mask[[31 - i, i]] = 500;
        }
        let lines = HoughTransform::new(32, 32).lines(&mask, None);
        assert!(lines.iter().all(|l| l.rho >= 0.0));
    }

    #[test]
    fn test_theta_diff_complement() {
        assert_eq!(theta_diff(10.0, 10.0), 0.0);
        assert_eq!(theta_diff(10.0, 190.0), 0.0);
        assert!((theta_diff(5.0, 175.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_keys_over_lines_line_vs_blob() {
        // all identical counts collapses to a single key
        let concentrated = vec![
            Line { theta: 90.0, rho: 5.0, count: 100 },
            Line { theta: 90.5, rho: 5.0, count: 100 },
            Line { theta: 89.5, rho: 5.0, count: 100 },
        ];
        assert!((keys_over_lines(&concentrated) - 1.0 / 3.0).abs() < 1e-9);

        // all distinct counts means every line is its own key
        let diffuse = vec![
            Line { theta: 10.0, rho: 1.0, count: 1 },
            Line { theta: 20.0, rho: 2.0, count: 2 },
            Line { theta: 30.0, rho: 3.0, count: 3 },
        ];
        assert_eq!(keys_over_lines(&diffuse), 1.0);

        assert_eq!(keys_over_lines(&[]), 1.0);
    }

    #[test]
    fn test_deterministic() {
        let mask = horizontal_line_mask(24, 24, 12);
        let ht = HoughTransform::new(24, 24);
        assert_eq!(ht.lines(&mask, None), ht.lines(&mask, None));
    }
}
