//! Outlier pixel groups and their per-group measurements.
//!
//! A group's geometry and measurements are fixed at detection time; the
//! only mutable field is its paint decision, which the scorer, the
//! cross-frame passes, and a manual reviewer may each revise subject to
//! [`PaintReason::supersedes`].

use ndarray::Array2;

use crate::bounding_box::BoundingBox;
use crate::hough::Line;
use crate::paint::PaintReason;

/// A connected group of outlier pixels within one frame.
///
/// Identity is `(frame_index, name)`; the name is derived from the seed
/// pixel's coordinates and is unique within its frame.
#[derive(Debug, Clone)]
pub struct OutlierGroup {
    pub name: String,
    pub frame_index: usize,
    /// Number of pixels in the group.
    pub size: usize,
    /// Mean brightness delta over threshold across the group's pixels.
    pub brightness: u64,
    pub bounds: BoundingBox,
    /// Dense mask local to `bounds`, row-major `height x width`; zero means
    /// the pixel is not part of the group, anything else is that pixel's
    /// brightness delta.
    pub pixels: Array2<u32>,
    /// Hough lines over the mask, strongest first.
    pub lines: Vec<Line>,
    /// Fraction of the group's pixels that sit on its boundary.
    pub surface_area_to_size_ratio: f64,
    /// Cached line-structure score in `[0, 1]`, from the scorer's hough
    /// feature. The tracker gates on this constantly, so it is computed
    /// once at detection.
    pub hough_score: f64,
    should_paint: Option<PaintReason>,
}

impl OutlierGroup {
    /// Name for a group seeded at the given pixel.
    pub fn name_for_seed(x: usize, y: usize) -> String {
        format!("{x}_{y}")
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        frame_index: usize,
        size: usize,
        brightness: u64,
        bounds: BoundingBox,
        pixels: Array2<u32>,
        lines: Vec<Line>,
        hough_score: f64,
    ) -> Self {
        let surface_area_to_size_ratio = surface_area_to_size_ratio(&pixels, size);
        OutlierGroup {
            name,
            frame_index,
            size,
            brightness,
            bounds,
            pixels,
            lines,
            surface_area_to_size_ratio,
            hough_score,
            should_paint: None,
        }
    }

    /// Strongest hough line, if the mask produced any.
    pub fn first_line(&self) -> Option<&Line> {
        self.lines.first()
    }

    pub fn should_paint(&self) -> Option<&PaintReason> {
        self.should_paint.as_ref()
    }

    pub fn will_paint(&self) -> bool {
        self.should_paint.map(|r| r.will_paint()).unwrap_or(false)
    }

    /// Apply a paint decision, honoring verdict precedence. Returns true
    /// if the decision was recorded.
    pub fn set_should_paint(&mut self, reason: PaintReason) -> bool {
        match &self.should_paint {
            Some(existing) if !reason.supersedes(existing) => {
                log::debug!(
                    "frame {} group {}: {:?} does not supersede {:?}",
                    self.frame_index,
                    self.name,
                    reason,
                    existing
                );
                false
            }
            _ => {
                self.should_paint = Some(reason);
                true
            }
        }
    }

    /// Restore a persisted decision verbatim, bypassing precedence.
    pub(crate) fn restore_should_paint(&mut self, reason: Option<PaintReason>) {
        self.should_paint = reason;
    }

    /// Aspect ratio of the bounding box, always `>= 1` (long axis over
    /// short axis).
    pub fn aspect_ratio(&self) -> f64 {
        let w = self.bounds.width() as f64;
        let h = self.bounds.height() as f64;
        if w > h {
            w / h
        } else {
            h / w
        }
    }

    /// Fraction of the bounding box filled by group pixels.
    pub fn fill_amount(&self) -> f64 {
        self.size as f64 / self.bounds.size() as f64
    }
}

/// Boundary pixels over total pixels. A one pixel wide line is all
/// boundary and scores 1.0; a filled disk is mostly interior and scores
/// much lower.
pub fn surface_area_to_size_ratio(pixels: &Array2<u32>, size: usize) -> f64 {
    let (height, width) = pixels.dim();
    let mut surface_area = 0usize;
    for y in 0..height {
        for x in 0..width {
            if pixels[[y, x]] == 0 {
                continue;
            }
            let has_all_neighbors = x > 0
                && pixels[[y, x - 1]] != 0
                && x + 1 < width
                && pixels[[y, x + 1]] != 0
                && y > 0
                && pixels[[y - 1, x]] != 0
                && y + 1 < height
                && pixels[[y + 1, x]] != 0;
            if !has_all_neighbors {
                surface_area += 1;
            }
        }
    }
    surface_area as f64 / size as f64
}

/// Fraction of pixels shared by two groups: co-located nonzero mask pixels
/// divided by the average group size. Zero when the bounding boxes are
/// disjoint.
pub fn pixel_overlap(a: &OutlierGroup, b: &OutlierGroup) -> f64 {
    if a.bounds.min.x > b.bounds.max.x || a.bounds.min.y > b.bounds.max.y {
        return 0.0;
    }
    if b.bounds.min.x > a.bounds.max.x || b.bounds.min.y > a.bounds.max.y {
        return 0.0;
    }

    let min_x = a.bounds.min.x.max(b.bounds.min.x);
    let min_y = a.bounds.min.y.max(b.bounds.min.y);
    let max_x = a.bounds.max.x.min(b.bounds.max.x);
    let max_y = a.bounds.max.y.min(b.bounds.max.y);

    let mut overlap_count = 0usize;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let a_set = a.pixels[[y - a.bounds.min.y, x - a.bounds.min.x]] != 0;
            let b_set = b.pixels[[y - b.bounds.min.y, x - b.bounds.min.x]] != 0;
            if a_set && b_set {
                overlap_count += 1;
            }
        }
    }

    let avg_size = (a.size + b.size) as f64 / 2.0;
    overlap_count as f64 / avg_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounding_box::Coord;

    fn group_at(min_x: usize, min_y: usize, mask: Array2<u32>) -> OutlierGroup {
        let (h, w) = mask.dim();
        let size = mask.iter().filter(|&&v| v != 0).count();
        OutlierGroup::new(
            OutlierGroup::name_for_seed(min_x, min_y),
            0,
            size,
            100,
            BoundingBox::new(
                Coord::new(min_x, min_y),
                Coord::new(min_x + w - 1, min_y + h - 1),
            ),
            mask,
            vec![],
            0.0,
        )
    }

    fn full_mask(w: usize, h: usize) -> Array2<u32> {
        Array2::from_elem((h, w), 50)
    }

    #[test]
    fn test_pixel_overlap_disjoint() {
        // identical masks, boxes separated by a 10 pixel gap
        let a = group_at(0, 0, full_mask(10, 10));
        let b = group_at(20, 0, full_mask(10, 10));
        assert_eq!(pixel_overlap(&a, &b), 0.0);
        assert_eq!(a.bounds.overlap_amount(&b.bounds), 0.0);
    }

    #[test]
    fn test_pixel_overlap_identical() {
        let a = group_at(5, 5, full_mask(8, 8));
        let b = group_at(5, 5, full_mask(8, 8));
        assert!((pixel_overlap(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_overlap_partial_and_symmetric() {
        let a = group_at(0, 0, full_mask(10, 10));
        let b = group_at(5, 0, full_mask(10, 10));
        let amount = pixel_overlap(&a, &b);
        assert!(amount > 0.0 && amount < 1.0);
        assert_eq!(amount, pixel_overlap(&b, &a));
    }

    #[test]
    fn test_surface_area_ratio_line_vs_block() {
        // a 1 pixel tall line is entirely boundary
        let line = Array2::from_elem((1, 20), 9u32);
        assert_eq!(surface_area_to_size_ratio(&line, 20), 1.0);

        // a 10x10 block has 36 boundary pixels out of 100
        let block = full_mask(10, 10);
        assert!((surface_area_to_size_ratio(&block, 100) - 0.36).abs() < 1e-9);
    }

    #[test]
    fn test_paint_precedence_applied() {
        let mut g = group_at(0, 0, full_mask(4, 4));
        assert!(g.set_should_paint(PaintReason::GoodScore(0.7)));
        assert!(g.will_paint());

        assert!(g.set_should_paint(PaintReason::AdjacentOverlap(0.4)));
        assert!(!g.will_paint());

        // streak membership cannot override overlap evidence
        assert!(!g.set_should_paint(PaintReason::InStreak(4)));
        assert_eq!(
            g.should_paint(),
            Some(&PaintReason::AdjacentOverlap(0.4))
        );
    }

    #[test]
    fn test_aspect_ratio_and_fill() {
        let g = group_at(0, 0, full_mask(20, 5));
        assert!((g.aspect_ratio() - 4.0).abs() < 1e-9);
        assert!((g.fill_amount() - 1.0).abs() < 1e-9);
    }
}
