//! Axis-aligned bounding boxes with the geometry used by streak analysis.
//!
//! Boxes are stored as inclusive min/max pixel coordinates, so a single
//! pixel box has `width == height == 1`. Beyond the usual overlap and
//! containment queries, this module carries two primitives the cross-frame
//! tracker leans on heavily:
//!
//! - [`BoundingBox::center_theta`]: the angle of the line joining two box
//!   centers, with exact-horizontal and exact-vertical alignment special
//!   cased to 0 and 90 degrees.
//! - [`BoundingBox::edge_distance`]: the separation between two boxes along
//!   that center line, minus the portion of the line that lies inside each
//!   box. Negative values mean the boxes overlap along the line. This is a
//!   cheap proxy for true pixel distance.

use serde::{Deserialize, Serialize};

/// An integer pixel coordinate, x across, y down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    pub fn new(x: usize, y: usize) -> Self {
        Coord { x, y }
    }
}

/// Inclusive axis-aligned rectangle of pixels.
///
/// Invariant: `min.x <= max.x` and `min.y <= max.y`.
///
/// # Examples
///
/// ```
/// use skyscrub::bounding_box::{BoundingBox, Coord};
///
/// let bbox = BoundingBox::new(Coord::new(2, 3), Coord::new(5, 7));
/// assert_eq!(bbox.width(), 4);
/// assert_eq!(bbox.height(), 5);
/// assert_eq!(bbox.size(), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Coord,
    pub max: Coord,
}

/// Absorbs integer-to-float conversion wobble when deciding which box edge
/// the center line exits through.
const EDGE_MATH_SLOP: f64 = 3.0;

impl BoundingBox {
    pub fn new(min: Coord, max: Coord) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y, "inverted bounding box");
        BoundingBox { min, max }
    }

    pub fn width(&self) -> usize {
        self.max.x - self.min.x + 1
    }

    pub fn height(&self) -> usize {
        self.max.y - self.min.y + 1
    }

    /// Number of pixels covered by the box.
    pub fn size(&self) -> usize {
        self.width() * self.height()
    }

    pub fn hypotenuse(&self) -> f64 {
        let w = self.width() as f64;
        let h = self.height() as f64;
        (w * w + h * h).sqrt()
    }

    /// Center pixel, truncated to integer coordinates.
    pub fn center(&self) -> Coord {
        Coord {
            x: self.min.x + self.width() / 2,
            y: self.min.y + self.height() / 2,
        }
    }

    fn center_f64(&self) -> (f64, f64) {
        (
            self.min.x as f64 + self.width() as f64 / 2.0,
            self.min.y as f64 + self.height() as f64 / 2.0,
        )
    }

    /// Euclidean distance between the two boxes' centers.
    pub fn center_distance(&self, other: &BoundingBox) -> f64 {
        let (x1, y1) = self.center_f64();
        let (x2, y2) = other.center_f64();
        let dx = x1 - x2;
        let dy = y1 - y2;
        (dx * dx + dy * dy).sqrt()
    }

    /// True if `other` lies entirely within this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.min.x
            && self.max.x >= other.max.x
            && self.min.y <= other.min.y
            && self.max.y >= other.max.y
    }

    /// The intersection of the two boxes, or `None` when they are disjoint.
    pub fn overlap(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if self.min.x < other.max.x
            && self.min.y < other.max.y
            && other.min.x < self.max.x
            && other.min.y < self.max.y
        {
            Some(BoundingBox {
                min: Coord {
                    x: self.min.x.max(other.min.x),
                    y: self.min.y.max(other.min.y),
                },
                max: Coord {
                    x: self.max.x.min(other.max.x),
                    y: self.max.y.min(other.max.y),
                },
            })
        } else {
            None
        }
    }

    /// Overlapping pixel count divided by the average size of the two boxes.
    ///
    /// Zero when the boxes are disjoint; symmetric in its arguments.
    pub fn overlap_amount(&self, other: &BoundingBox) -> f64 {
        match self.overlap(other) {
            Some(overlap) => {
                let avg_size = (self.size() + other.size()) / 2;
                overlap.size() as f64 / avg_size as f64
            }
            None => 0.0,
        }
    }

    /// Angle in degrees of the line joining the two box centers.
    ///
    /// Exactly horizontally aligned centers give 0, exactly vertically
    /// aligned centers give 90; otherwise the angle is measured so that it
    /// is directly comparable with a Hough line theta.
    pub fn center_theta(&self, other: &BoundingBox) -> f64 {
        let (x1, y1) = self.center_f64();
        let (x2, y2) = other.center_f64();

        if y1 == y2 {
            return 0.0;
        }
        if x1 == x2 {
            return 90.0;
        }

        let width = (x1 - x2).abs();
        let height = (y1 - y2).abs();

        let theta = if (x1 < x2) == (y1 < y2) {
            std::f64::consts::FRAC_PI_2 + (height / width).atan()
        } else {
            (width / height).atan()
        };

        theta.to_degrees()
    }

    /// Separation between the two boxes measured along the line joining
    /// their centers: center distance minus the part of the line inside
    /// each box. Positive means true separation, negative means the boxes
    /// overlap along that line.
    pub fn edge_distance(&self, other: &BoundingBox) -> f64 {
        let half_width_1 = self.width() as f64 / 2.0;
        let half_height_1 = self.height() as f64 / 2.0;
        let half_width_2 = other.width() as f64 / 2.0;
        let half_height_2 = other.height() as f64 / 2.0;

        let (x1, y1) = self.center_f64();
        let (x2, y2) = other.center_f64();

        if y1 == y2 {
            return (x1 - x2).abs() - half_width_1 - half_width_2;
        }
        if x1 == x2 {
            return (y1 - y2).abs() - half_height_1 - half_height_2;
        }

        // line between the two centers, y = slope * x + y_intercept
        let slope = (y1 - y2) / (x1 - x2);
        let y_intercept = y1 - slope * x1;

        let width = (x1 - x2).abs();
        let height = (y1 - y2).abs();

        let theta = if (x1 < x2) == (y1 < y2) {
            std::f64::consts::FRAC_PI_2 + (height / width).atan()
        } else {
            (width / height).atan()
        };

        let dist_1 = distance_to_exit(self, slope, y_intercept, theta);
        let dist_2 = distance_to_exit(other, slope, y_intercept, theta);

        let center_distance = (width * width + height * height).sqrt();
        center_distance - dist_1 - dist_2
    }
}

#[derive(Clone, Copy)]
enum Edge {
    Vertical,
    Horizontal,
}

/// Distance from the box center to where the given line exits the box.
fn distance_to_exit(bbox: &BoundingBox, slope: f64, y_intercept: f64, theta: f64) -> f64 {
    let y_at_max_x = bbox.max.x as f64 * slope + y_intercept;
    let x_at_max_y = bbox.max.y as f64 - y_intercept / slope;

    let edge = if bbox.min.y as f64 - EDGE_MATH_SLOP <= y_at_max_x
        && y_at_max_x <= bbox.max.y as f64 + EDGE_MATH_SLOP
    {
        Edge::Vertical
    } else if bbox.min.x as f64 - EDGE_MATH_SLOP <= x_at_max_y
        && x_at_max_y <= bbox.max.x as f64 + EDGE_MATH_SLOP
    {
        Edge::Horizontal
    } else {
        // rounding can leave the center line missing the box entirely when
        // the boxes overlap; fall back to the horizontal edge estimate
        log::debug!(
            "center line (slope {slope}, intercept {y_intercept}) misses box {bbox:?}, \
             no reliable edge distance"
        );
        Edge::Horizontal
    };

    match edge {
        Edge::Vertical => {
            let half_width = bbox.width() as f64 / 2.0;
            half_width / (std::f64::consts::FRAC_PI_2 - theta).cos()
        }
        Edge::Horizontal => {
            let half_height = bbox.height() as f64 / 2.0;
            half_height / theta.cos()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bbox(min_x: usize, min_y: usize, max_x: usize, max_y: usize) -> BoundingBox {
        BoundingBox::new(Coord::new(min_x, min_y), Coord::new(max_x, max_y))
    }

    #[test]
    fn test_dimensions_inclusive() {
        let b = bbox(0, 0, 0, 0);
        assert_eq!(b.width(), 1);
        assert_eq!(b.height(), 1);
        assert_eq!(b.size(), 1);

        let b = bbox(10, 20, 19, 39);
        assert_eq!(b.width(), 10);
        assert_eq!(b.height(), 20);
        assert_eq!(b.size(), 200);
        assert_relative_eq!(b.hypotenuse(), (100.0f64 + 400.0).sqrt());
    }

    #[test]
    fn test_overlap_and_amount_agree() {
        // overlap() is None exactly when overlap_amount() is zero
        let cases = [
            (bbox(0, 0, 9, 9), bbox(20, 0, 29, 9), false),
            (bbox(0, 0, 9, 9), bbox(5, 5, 14, 14), true),
            (bbox(0, 0, 9, 9), bbox(0, 0, 9, 9), true),
            (bbox(0, 0, 4, 4), bbox(100, 100, 104, 104), false),
        ];
        for (a, b, overlaps) in cases {
            assert_eq!(a.overlap(&b).is_some(), overlaps);
            assert_eq!(a.overlap_amount(&b) > 0.0, overlaps);
            // symmetry
            assert_relative_eq!(a.overlap_amount(&b), b.overlap_amount(&a));
        }
    }

    #[test]
    fn test_overlap_intersection() {
        let a = bbox(0, 0, 9, 9);
        let b = bbox(5, 5, 14, 14);
        let o = a.overlap(&b).unwrap();
        assert_eq!(o, bbox(5, 5, 9, 9));
    }

    #[test]
    fn test_disjoint_boxes_scenario() {
        // identical 10x10 boxes separated by a 10 pixel gap
        let a = bbox(0, 0, 9, 9);
        let b = bbox(20, 0, 29, 9);
        assert!(a.overlap(&b).is_none());
        assert_eq!(a.overlap_amount(&b), 0.0);
    }

    #[test]
    fn test_contains() {
        let outer = bbox(0, 0, 100, 100);
        let inner = bbox(10, 10, 20, 20);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.contains(&outer));
    }

    #[test]
    fn test_center_theta_horizontal_alignment() {
        // equal center y gives exactly 0 degrees
        let a = bbox(0, 0, 9, 9);
        let b = bbox(50, 0, 59, 9);
        assert_eq!(a.center_theta(&b), 0.0);
        assert_eq!(b.center_theta(&a), 0.0);
    }

    #[test]
    fn test_center_theta_vertical_alignment() {
        // equal center x gives exactly 90 degrees
        let a = bbox(0, 0, 9, 9);
        let b = bbox(0, 50, 9, 59);
        assert_eq!(a.center_theta(&b), 90.0);
        assert_eq!(b.center_theta(&a), 90.0);
    }

    #[test]
    fn test_center_theta_diagonal() {
        // down-right diagonal at 45 degrees from vertical lands above 90
        let a = bbox(0, 0, 9, 9);
        let b = bbox(20, 20, 29, 29);
        assert_relative_eq!(a.center_theta(&b), 135.0);
        // up-right diagonal mirrors into the 0..90 range
        let c = bbox(20, 0, 29, 9);
        let d = bbox(0, 20, 9, 29);
        assert_relative_eq!(c.center_theta(&d), 45.0);
    }

    #[test]
    fn test_center_distance() {
        let a = bbox(0, 0, 9, 9);
        let b = bbox(30, 40, 39, 49);
        assert_relative_eq!(a.center_distance(&b), 50.0);
        assert_relative_eq!(a.center_distance(&b), b.center_distance(&a));
    }

    #[test]
    fn test_edge_distance_horizontal_gap() {
        // 10 wide boxes with a 10 pixel gap between facing edges
        let a = bbox(0, 0, 9, 9);
        let b = bbox(20, 0, 29, 9);
        assert_relative_eq!(a.edge_distance(&b), 10.0);
    }

    #[test]
    fn test_edge_distance_vertical_gap() {
        let a = bbox(0, 0, 9, 9);
        let b = bbox(0, 25, 9, 34);
        assert_relative_eq!(a.edge_distance(&b), 15.0);
    }

    #[test]
    fn test_edge_distance_negative_when_overlapping() {
        let a = bbox(0, 0, 9, 9);
        let b = bbox(5, 0, 14, 9);
        assert!(a.edge_distance(&b) < 0.0);
    }

    #[test]
    fn test_edge_distance_diagonal() {
        // well separated diagonal boxes report positive separation smaller
        // than the raw center distance
        let a = bbox(0, 0, 9, 9);
        let b = bbox(50, 50, 59, 59);
        let d = a.edge_distance(&b);
        assert!(d > 0.0);
        assert!(d < a.center_distance(&b));
    }
}
