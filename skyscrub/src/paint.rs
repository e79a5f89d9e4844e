//! Paint decisions for outlier groups.
//!
//! Every group ends up with a `PaintReason` explaining why it will or will
//! not be painted over. The reasons are not equal in strength: the
//! cross-frame passes can disagree with each other, and [`PaintReason::supersedes`]
//! encodes which verdict wins.

use serde::{Deserialize, Serialize};

/// Why a group is, or is not, painted over.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum PaintReason {
    /// Manual override from a review UI.
    UserSelected(bool),
    /// Verdict from an externally trained classifier.
    FromClassifier(f64),
    /// The group's own line structure is strong enough to decide alone.
    LooksLikeALine(f64),
    /// Combined heuristic score above threshold.
    GoodScore(f64),
    /// Combined heuristic score below threshold.
    BadScore(f64),
    /// Member of a validated multi-frame streak, payload is member count.
    InStreak(usize),
    /// Overlaps a similar group in an adjacent frame, so it is a stationary
    /// object (star, planet) and not a moving streak. Payload is the
    /// overlap amount.
    AdjacentOverlap(f64),
    /// Too small and not linear enough to consider at all.
    SmallNonLinear,
}

impl PaintReason {
    /// Whether this reason means the group's pixels get painted over.
    pub fn will_paint(&self) -> bool {
        match self {
            PaintReason::UserSelected(paint) => *paint,
            PaintReason::FromClassifier(score) => *score > 0.0,
            PaintReason::LooksLikeALine(_) => true,
            PaintReason::GoodScore(_) => true,
            PaintReason::InStreak(_) => true,
            PaintReason::BadScore(_) => false,
            PaintReason::AdjacentOverlap(_) => false,
            PaintReason::SmallNonLinear => false,
        }
    }

    /// Short human readable label, used in logs and debug overlays.
    pub fn name(&self) -> &'static str {
        match self {
            PaintReason::UserSelected(_) => "user selected",
            PaintReason::FromClassifier(_) => "classifier",
            PaintReason::LooksLikeALine(_) => "looks like a line",
            PaintReason::GoodScore(_) => "good score",
            PaintReason::BadScore(_) => "bad score",
            PaintReason::InStreak(_) => "in a streak",
            PaintReason::AdjacentOverlap(_) => "adjacent overlap",
            PaintReason::SmallNonLinear => "small not linear",
        }
    }

    /// Tint used for this reason in test-paint debug output, 16 bit RGB.
    pub fn test_paint_color(&self) -> [u16; 3] {
        const FULL: u16 = u16::MAX;
        const HALF: u16 = u16::MAX / 2;
        match self {
            PaintReason::UserSelected(_) => [FULL, FULL, FULL],
            PaintReason::FromClassifier(_) => [FULL, HALF, 0],
            PaintReason::LooksLikeALine(_) => [HALF, 0, 0],
            PaintReason::GoodScore(_) => [FULL, FULL, 0],
            PaintReason::BadScore(_) => [0, FULL, FULL],
            PaintReason::InStreak(_) => [FULL, 0, 0],
            PaintReason::AdjacentOverlap(_) => [0, 0, FULL],
            PaintReason::SmallNonLinear => [0, HALF, HALF],
        }
    }

    /// Precedence between verdicts from different passes.
    ///
    /// `AdjacentOverlap` beats `InStreak`: the overlap pass has direct
    /// evidence the object is stationary, which outweighs membership in a
    /// candidate streak. `LooksLikeALine` beats `AdjacentOverlap`: strong
    /// single-frame line structure is trusted over coarse overlap evidence.
    /// A `UserSelected` verdict beats everything. All other combinations
    /// defer to whichever decision came later.
    pub fn supersedes(&self, existing: &PaintReason) -> bool {
        match (self, existing) {
            (PaintReason::UserSelected(_), _) => true,
            (_, PaintReason::UserSelected(_)) => false,
            (PaintReason::InStreak(_), PaintReason::AdjacentOverlap(_)) => false,
            (PaintReason::AdjacentOverlap(_), PaintReason::LooksLikeALine(_)) => false,
            _ => true,
        }
    }
}

/// Variant-level equality only; payloads are ignored except for
/// `UserSelected`, and a `FromClassifier` compares by the sign of its
/// score, so any two positive classifier verdicts are equal regardless of
/// magnitude.
impl PartialEq for PaintReason {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PaintReason::UserSelected(a), PaintReason::UserSelected(b)) => a == b,
            (PaintReason::FromClassifier(a), PaintReason::FromClassifier(b)) => {
                (*a > 0.0) == (*b > 0.0)
            }
            (PaintReason::LooksLikeALine(_), PaintReason::LooksLikeALine(_)) => true,
            (PaintReason::GoodScore(_), PaintReason::GoodScore(_)) => true,
            (PaintReason::BadScore(_), PaintReason::BadScore(_)) => true,
            (PaintReason::InStreak(_), PaintReason::InStreak(_)) => true,
            (PaintReason::AdjacentOverlap(_), PaintReason::AdjacentOverlap(_)) => true,
            (PaintReason::SmallNonLinear, PaintReason::SmallNonLinear) => true,
            _ => false,
        }
    }
}
