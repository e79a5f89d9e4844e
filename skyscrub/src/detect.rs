//! Per-frame outlier detection.
//!
//! A frame's pixels are differenced against one or two temporally adjacent
//! frames; locations where this frame is brighter get a positive delta.
//! Deltas are grouped by a two-threshold hysteresis flood fill: a pixel
//! whose delta clears the high seed threshold starts a group, and the
//! group grows through 4-connected neighbors that clear the lower grow
//! threshold. The asymmetry deliberately absorbs a trail's antialiased
//! penumbra without letting faint halo pixels seed groups of their own.
//!
//! Surviving groups are measured (hough lines, surface area ratio),
//! filtered (minimum size, height-dependent minimum size in the upper sky,
//! small-and-not-linear early reject), and handed an initial paint
//! decision by the scorer.

use std::collections::HashMap;

use ndarray::{Array2, Array3};
use rayon::prelude::*;

use crate::bounding_box::{BoundingBox, Coord};
use crate::config::Config;
use crate::error::{Result, SkyscrubError};
use crate::hough::HoughTransform;
use crate::outlier::OutlierGroup;
use crate::paint::PaintReason;
use crate::score;

/// Why a candidate group was dropped before registration. Only collected
/// in test-paint mode, for the debug overlay.
#[derive(Debug, Clone)]
pub struct DiscardedGroup {
    pub bounds: BoundingBox,
    pub size: usize,
    pub reason: PaintReason,
}

/// Output of detection for one frame.
#[derive(Debug, Default)]
pub struct DetectionResult {
    pub groups: HashMap<String, OutlierGroup>,
    pub discarded: Vec<DiscardedGroup>,
}

/// Signed per-pixel brightness delta of `frame` over its neighbors,
/// clamped to zero where the frame is not brighter.
///
/// The per-neighbor delta is the larger of the mean channel difference and
/// the largest single channel difference; with two neighbors the deltas
/// are averaged.
pub fn brightness_deltas(frame: &Array3<u16>, neighbors: &[&Array3<u16>]) -> Array2<u32> {
    let (height, width, _) = frame.dim();

    let rows: Vec<Vec<u32>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut row = vec![0u32; width];
            for x in 0..width {
                let mut total = 0i64;
                for other in neighbors {
                    let dr = i64::from(frame[[y, x, 0]]) - i64::from(other[[y, x, 0]]);
                    let dg = i64::from(frame[[y, x, 1]]) - i64::from(other[[y, x, 1]]);
                    let db = i64::from(frame[[y, x, 2]]) - i64::from(other[[y, x, 2]]);
                    let combined = (dr + dg + db) / 3;
                    total += combined.max(dr.max(dg).max(db));
                }
                let avg = total / neighbors.len() as i64;
                if avg > 0 {
                    row[x] = avg as u32;
                }
            }
            row
        })
        .collect();

    let mut deltas = Array2::zeros((height, width));
    for (y, row) in rows.into_iter().enumerate() {
        for (x, v) in row.into_iter().enumerate() {
            deltas[[y, x]] = v;
        }
    }
    deltas
}

struct RawGroup {
    seed_x: usize,
    seed_y: usize,
    size: usize,
    brightness_sum: u64,
    bounds: BoundingBox,
}

/// Hysteresis flood fill over the delta map. Returns the label map (one
/// label id per group) and the raw per-group accumulations, in seed scan
/// order.
fn label_groups(
    deltas: &Array2<u32>,
    seed_threshold: u32,
    grow_threshold: u32,
) -> (Array2<u32>, Vec<RawGroup>) {
    let (height, width) = deltas.dim();
    let mut labels = Array2::<u32>::zeros((height, width));
    let mut groups: Vec<RawGroup> = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for seed_y in 0..height {
        for seed_x in 0..width {
            if deltas[[seed_y, seed_x]] <= seed_threshold || labels[[seed_y, seed_x]] != 0 {
                continue;
            }

            let label = groups.len() as u32 + 1;
            let mut group = RawGroup {
                seed_x,
                seed_y,
                size: 0,
                brightness_sum: 0,
                bounds: BoundingBox::new(
                    Coord::new(seed_x, seed_y),
                    Coord::new(seed_x, seed_y),
                ),
            };

            labels[[seed_y, seed_x]] = label;
            stack.push((seed_x, seed_y));

            while let Some((x, y)) = stack.pop() {
                debug_assert_eq!(labels[[y, x]], label, "pixel lost its group mid-fill");
                group.size += 1;
                group.brightness_sum += u64::from(deltas[[y, x]]);
                group.bounds.min.x = group.bounds.min.x.min(x);
                group.bounds.min.y = group.bounds.min.y.min(y);
                group.bounds.max.x = group.bounds.max.x.max(x);
                group.bounds.max.y = group.bounds.max.y.max(y);

                let mut push = |nx: usize, ny: usize, labels: &mut Array2<u32>| {
                    if deltas[[ny, nx]] >= grow_threshold && labels[[ny, nx]] == 0 {
                        labels[[ny, nx]] = label;
                        stack.push((nx, ny));
                    }
                };
                if x > 0 {
                    push(x - 1, y, &mut labels);
                }
                if x + 1 < width {
                    push(x + 1, y, &mut labels);
                }
                if y > 0 {
                    push(x, y - 1, &mut labels);
                }
                if y + 1 < height {
                    push(x, y + 1, &mut labels);
                }
            }

            groups.push(group);
        }
    }

    (labels, groups)
}

/// Minimum qualifying size for a group at the given center height.
///
/// Inside the upper sky region the floor interpolates linearly from
/// `min_group_size` at the region's lower boundary up to
/// `min_group_size_at_top` at the top edge of the frame.
fn min_size_at(config: &Config, height: usize, center_y: usize) -> usize {
    let upper_area = height as f64 * config.upper_sky_percentage / 100.0;
    if (center_y as f64) < upper_area {
        // 1 at the top of the frame, 0 at the bottom of the upper area
        let how_close_to_top = (upper_area - center_y as f64) / upper_area;
        let base = config.min_group_size as f64;
        let top = config.min_group_size_at_top as f64;
        (base + (top - base) * how_close_to_top).max(0.0) as usize
    } else {
        config.min_group_size
    }
}

/// Detect outlier groups in one frame given its adjacent frames' buffers.
///
/// Buffers are `(height, width, 3)` of 16 bit channel values. One or two
/// neighbors must be supplied, all the same shape as `frame`.
pub fn detect_outliers(
    config: &Config,
    frame_index: usize,
    frame: &Array3<u16>,
    neighbors: &[&Array3<u16>],
) -> Result<DetectionResult> {
    if neighbors.is_empty() {
        return Err(SkyscrubError::NoNeighbors { index: frame_index });
    }
    for other in neighbors {
        if other.dim() != frame.dim() {
            return Err(SkyscrubError::Config(format!(
                "frame {frame_index} neighbor dimensions {:?} != {:?}",
                other.dim(),
                frame.dim()
            )));
        }
    }

    let (height, width, _) = frame.dim();
    log::debug!("frame {frame_index} detecting outliers over {width}x{height}");

    let deltas = brightness_deltas(frame, neighbors);
    let seed_threshold = u32::from(config.max_pixel_distance());
    let grow_threshold = u32::from(config.min_pixel_distance());

    let (labels, raw_groups) = label_groups(&deltas, seed_threshold, grow_threshold);

    let mut result = DetectionResult::default();

    for (raw_index, raw) in raw_groups.iter().enumerate() {
        let label = raw_index as u32 + 1;

        if raw.size < config.min_group_size {
            continue;
        }

        // groups touching a frame edge are exempt from the height rule;
        // trails entering the frame get clipped there
        let touches_edge = raw.bounds.min.x == 0
            || raw.bounds.min.y == 0
            || raw.bounds.max.x >= width - 1
            || raw.bounds.max.y >= height - 1;
        if !touches_edge {
            let needed = min_size_at(config, height, raw.bounds.center().y);
            if raw.size < needed {
                log::debug!(
                    "frame {frame_index} skipping group of size {} < {needed} at center y {}",
                    raw.size,
                    raw.bounds.center().y
                );
                continue;
            }
        }

        // dense mask local to the bounding box
        let mut mask = Array2::<u32>::zeros((raw.bounds.height(), raw.bounds.width()));
        for y in raw.bounds.min.y..=raw.bounds.max.y {
            for x in raw.bounds.min.x..=raw.bounds.max.x {
                if labels[[y, x]] == label {
                    mask[[y - raw.bounds.min.y, x - raw.bounds.min.x]] = deltas[[y, x]];
                }
            }
        }

        let lines =
            HoughTransform::new(raw.bounds.width(), raw.bounds.height()).lines(&mask, None);
        let hough_score = score::hough_score(&lines);

        let mut group = OutlierGroup::new(
            OutlierGroup::name_for_seed(raw.seed_x, raw.seed_y),
            frame_index,
            raw.size,
            raw.brightness_sum / raw.size as u64,
            raw.bounds,
            mask,
            lines,
            hough_score,
        );

        // early reject: small, weak line evidence, and mostly boundary
        // pixels reads as noise rather than a trail
        if group.size < config.max_must_look_like_line_size
            && hough_score < config.max_must_look_like_line_score
            && group.surface_area_to_size_ratio > config.surface_area_to_size_max
        {
            if config.test_paint {
                result.discarded.push(DiscardedGroup {
                    bounds: group.bounds,
                    size: group.size,
                    reason: PaintReason::SmallNonLinear,
                });
            }
            continue;
        }

        group.set_should_paint(score::default_decision(&group));
        result.groups.insert(group.name.clone(), group);
    }

    log::info!(
        "frame {frame_index} found {} outlier groups",
        result.groups.len()
    );
    Ok(result)
}
