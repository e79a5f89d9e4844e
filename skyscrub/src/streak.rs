//! Cross-frame tracking of moving outlier groups.
//!
//! A streak is an ordered run of outlier groups across consecutive frames
//! whose detected lines agree with each other and with the direction of
//! travel. The tracker owns the streak table; extension searches for
//! distinct seed groups run in parallel over immutable snapshots and the
//! results are merged into the table sequentially.
//!
//! Per window the passes run in a fixed order: extension search, then the
//! adjacent-overlap suppression pass, then streak marking. Overlap evidence
//! found in the same window therefore vetoes a streak before any of its
//! members is marked `InStreak`.

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use rayon::prelude::*;

use crate::bounding_box::BoundingBox;
use crate::config::Config;
use crate::frame::Frame;
use crate::hough::{theta_diff, Line};
use crate::outlier::{pixel_overlap, OutlierGroup};
use crate::paint::PaintReason;
use crate::score;

/// Hough score floor below which a group cannot seed or join a streak.
pub const STREAK_MIN_HOUGH_SCORE: f64 = 0.007;

/// Two-member streaks whose mean hough score is below this are deleted at
/// finalization instead of being trusted.
pub const WEAK_STREAK_MIN_AVG_SCORE: f64 = 0.25;

/// A streak whose last member is more than this many frames behind the
/// window can no longer be extended and is evicted from the table.
pub const STREAK_EVICTION_FRAMES: usize = 5;

/// Line theta agreement required to bridge two short streaks, in degrees.
const BRIDGE_THETA_DIFF: f64 = 10.0;

/// Slack added to the mean hypotenuse when checking bridge distance.
const BRIDGE_DISTANCE_PADDING: f64 = 2.0;

/// Maximum change in direction between consecutive streak legs, degrees.
const MAX_LEG_ANGLE_CHANGE: f64 = 20.0;

/// One group's membership in a streak. Geometry and score are copied out
/// of the group so the streak outlives the frame's residency.
#[derive(Debug, Clone)]
pub struct StreakMember {
    pub frame_index: usize,
    pub group_name: String,
    pub bounds: BoundingBox,
    pub line: Option<Line>,
    pub hough_score: f64,
    /// Edge distance to the previous member; `None` for the seed.
    pub distance_to_previous: Option<f64>,
}

/// An ordered run of members with strictly increasing frame indices.
#[derive(Debug, Clone)]
pub struct Streak {
    /// `"{seed_frame}.{seed_group}"`, fixed when the streak is seeded.
    pub key: String,
    pub members: Vec<StreakMember>,
}

/// Lightweight per-group copy used by the parallel extension search.
#[derive(Debug, Clone)]
struct GroupSnapshot {
    name: String,
    frame_index: usize,
    size: usize,
    bounds: BoundingBox,
    line: Option<Line>,
    hough_score: f64,
}

impl GroupSnapshot {
    fn of(group: &OutlierGroup) -> Self {
        GroupSnapshot {
            name: group.name.clone(),
            frame_index: group.frame_index,
            size: group.size,
            bounds: group.bounds,
            line: group.first_line().copied(),
            hough_score: group.hough_score,
        }
    }

    fn member(&self, distance_to_previous: Option<f64>) -> StreakMember {
        StreakMember {
            frame_index: self.frame_index,
            group_name: self.name.clone(),
            bounds: self.bounds,
            line: self.line,
            hough_score: self.hough_score,
            distance_to_previous,
        }
    }
}

/// Owns the streak table and runs the cross-frame passes.
///
/// All methods take the resident frames by map so the caller (the
/// inter-frame stage) keeps ownership of the frames themselves.
pub struct StreakTracker {
    config: Config,
    streaks: HashMap<String, Streak>,
    /// `(frame_index, group_name)` to owning streak key. A group belongs
    /// to at most one open streak.
    membership: HashMap<(usize, String), String>,
}

impl StreakTracker {
    pub fn new(config: Config) -> Self {
        StreakTracker {
            config,
            streaks: HashMap::new(),
            membership: HashMap::new(),
        }
    }

    pub fn streak_count(&self) -> usize {
        self.streaks.len()
    }

    pub fn streaks(&self) -> impl Iterator<Item = &Streak> {
        self.streaks.values()
    }

    /// Run one window of cross-frame analysis. `window` holds the frame
    /// indices in increasing order; every one must be resident in `frames`.
    pub fn process_window(&mut self, frames: &mut BTreeMap<usize, Frame>, window: &[usize]) {
        if window.len() < 2 {
            return;
        }
        self.extension_pass(frames, window);
        self.overlap_pass(frames, window);
        self.mark_streaks(frames);
        if let Some(&start) = window.first() {
            self.evict_stale(start);
        }
    }

    /// Extend or seed streaks from every eligible group in the window.
    fn extension_pass(&mut self, frames: &BTreeMap<usize, Frame>, window: &[usize]) {
        let snapshots = snapshot_window(frames, window);

        for (pos, &frame_index) in window.iter().enumerate() {
            if pos + 1 == window.len() {
                break;
            }
            let later: Vec<&[GroupSnapshot]> = window[pos + 1..]
                .iter()
                .filter_map(|fi| snapshots.get(fi).map(Vec::as_slice))
                .collect();

            let frame = match frames.get(&frame_index) {
                Some(frame) => frame,
                None => continue,
            };

            // build the task list sequentially so membership and paint
            // decisions are read consistently; sorted by name so merge
            // order does not depend on hash order
            let mut tasks: Vec<(Option<String>, Vec<StreakMember>)> = Vec::new();
            for group in frame
                .outlier_groups
                .values()
                .sorted_by(|a, b| a.name.cmp(&b.name))
            {
                if group.hough_score <= STREAK_MIN_HOUGH_SCORE {
                    continue;
                }
                if matches!(group.should_paint(), Some(PaintReason::AdjacentOverlap(_))) {
                    continue;
                }
                let id = (frame_index, group.name.clone());
                match self.membership.get(&id) {
                    Some(key) => {
                        // only the tail of its streak can grow it further
                        if let Some(streak) = self.streaks.get(key) {
                            let is_tail = streak
                                .members
                                .last()
                                .map(|m| m.frame_index == frame_index && m.group_name == group.name)
                                .unwrap_or(false);
                            if is_tail {
                                tasks.push((Some(key.clone()), streak.members.clone()));
                            }
                        }
                    }
                    None => {
                        let snap = GroupSnapshot::of(group);
                        tasks.push((None, vec![snap.member(None)]));
                    }
                }
            }

            let config = &self.config;
            let proposals: Vec<(Option<String>, Vec<StreakMember>)> = tasks
                .into_par_iter()
                .filter_map(|(key, chain)| {
                    extend_chain(config, chain, &later).map(|chain| (key, chain))
                })
                .collect();

            for (key, chain) in proposals {
                self.merge_chain(key, chain);
            }
        }
    }

    /// Merge one extension result into the table, claiming membership.
    /// The chain is truncated at the first member already claimed by a
    /// different streak.
    fn merge_chain(&mut self, existing_key: Option<String>, chain: Vec<StreakMember>) {
        let key = match existing_key {
            Some(key) => key,
            None => format!("{}.{}", chain[0].frame_index, chain[0].group_name),
        };

        let mut kept: Vec<StreakMember> = Vec::with_capacity(chain.len());
        for member in chain {
            let id = (member.frame_index, member.group_name.clone());
            match self.membership.get(&id) {
                Some(owner) if *owner != key => break,
                _ => kept.push(member),
            }
        }
        if kept.len() < 2 {
            return;
        }

        log::debug!("streak {} now has {} members", key, kept.len());
        for member in &kept {
            self.membership
                .insert((member.frame_index, member.group_name.clone()), key.clone());
        }
        self.streaks.insert(key.clone(), Streak { key, members: kept });
    }

    /// Suppress stationary objects: a weak-lined group that matches a
    /// similar group at nearly the same place in the next frame is a star
    /// or planet, not a trail, and both are marked `AdjacentOverlap`.
    fn overlap_pass(&mut self, frames: &mut BTreeMap<usize, Frame>, window: &[usize]) {
        let mut decisions: Vec<(usize, String, f64)> = Vec::new();

        for pair in window.windows(2) {
            let (frame, other_frame) = match (frames.get(&pair[0]), frames.get(&pair[1])) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };

            for group in frame.outlier_groups.values() {
                if group.hough_score > self.config.medium_hough_line_score {
                    continue;
                }
                if let Some(reason) = group.should_paint() {
                    let open_streak = matches!(reason, PaintReason::InStreak(n) if *n <= 2);
                    if reason.will_paint() && !open_streak {
                        continue;
                    }
                }
                let line = match group.first_line() {
                    Some(line) => line,
                    None => continue,
                };

                for other in other_frame.outlier_groups.values() {
                    let ratio = self.config.overlap_max_size_ratio;
                    if group.size as f64 > other.size as f64 * ratio {
                        continue;
                    }
                    if other.size as f64 > group.size as f64 * ratio {
                        continue;
                    }
                    if group.bounds.center_distance(&other.bounds)
                        > self.config.overlap_max_center_distance
                    {
                        continue;
                    }
                    let other_line = match other.first_line() {
                        Some(line) => line,
                        None => continue,
                    };
                    if theta_diff(line.theta, other_line.theta) >= self.config.final_theta_diff {
                        continue;
                    }
                    if (line.rho - other_line.rho).abs() >= self.config.final_rho_diff {
                        continue;
                    }

                    let overlap_amount = group.bounds.overlap_amount(&other.bounds);
                    let mut close_enough = overlap_amount > self.config.overlap_min_box_overlap;
                    if !close_enough && !looks_like_line(group) && !looks_like_line(other) {
                        close_enough =
                            pixel_overlap(group, other) > self.config.overlap_min_pixel_overlap;
                    }
                    if close_enough {
                        log::debug!(
                            "frames {}/{} groups {}/{} adjacent overlap {:.3}",
                            group.frame_index,
                            other.frame_index,
                            group.name,
                            other.name,
                            overlap_amount
                        );
                        decisions.push((group.frame_index, group.name.clone(), overlap_amount));
                        decisions.push((other.frame_index, other.name.clone(), overlap_amount));
                    }
                }
            }
        }

        for (frame_index, name, amount) in decisions {
            if let Some(group) = frames
                .get_mut(&frame_index)
                .and_then(|f| f.outlier_groups.get_mut(&name))
            {
                group.set_should_paint(PaintReason::AdjacentOverlap(amount));
            }
        }
    }

    /// Mark every member of each streak with 3 or more members, unless a
    /// member carries overlap evidence, which vetoes the whole streak.
    fn mark_streaks(&self, frames: &mut BTreeMap<usize, Frame>) {
        for streak in self.streaks.values() {
            if streak.members.len() < 3 {
                continue;
            }
            let vetoed = streak.members.iter().any(|member| {
                frames
                    .get(&member.frame_index)
                    .and_then(|f| f.outlier_groups.get(&member.group_name))
                    .map(|g| matches!(g.should_paint(), Some(PaintReason::AdjacentOverlap(_))))
                    .unwrap_or(false)
            });
            if vetoed {
                log::debug!("streak {} vetoed by adjacent overlap", streak.key);
                continue;
            }
            for member in &streak.members {
                if let Some(group) = frames
                    .get_mut(&member.frame_index)
                    .and_then(|f| f.outlier_groups.get_mut(&member.group_name))
                {
                    group.set_should_paint(PaintReason::InStreak(streak.members.len()));
                }
            }
        }
    }

    /// Drop table entries that can no longer be extended.
    fn evict_stale(&mut self, current_frame: usize) {
        let stale: Vec<String> = self
            .streaks
            .values()
            .filter(|streak| {
                streak
                    .members
                    .last()
                    .map(|m| m.frame_index + STREAK_EVICTION_FRAMES < current_frame)
                    .unwrap_or(true)
            })
            .map(|streak| streak.key.clone())
            .collect();

        for key in stale {
            if let Some(streak) = self.streaks.remove(&key) {
                log::debug!("evicting streak {}", key);
                for member in &streak.members {
                    self.membership
                        .remove(&(member.frame_index, member.group_name.clone()));
                }
            }
        }
    }

    /// Last chance for short streaks touching the frame leaving residency.
    ///
    /// An exactly-2-member streak ending or starting at `frame_index` is
    /// deleted unless a different streak's endpoint plausibly continues it
    /// from an adjacent frame, or its members' line evidence is strong
    /// enough on its own. Deleted members fall back to the combined score
    /// decision.
    pub fn finalize_frame(&mut self, frames: &mut BTreeMap<usize, Frame>, frame_index: usize) {
        self.evict_stale(frame_index);

        let candidates: Vec<String> = self
            .streaks
            .values()
            .filter(|streak| {
                streak.members.len() == 2
                    && streak
                        .members
                        .iter()
                        .any(|m| m.frame_index == frame_index)
            })
            .map(|streak| streak.key.clone())
            .collect();

        for key in candidates {
            let (first, last) = match self.streaks.get(&key) {
                Some(streak) => (streak.members[0].clone(), streak.members[1].clone()),
                None => continue,
            };

            let bridged = self.streaks.values().any(|other| {
                if other.key == key {
                    return false;
                }
                let (head, tail) = match (other.members.first(), other.members.last()) {
                    (Some(head), Some(tail)) => (head, tail),
                    _ => return false,
                };
                (tail.frame_index + 1 == first.frame_index && bridgeable(tail, &first))
                    || (last.frame_index + 1 == head.frame_index && bridgeable(&last, head))
            });
            if bridged {
                log::debug!("keeping short streak {} for a possible bridge", key);
                continue;
            }

            let avg_score = (first.hough_score + last.hough_score) / 2.0;
            if avg_score >= WEAK_STREAK_MIN_AVG_SCORE {
                continue;
            }

            if let Some(removed) = self.streaks.remove(&key) {
                log::debug!(
                    "deleting weak two member streak {} avg score {:.3}",
                    key,
                    avg_score
                );
                for member in &removed.members {
                    self.membership
                        .remove(&(member.frame_index, member.group_name.clone()));
                    if let Some(group) = frames
                        .get_mut(&member.frame_index)
                        .and_then(|f| f.outlier_groups.get_mut(&member.group_name))
                    {
                        let decision = score::combined_score_decision(group);
                        group.restore_should_paint(Some(decision));
                    }
                }
            }
        }
    }
}

fn looks_like_line(group: &OutlierGroup) -> bool {
    matches!(group.should_paint(), Some(PaintReason::LooksLikeALine(_)))
}

/// Whether two streak endpoints on adjacent frames are close and aligned
/// enough that their streaks probably describe one trail.
fn bridgeable(a: &StreakMember, b: &StreakMember) -> bool {
    let (a_line, b_line) = match (a.line, b.line) {
        (Some(a_line), Some(b_line)) => (a_line, b_line),
        _ => return false,
    };
    let limit = (a.bounds.hypotenuse() + b.bounds.hypotenuse()) / 2.0 + BRIDGE_DISTANCE_PADDING;
    a.bounds.edge_distance(&b.bounds) < limit
        && theta_diff(a_line.theta, b_line.theta) < BRIDGE_THETA_DIFF
}

fn snapshot_window(
    frames: &BTreeMap<usize, Frame>,
    window: &[usize],
) -> BTreeMap<usize, Vec<GroupSnapshot>> {
    window
        .iter()
        .filter_map(|fi| {
            frames.get(fi).map(|frame| {
                let snaps = frame
                    .outlier_groups
                    .values()
                    .sorted_by(|a, b| a.name.cmp(&b.name))
                    .map(GroupSnapshot::of)
                    .collect();
                (*fi, snaps)
            })
        })
        .collect()
}

/// Grow a chain forward through the later frames of the window.
///
/// Each frame contributes at most the single nearest candidate that clears
/// every gate; the first frame with no candidate ends the chain, so member
/// frame indices are strictly increasing with no gaps past the seed.
/// Returns `None` when nothing beyond a bare seed was found.
fn extend_chain(
    config: &Config,
    mut chain: Vec<StreakMember>,
    later_frames: &[&[GroupSnapshot]],
) -> Option<Vec<StreakMember>> {
    for groups in later_frames {
        let last = match chain.last() {
            Some(member) => member.clone(),
            None => break,
        };
        let last_line = match last.line {
            Some(line) => line,
            None => break,
        };
        let last_hypo = last.bounds.hypotenuse();

        let mut best: Option<(usize, f64)> = None;
        let mut best_distance = last_hypo * 2.0;
        for (i, candidate) in groups.iter().enumerate() {
            if candidate.hough_score <= STREAK_MIN_HOUGH_SCORE {
                continue;
            }
            let candidate_line = match candidate.line {
                Some(line) => line,
                None => continue,
            };
            let distance = last.bounds.edge_distance(&candidate.bounds);
            if distance > last_hypo + candidate.bounds.hypotenuse() {
                continue;
            }
            if distance >= best_distance {
                continue;
            }
            if theta_diff(last_line.theta, candidate_line.theta) >= config.final_theta_diff {
                continue;
            }
            if (last_line.rho - candidate_line.rho).abs() >= config.final_rho_diff {
                continue;
            }
            // direction of travel must align with the line orientation at
            // one of the two endpoints
            let travel_theta = last.bounds.center_theta(&candidate.bounds);
            let aligned = theta_diff(travel_theta, candidate_line.theta)
                < config.center_line_theta_diff
                || theta_diff(travel_theta, last_line.theta) < config.center_line_theta_diff;
            if !aligned {
                continue;
            }
            best = Some((i, distance));
            best_distance = distance;
        }

        let (i, distance) = match best {
            Some(best) => best,
            None => break,
        };
        let candidate = &groups[i];

        if chain.len() > 1 {
            let one_back = &chain[chain.len() - 1];
            let two_back = &chain[chain.len() - 2];
            let to_one_back = candidate.bounds.center_distance(&one_back.bounds);
            let to_two_back = candidate.bounds.center_distance(&two_back.bounds);
            // a real trail moves away from its older members
            if to_two_back < to_one_back {
                continue;
            }
            let leg_one = candidate.bounds.center_theta(&one_back.bounds);
            let leg_two = candidate.bounds.center_theta(&two_back.bounds);
            if (leg_one - leg_two).abs() > MAX_LEG_ANGLE_CHANGE {
                continue;
            }
        }

        chain.push(candidate.member(Some(distance)));
    }

    if chain.len() < 2 {
        None
    } else {
        Some(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounding_box::Coord;
    use ndarray::Array2;
    use std::collections::HashMap;

    fn test_config() -> Config {
        Config::default()
    }

    fn group(
        frame_index: usize,
        min_x: usize,
        min_y: usize,
        side: usize,
        theta: f64,
        rho: f64,
        hough_score: f64,
    ) -> OutlierGroup {
        let mask = Array2::from_elem((side, side), 40u32);
        let size = side * side;
        OutlierGroup::new(
            OutlierGroup::name_for_seed(min_x, min_y),
            frame_index,
            size,
            100,
            BoundingBox::new(
                Coord::new(min_x, min_y),
                Coord::new(min_x + side - 1, min_y + side - 1),
            ),
            mask,
            vec![Line {
                theta,
                rho,
                count: 30,
            }],
            hough_score,
        )
    }

    fn frame_with(index: usize, groups: Vec<OutlierGroup>) -> Frame {
        let map: HashMap<String, OutlierGroup> =
            groups.into_iter().map(|g| (g.name.clone(), g)).collect();
        Frame::new(index, 2000, 2000, vec![], map)
    }

    #[test]
    fn test_diagonal_trail_becomes_streak() {
        // a trail moving down and to the right at 45 degrees, one hop of
        // 30 pixels per frame
        let mut frames = BTreeMap::new();
        frames.insert(0, frame_with(0, vec![group(0, 100, 100, 20, 135.0, 0.0, 0.3)]));
        frames.insert(1, frame_with(1, vec![group(1, 130, 130, 20, 135.0, 0.0, 0.3)]));
        frames.insert(2, frame_with(2, vec![group(2, 160, 160, 20, 135.0, 0.0, 0.3)]));

        let mut tracker = StreakTracker::new(test_config());
        tracker.process_window(&mut frames, &[0, 1, 2]);

        assert_eq!(tracker.streak_count(), 1);
        let streak = tracker.streaks().next().unwrap();
        assert_eq!(streak.key, "0.100_100");
        assert_eq!(streak.members.len(), 3);
        // frame indices strictly increase along the streak
        for pair in streak.members.windows(2) {
            assert!(pair[0].frame_index < pair[1].frame_index);
        }
        for frame in frames.values() {
            let g = frame.outlier_groups.values().next().unwrap();
            assert_eq!(g.should_paint(), Some(&PaintReason::InStreak(3)));
            assert!(g.will_paint());
        }
    }

    #[test]
    fn test_stationary_object_overlap_vetoes_streak() {
        // the same bright disk in the same place on every frame
        let mut frames = BTreeMap::new();
        for i in 0..3 {
            frames.insert(i, frame_with(i, vec![group(i, 200, 200, 20, 0.0, 200.0, 0.05)]));
        }

        let mut tracker = StreakTracker::new(test_config());
        tracker.process_window(&mut frames, &[0, 1, 2]);

        for frame in frames.values() {
            let g = frame.outlier_groups.values().next().unwrap();
            match g.should_paint() {
                Some(PaintReason::AdjacentOverlap(amount)) => {
                    assert!((amount - 1.0).abs() < 1e-9)
                }
                other => panic!("expected adjacent overlap, got {:?}", other),
            }
            assert!(!g.will_paint());
        }
    }

    #[test]
    fn test_weak_two_member_streak_deleted_at_finalize() {
        let mut frames = BTreeMap::new();
        frames.insert(0, frame_with(0, vec![group(0, 100, 100, 20, 135.0, 0.0, 0.1)]));
        frames.insert(1, frame_with(1, vec![group(1, 130, 130, 20, 135.0, 0.0, 0.1)]));

        let mut tracker = StreakTracker::new(test_config());
        tracker.process_window(&mut frames, &[0, 1]);
        assert_eq!(tracker.streak_count(), 1);

        tracker.finalize_frame(&mut frames, 0);
        assert_eq!(tracker.streak_count(), 0);

        // members fall back to the heuristic score, which is far too weak
        // to paint here
        for frame in frames.values() {
            let g = frame.outlier_groups.values().next().unwrap();
            assert!(matches!(g.should_paint(), Some(PaintReason::BadScore(_))));
            assert!(!g.will_paint());
        }
    }

    #[test]
    fn test_bridgeable_two_member_streak_survives() {
        // two short streaks along the same 45 degree path; the rho jump
        // between them blocks normal extension but the bridge check only
        // looks at distance and theta
        let mut frames = BTreeMap::new();
        frames.insert(0, frame_with(0, vec![group(0, 0, 0, 20, 135.0, 0.0, 0.5)]));
        frames.insert(1, frame_with(1, vec![group(1, 30, 30, 20, 135.0, 0.0, 0.5)]));
        frames.insert(2, frame_with(2, vec![group(2, 60, 60, 20, 135.0, 100.0, 0.1)]));
        frames.insert(3, frame_with(3, vec![group(3, 90, 90, 20, 135.0, 100.0, 0.1)]));

        let mut tracker = StreakTracker::new(test_config());
        tracker.process_window(&mut frames, &[0, 1, 2, 3]);
        assert_eq!(tracker.streak_count(), 2);

        tracker.finalize_frame(&mut frames, 2);
        assert_eq!(tracker.streak_count(), 2);
        let g = frames[&2].outlier_groups.values().next().unwrap();
        assert_eq!(g.should_paint(), None);
    }

    #[test]
    fn test_overlap_pass_size_ratio_gate() {
        // a huge group and a tiny one at the same spot are not the same
        // object recurring
        let mut frames = BTreeMap::new();
        frames.insert(0, frame_with(0, vec![group(0, 300, 300, 20, 0.0, 300.0, 0.05)]));
        frames.insert(1, frame_with(1, vec![group(1, 305, 305, 3, 0.0, 300.0, 0.05)]));

        let mut tracker = StreakTracker::new(test_config());
        tracker.process_window(&mut frames, &[0, 1]);

        for frame in frames.values() {
            let g = frame.outlier_groups.values().next().unwrap();
            assert!(!matches!(
                g.should_paint(),
                Some(PaintReason::AdjacentOverlap(_))
            ));
        }
    }

    #[test]
    fn test_doubling_back_is_rejected() {
        // third group jumps back toward the seed; it must not be appended
        // even though every line gate matches
        let mut frames = BTreeMap::new();
        frames.insert(0, frame_with(0, vec![group(0, 100, 100, 20, 135.0, 0.0, 0.3)]));
        frames.insert(1, frame_with(1, vec![group(1, 130, 130, 20, 135.0, 0.0, 0.3)]));
        frames.insert(2, frame_with(2, vec![group(2, 105, 105, 20, 135.0, 0.0, 0.3)]));

        let mut tracker = StreakTracker::new(test_config());
        tracker.process_window(&mut frames, &[0, 1, 2]);

        let streak = tracker.streaks().next().unwrap();
        assert_eq!(streak.members.len(), 2);
        // two member streaks are never marked
        for frame in frames.values() {
            let g = frame.outlier_groups.values().next().unwrap();
            assert!(!matches!(g.should_paint(), Some(PaintReason::InStreak(_))));
        }
    }

    #[test]
    fn test_eviction_of_stale_streaks() {
        let mut frames = BTreeMap::new();
        frames.insert(0, frame_with(0, vec![group(0, 100, 100, 20, 135.0, 0.0, 0.3)]));
        frames.insert(1, frame_with(1, vec![group(1, 130, 130, 20, 135.0, 0.0, 0.3)]));

        let mut tracker = StreakTracker::new(test_config());
        tracker.process_window(&mut frames, &[0, 1]);
        assert_eq!(tracker.streak_count(), 1);

        // far past the streak's tail, the entry can never be extended
        tracker.evict_stale(10);
        assert_eq!(tracker.streak_count(), 0);
    }
}
