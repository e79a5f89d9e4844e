//! Persisting detected outlier groups between runs.
//!
//! When enabled, each frame's groups are written as one JSON file under
//! the output directory. A rerun finds them and skips detection for that
//! frame entirely, which is the expensive part of the pipeline.
//!
//! JSON has no representation for non-finite floats, so they are stored
//! as the strings `"inf"`, `"-inf"` and `"nan"`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bounding_box::BoundingBox;
use crate::error::{Result, SkyscrubError};
use crate::frame::Frame;
use crate::hough::Line;
use crate::outlier::OutlierGroup;
use crate::paint::PaintReason;

/// Serde adapter storing non-finite floats as strings.
pub(crate) mod json_float {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("nan")
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(serde::de::Error::custom(format!(
                    "not a float value: {other:?}"
                ))),
            },
        }
    }
}

/// One stored outlier group. The mask is flattened row major over the
/// bounding box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredGroup {
    pub size: usize,
    pub brightness: u64,
    pub bounds: BoundingBox,
    pub pixels: Vec<u32>,
    pub lines: Vec<Line>,
    #[serde(with = "json_float")]
    pub hough_score: f64,
    /// Seed threshold in effect when the group was detected. Recorded for
    /// provenance only; loading a record does not reapply it.
    pub max_pixel_distance: u16,
    pub should_paint: Option<PaintReason>,
}

/// Everything detection produced for one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_index: usize,
    pub groups: HashMap<String, StoredGroup>,
}

pub fn outlier_dir(output_dir: &Path) -> PathBuf {
    output_dir.join("outlier-groups")
}

fn record_path(output_dir: &Path, frame_index: usize) -> PathBuf {
    outlier_dir(output_dir).join(format!("frame_{frame_index:06}.json"))
}

impl FrameRecord {
    pub fn from_frame(frame: &Frame, max_pixel_distance: u16) -> Self {
        let groups = frame
            .outlier_groups
            .iter()
            .map(|(name, group)| {
                let stored = StoredGroup {
                    size: group.size,
                    brightness: group.brightness,
                    bounds: group.bounds,
                    pixels: group.pixels.iter().copied().collect(),
                    lines: group.lines.clone(),
                    hough_score: group.hough_score,
                    max_pixel_distance,
                    should_paint: group.should_paint().copied(),
                };
                (name.clone(), stored)
            })
            .collect();
        FrameRecord {
            frame_index: frame.index,
            groups,
        }
    }

    /// Rebuild the group map, restoring stored paint decisions verbatim.
    pub fn into_groups(self) -> Result<HashMap<String, OutlierGroup>> {
        let frame_index = self.frame_index;
        let mut groups = HashMap::with_capacity(self.groups.len());
        for (name, stored) in self.groups {
            let shape = (stored.bounds.height(), stored.bounds.width());
            let mask = ndarray::Array2::from_shape_vec(shape, stored.pixels).map_err(|_| {
                SkyscrubError::Config(format!(
                    "stored group {name} of frame {frame_index} has a malformed pixel mask"
                ))
            })?;
            let mut group = OutlierGroup::new(
                name.clone(),
                frame_index,
                stored.size,
                stored.brightness,
                stored.bounds,
                mask,
                stored.lines,
                stored.hough_score,
            );
            group.restore_should_paint(stored.should_paint);
            groups.insert(name, group);
        }
        Ok(groups)
    }
}

/// Write one frame's record. An existing record is left alone so a rerun
/// keeps its cache.
pub fn write_frame_record(output_dir: &Path, frame: &Frame, max_pixel_distance: u16) -> Result<()> {
    let path = record_path(output_dir, frame.index);
    if path.exists() {
        log::warn!("not overwriting existing {}", path.display());
        return Ok(());
    }
    let dir = outlier_dir(output_dir);
    fs::create_dir_all(&dir).map_err(|e| SkyscrubError::io(&dir, e))?;
    let record = FrameRecord::from_frame(frame, max_pixel_distance);
    let json = serde_json::to_string(&record)?;
    fs::write(&path, json).map_err(|e| SkyscrubError::io(&path, e))?;
    log::debug!(
        "wrote {} groups of frame {} to {}",
        record.groups.len(),
        frame.index,
        path.display()
    );
    Ok(())
}

/// Load one frame's record if a previous run left one behind.
pub fn load_frame_record(output_dir: &Path, frame_index: usize) -> Result<Option<FrameRecord>> {
    let path = record_path(output_dir, frame_index);
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(&path).map_err(|e| SkyscrubError::io(&path, e))?;
    let record: FrameRecord = serde_json::from_str(&json)?;
    log::info!(
        "frame {} has {} cached outlier groups, skipping detection",
        frame_index,
        record.groups.len()
    );
    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounding_box::Coord;
    use ndarray::Array2;
    use tempfile::TempDir;

    fn sample_frame() -> Frame {
        let mask = Array2::from_elem((2, 3), 25u32);
        let mut group = OutlierGroup::new(
            "10_20".to_string(),
            7,
            6,
            900,
            BoundingBox::new(Coord::new(10, 20), Coord::new(12, 21)),
            mask,
            vec![Line {
                theta: 45.0,
                rho: 12.5,
                count: 4,
            }],
            0.4,
        );
        group.set_should_paint(PaintReason::GoodScore(0.8));
        let mut groups = HashMap::new();
        groups.insert(group.name.clone(), group);
        Frame::new(7, 100, 100, vec![6, 8], groups)
    }

    #[test]
    fn test_record_roundtrip() {
        let dir = TempDir::new().unwrap();
        let frame = sample_frame();
        write_frame_record(dir.path(), &frame, 333).unwrap();

        let record = load_frame_record(dir.path(), 7).unwrap().unwrap();
        assert_eq!(record.frame_index, 7);
        assert_eq!(record.groups["10_20"].max_pixel_distance, 333);

        let groups = record.into_groups().unwrap();
        let group = &groups["10_20"];
        assert_eq!(group.size, 6);
        assert_eq!(group.brightness, 900);
        assert_eq!(group.pixels.dim(), (2, 3));
        assert_eq!(group.should_paint(), Some(&PaintReason::GoodScore(0.8)));
        assert!(group.will_paint());
    }

    #[test]
    fn test_missing_record_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(load_frame_record(dir.path(), 3).unwrap().is_none());
    }

    #[test]
    fn test_existing_record_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let frame = sample_frame();
        write_frame_record(dir.path(), &frame, 100).unwrap();

        // a second write must leave the first record intact
        write_frame_record(dir.path(), &frame, 999).unwrap();
        let record = load_frame_record(dir.path(), 7).unwrap().unwrap();
        assert_eq!(record.groups["10_20"].max_pixel_distance, 100);
    }

    #[test]
    fn test_non_finite_floats_as_strings() {
        let stored = StoredGroup {
            size: 1,
            brightness: 1,
            bounds: BoundingBox::new(Coord::new(0, 0), Coord::new(0, 0)),
            pixels: vec![1],
            lines: vec![],
            hough_score: f64::INFINITY,
            max_pixel_distance: 10,
            should_paint: None,
        };
        let json = serde_json::to_string(&stored).unwrap();
        assert!(json.contains("\"inf\""));

        let back: StoredGroup = serde_json::from_str(&json).unwrap();
        assert!(back.hough_score.is_infinite() && back.hough_score > 0.0);

        let neg = serde_json::to_string(&StoredGroup {
            hough_score: f64::NEG_INFINITY,
            ..stored.clone()
        })
        .unwrap();
        assert!(neg.contains("\"-inf\""));

        let nan_json = serde_json::to_string(&StoredGroup {
            hough_score: f64::NAN,
            ..stored
        })
        .unwrap();
        assert!(nan_json.contains("\"nan\""));
        let back: StoredGroup = serde_json::from_str(&nan_json).unwrap();
        assert!(back.hough_score.is_nan());
    }
}
