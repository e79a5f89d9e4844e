//! Run configuration.
//!
//! All detection and tracking thresholds live here and are passed opaquely
//! into the components that use them. The numeric values are tuned for
//! night-sky timelapse sequences; they are configuration, not constants to
//! be re-derived.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkyscrubError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convert a percentage of full brightness into a 16 bit pixel distance.
pub fn sixteen_bit_version(percentage: f64) -> u16 {
    ((percentage / 100.0) * f64::from(u16::MAX)) as u16
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory under which the output sequence directory is created.
    pub output_path: PathBuf,

    /// Name of the directory containing the input sequence.
    pub image_sequence_dirname: String,

    /// Where the input image sequence directory lives.
    pub image_sequence_path: PathBuf,

    /// Percentage difference between the same pixel on adjacent frames
    /// required to seed an outlier group.
    pub outlier_max_threshold: f64,

    /// Lower percentage difference a pixel needs to be absorbed into an
    /// already seeded group.
    pub outlier_min_threshold: f64,

    /// Groups smaller than this many pixels are ignored.
    pub min_group_size: usize,

    /// Minimum group size at the very top row of the frame; interpolated
    /// down to `min_group_size` at the bottom of the upper sky region.
    pub min_group_size_at_top: usize,

    /// Percentage of the frame height, from the top, treated as upper sky
    /// for the interpolated minimum size.
    pub upper_sky_percentage: f64,

    /// How close hough line theta must be between matching groups on
    /// different frames, in degrees.
    pub final_theta_diff: f64,

    /// How close hough line rho must be between matching groups, in pixels.
    pub final_rho_diff: f64,

    /// How close a streak's direction of travel must be to the line
    /// orientation at its endpoints, in degrees.
    pub center_line_theta_diff: f64,

    /// A hough score below this is considered far from a line; such groups
    /// are eligible for the adjacent-overlap pass.
    pub medium_hough_line_score: f64,

    /// Groups smaller than this must clear `max_must_look_like_line_score`
    /// (or a low surface area ratio) to survive the early reject filter.
    pub max_must_look_like_line_size: usize,
    pub max_must_look_like_line_score: f64,
    pub surface_area_to_size_max: f64,

    /// Neighbor radius for inter-frame processing, in each direction.
    pub number_final_processing_neighbors_needed: usize,

    /// Concurrency cap for the per-frame detection stage.
    pub num_concurrent_renders: usize,

    /// Concurrency cap for the final paint and write stage.
    pub num_concurrent_saves: usize,

    /// Adjacent-overlap pass gates.
    pub overlap_min_box_overlap: f64,
    pub overlap_min_pixel_overlap: f64,
    pub overlap_max_center_distance: f64,
    pub overlap_max_size_ratio: f64,

    /// Write debug images tinting each group by its paint reason instead
    /// of repairing the frame.
    pub test_paint: bool,
    pub test_paint_output_path: PathBuf,

    /// Persist each frame's outlier groups under the output directory so
    /// reruns can skip detection.
    pub write_outlier_group_files: bool,

    /// Crate version recorded into the config dump for provenance.
    pub version: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_path: PathBuf::from("."),
            image_sequence_dirname: String::new(),
            image_sequence_path: PathBuf::from("."),
            outlier_max_threshold: 13.0,
            outlier_min_threshold: 9.0,
            min_group_size: 80,
            min_group_size_at_top: 400,
            upper_sky_percentage: 66.0,
            final_theta_diff: 10.0,
            final_rho_diff: 20.0,
            center_line_theta_diff: 18.0,
            medium_hough_line_score: 0.4,
            max_must_look_like_line_size: 500,
            max_must_look_like_line_score: 0.25,
            surface_area_to_size_max: 0.5,
            number_final_processing_neighbors_needed: 1,
            num_concurrent_renders: 1,
            num_concurrent_saves: 1,
            overlap_min_box_overlap: 0.33,
            overlap_min_pixel_overlap: 0.05,
            overlap_max_center_distance: 300.0,
            overlap_max_size_ratio: 5.0,
            test_paint: false,
            test_paint_output_path: PathBuf::new(),
            write_outlier_group_files: false,
            version: VERSION.to_string(),
        }
    }
}

impl Config {
    /// Seed threshold as a 16 bit pixel distance.
    pub fn max_pixel_distance(&self) -> u16 {
        sixteen_bit_version(self.outlier_max_threshold)
    }

    /// Grow threshold as a 16 bit pixel distance.
    pub fn min_pixel_distance(&self) -> u16 {
        sixteen_bit_version(self.outlier_min_threshold)
    }

    /// Directory all run products land in. Namespaced by version so a
    /// rerun with a different build never collides with older output.
    pub fn output_dir(&self) -> PathBuf {
        self.output_path
            .join(format!("{}-skyscrub-v{}", self.image_sequence_dirname, self.version))
    }

    /// Read a config from `dirname/config.json`.
    pub fn read_from_dir(dirname: &Path) -> Result<Config> {
        let path = dirname.join("config.json");
        let file = File::open(&path).map_err(|e| SkyscrubError::io(&path, e))?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Write this config as pretty JSON into `dirname/config.json`. An
    /// existing file is left untouched so the config that produced a
    /// sequence survives reruns.
    pub fn write_json(&self, dirname: &Path) -> Result<()> {
        let path = dirname.join("config.json");
        if path.exists() {
            log::warn!("not writing {}, it already exists", path.display());
            return Ok(());
        }
        log::info!("creating {}", path.display());
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(&path).map_err(|e| SkyscrubError::io(&path, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| SkyscrubError::io(&path, e))?;
        Ok(())
    }

    /// Validate relationships between fields before a run starts.
    pub fn validate(&self) -> Result<()> {
        if self.outlier_min_threshold > self.outlier_max_threshold {
            return Err(SkyscrubError::Config(format!(
                "outlier_min_threshold {} exceeds outlier_max_threshold {}",
                self.outlier_min_threshold, self.outlier_max_threshold
            )));
        }
        if self.num_concurrent_renders == 0 || self.num_concurrent_saves == 0 {
            return Err(SkyscrubError::Config(
                "concurrency limits must be at least 1".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.upper_sky_percentage) {
            return Err(SkyscrubError::Config(format!(
                "upper_sky_percentage {} not a percentage",
                self.upper_sky_percentage
            )));
        }
        Ok(())
    }
}
