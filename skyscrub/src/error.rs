//! Error types shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by detection, I/O, and pipeline setup.
///
/// Invariant violations (a pixel left ungrouped by the flood fill, a frame
/// state machine asked to move backwards) are programming faults and panic
/// instead of appearing here.
#[derive(Debug, Error)]
pub enum SkyscrubError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error on {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unsupported image format for {path}: {reason}")]
    UnsupportedImage { path: PathBuf, reason: String },

    /// Output files are never clobbered; a prior run's results stay intact.
    #[error("refusing to overwrite existing file {0}")]
    WouldOverwrite(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("frame {index} has no usable neighbor frames")]
    NoNeighbors { index: usize },
}

impl SkyscrubError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SkyscrubError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        SkyscrubError::Image {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SkyscrubError>;
