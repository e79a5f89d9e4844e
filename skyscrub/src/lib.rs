//! Airplane streak detection and removal for astrophotography timelapses.
//!
//! Night-sky timelapse sequences frequently pick up airplane light trails:
//! bright, roughly linear smears that move a consistent distance between
//! consecutive frames. This crate detects those trails by differencing each
//! frame against its temporal neighbors, groups the outlying pixels, scores
//! each group with a set of empirically fit heuristics, validates candidate
//! streaks across frames with distance/angle consistency, and finally paints
//! the offending pixels over with data from an adjacent frame.
//!
//! The processing pipeline has three stages:
//!
//! 1. Per-frame outlier detection, data-parallel across frames
//!    ([`detect`], driven by [`pipeline`]).
//! 2. A strictly sequential sliding-window pass that assembles streaks and
//!    suppresses stationary objects ([`streak`]).
//! 3. Parallel paint-and-write of finished frames ([`frame`], [`image_io`]).

pub mod bounding_box;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod hough;
pub mod image_io;
pub mod outlier;
pub mod paint;
pub mod persist;
pub mod pipeline;
pub mod review;
pub mod score;
pub mod streak;

pub use bounding_box::{BoundingBox, Coord};
pub use config::Config;
pub use error::SkyscrubError;
pub use frame::{Frame, FrameState};
pub use hough::Line;
pub use outlier::OutlierGroup;
pub use paint::PaintReason;
pub use pipeline::Pipeline;
