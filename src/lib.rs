//! Stereo analysis for vectorscope displays.
//!
//! The analysis core lives in [`audio::metrics`], [`audio::vectorscope`] and
//! [`audio::spectrum`]: pure per-tick functions over borrowed frames that
//! write into caller-owned buffers. [`driver::FrameDriver`] sequences them
//! once per display tick over any [`driver::FrameSource`].

pub mod audio;
pub mod config;
pub mod driver;
pub mod encode;
pub mod error;
pub mod readout;
pub mod render;

pub use audio::features::{FrequencyFrame, MetricsRecord, StereoFrame};
pub use audio::metrics::{compute_metrics, to_db};
pub use audio::spectrum::{build_curve, SpectrumCurve};
pub use audio::vectorscope::{transform, PointBuffer};
pub use driver::{FrameDriver, FrameSource};
pub use error::AnalyzerError;
