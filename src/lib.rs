//! Mixing-feedback analysis for multitrack audio projects.
//!
//! Decoded audio items are measured for level, frequency balance, stereo
//! image and loudness, merged per track, and checked against a table of
//! diagnostic thresholds.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod report;
pub mod session;

pub use analysis::{analyze_buffer, ItemMetrics};
pub use audio::buffer::{AudioBuffer, BufferError};
pub use audio::decode::{AudioDecoder, DecodeError, SymphoniaDecoder};
pub use config::Thresholds;
pub use report::aggregate::{ReportAggregator, TrackSource};
pub use report::{AnalysisReport, ReportSet};
