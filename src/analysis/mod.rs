pub mod frequency;
pub mod level;
pub mod loudness;
pub mod stereo;

use serde::Serialize;

use crate::audio::buffer::AudioBuffer;
use crate::config::Thresholds;

pub use frequency::{Band, BandEnergy, BandEnergies, FrequencyMetrics};
pub use level::{ChannelLevel, LevelMetrics};
pub use loudness::LoudnessMetrics;
pub use stereo::StereoMetrics;

/// Metrics for one decoded audio item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemMetrics {
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: usize,
    pub duration_secs: f64,
    pub level: LevelMetrics,
    pub frequency: FrequencyMetrics,
    /// `None` for mono items.
    pub stereo: Option<StereoMetrics>,
    pub loudness: LoudnessMetrics,
}

/// Runs every analyzer over one buffer.
///
/// Pure and deterministic: no I/O, no shared state, same output for the
/// same buffer and thresholds.
pub fn analyze_buffer(buffer: &AudioBuffer, thresholds: &Thresholds) -> ItemMetrics {
    let level = level::analyze(buffer, thresholds);
    let frequency = frequency::analyze(buffer);
    let stereo = stereo::analyze(buffer, thresholds);
    let loudness = loudness::analyze(buffer, &level);

    log::debug!(
        "Item: peak={:.2} dBFS, rms={:.2} dBFS, loudness={:.2} LUFS, true_peak={:.2} dBFS",
        level.peak_dbfs,
        level.rms_dbfs,
        loudness.integrated_lufs,
        loudness.true_peak_dbfs
    );

    ItemMetrics {
        sample_rate: buffer.sample_rate(),
        channels: buffer.channel_count(),
        frames: buffer.frames(),
        duration_secs: buffer.duration_secs(),
        level,
        frequency,
        stereo,
        loudness,
    }
}

/// Linear amplitude to dB. Zero and below map to negative infinity.
pub fn amplitude_to_db(linear: f64) -> f64 {
    if linear > 0.0 {
        20.0 * linear.log10()
    } else {
        f64::NEG_INFINITY
    }
}

/// Energy (power) ratio to dB. Zero and below map to negative infinity.
pub fn power_to_db(power: f64) -> f64 {
    if power > 0.0 {
        10.0 * power.log10()
    } else {
        f64::NEG_INFINITY
    }
}


#[cfg(test)]
mod tests {
    use super::test_signals::*;
    use super::*;

    #[test]
    fn test_db_conversions_guard_zero() {
        assert_eq!(amplitude_to_db(0.0), f64::NEG_INFINITY);
        assert_eq!(power_to_db(-1.0), f64::NEG_INFINITY);
        assert!((amplitude_to_db(0.5) + 6.0206).abs() < 1e-3);
        assert!((power_to_db(0.5) + 3.0103).abs() < 1e-3);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let left = noise(7, 0.4, 30000);
        let right = noise(11, 0.4, 30000);
        let buffer = stereo(48000, left, right);
        let thresholds = Thresholds::default();
        let first = analyze_buffer(&buffer, &thresholds);
        let second = analyze_buffer(&buffer, &thresholds);
        assert_eq!(first, second);
    }

    #[test]
    fn test_mono_item_has_no_stereo_metrics() {
        let buffer = mono(44100, sine(440.0, 0.25, 44100, 44100));
        let metrics = analyze_buffer(&buffer, &Thresholds::default());
        assert!(metrics.stereo.is_none());
        assert_eq!(metrics.channels, 1);
        assert!((metrics.duration_secs - 1.0).abs() < 1e-9);
    }
}
