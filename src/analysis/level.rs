use serde::Serialize;

use super::amplitude_to_db;
use crate::audio::buffer::AudioBuffer;
use crate::config::Thresholds;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelLevel {
    pub peak_linear: f64,
    pub peak_dbfs: f64,
    pub rms_linear: f64,
    pub rms_dbfs: f64,
    pub clipped_samples: usize,
}

/// Sampled peak and RMS levels.
///
/// Overall peak is the maximum over every channel; overall RMS is the
/// loudest channel's RMS. Silent or empty input reports negative infinity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelMetrics {
    pub peak_linear: f64,
    pub peak_dbfs: f64,
    pub rms_linear: f64,
    pub rms_dbfs: f64,
    pub per_channel: Vec<ChannelLevel>,
    pub clipping: bool,
    pub clipped_samples: usize,
}

pub fn analyze(buffer: &AudioBuffer, thresholds: &Thresholds) -> LevelMetrics {
    let per_channel: Vec<ChannelLevel> = buffer
        .channels()
        .map(|samples| channel_level(samples, thresholds.clip_level))
        .collect();
    from_channels(per_channel)
}

/// Builds overall metrics from per-channel levels.
pub fn from_channels(per_channel: Vec<ChannelLevel>) -> LevelMetrics {
    let peak_linear = per_channel.iter().map(|c| c.peak_linear).fold(0.0, f64::max);
    let rms_linear = per_channel.iter().map(|c| c.rms_linear).fold(0.0, f64::max);
    let clipped_samples = per_channel.iter().map(|c| c.clipped_samples).sum();

    LevelMetrics {
        peak_linear,
        peak_dbfs: amplitude_to_db(peak_linear),
        rms_linear,
        rms_dbfs: amplitude_to_db(rms_linear),
        per_channel,
        clipping: clipped_samples > 0,
        clipped_samples,
    }
}

fn channel_level(samples: &[f32], clip_level: f32) -> ChannelLevel {
    let mut peak = 0.0f32;
    let mut sum_sq = 0.0f64;
    let mut clipped_samples = 0;
    for &s in samples {
        let a = s.abs();
        peak = peak.max(a);
        sum_sq += (s as f64) * (s as f64);
        if a >= clip_level {
            clipped_samples += 1;
        }
    }

    let peak_linear = peak as f64;
    let rms_linear = if samples.is_empty() {
        0.0
    } else {
        // Rounding in the mean can push a constant signal a hair over its peak.
        (sum_sq / samples.len() as f64).sqrt().min(peak_linear)
    };

    channel_from_linear(peak_linear, rms_linear, clipped_samples)
}

pub(crate) fn channel_from_linear(
    peak_linear: f64,
    rms_linear: f64,
    clipped_samples: usize,
) -> ChannelLevel {
    ChannelLevel {
        peak_linear,
        peak_dbfs: amplitude_to_db(peak_linear),
        rms_linear,
        rms_dbfs: amplitude_to_db(rms_linear),
        clipped_samples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_signals::*;

    #[test]
    fn test_full_scale_sine_levels() {
        let buffer = mono(44100, sine(1000.0, 1.0, 44100, 44100));
        let level = analyze(&buffer, &Thresholds::default());
        assert!((level.rms_dbfs + 3.0103).abs() < 0.05, "rms {}", level.rms_dbfs);
        assert!(level.peak_dbfs.abs() < 0.01, "peak {}", level.peak_dbfs);
        assert!(level.rms_dbfs <= level.peak_dbfs);
        // Sampled peaks above the 0.999 clip level count as clipping.
        assert!(level.clipping);
        assert!(level.clipped_samples > 0);
    }

    #[test]
    fn test_clean_sine_below_clip_level_is_not_clipping() {
        let buffer = mono(44100, sine(1000.0, 0.99, 44100, 44100));
        let level = analyze(&buffer, &Thresholds::default());
        assert!(!level.clipping);
        assert_eq!(level.clipped_samples, 0);
    }

    #[test]
    fn test_single_full_scale_sample_flags_clipping() {
        let mut samples = vec![0.01f32; 1000];
        samples[500] = -1.0;
        let level = analyze(&mono(48000, samples), &Thresholds::default());
        assert!(level.clipping);
        assert_eq!(level.clipped_samples, 1);
        assert_eq!(level.peak_dbfs, 0.0);
    }

    #[test]
    fn test_silence_reports_sentinel() {
        let thresholds = Thresholds::default();
        for buffer in [mono(48000, vec![0.0; 4096]), mono(48000, vec![])] {
            let level = analyze(&buffer, &thresholds);
            assert_eq!(level.peak_dbfs, f64::NEG_INFINITY);
            assert_eq!(level.rms_dbfs, f64::NEG_INFINITY);
            assert!(!level.clipping);
        }
    }

    #[test]
    fn test_per_channel_and_overall() {
        let buffer = stereo(
            48000,
            sine(100.0, 0.5, 48000, 4800),
            sine(100.0, 0.25, 48000, 4800),
        );
        let level = analyze(&buffer, &Thresholds::default());
        assert_eq!(level.per_channel.len(), 2);
        assert!((level.per_channel[0].peak_dbfs + 6.02).abs() < 0.05);
        assert!((level.per_channel[1].peak_dbfs + 12.04).abs() < 0.05);
        assert_eq!(level.rms_linear, level.per_channel[0].rms_linear);
        assert_eq!(level.peak_linear, level.per_channel[0].peak_linear);
    }

    #[test]
    fn test_rms_never_exceeds_peak() {
        let constant = mono(48000, vec![0.3; 10007]);
        let level = analyze(&constant, &Thresholds::default());
        assert!(level.rms_dbfs <= level.peak_dbfs);

        let buffer = mono(44100, noise(3, 0.8, 20000));
        let level = analyze(&buffer, &Thresholds::default());
        assert!(level.rms_dbfs <= level.peak_dbfs);
    }
}
