use ebur128::{Channel, EbuR128, Mode};
use serde::Serialize;

use super::amplitude_to_db;
use super::level::LevelMetrics;
use crate::audio::buffer::AudioBuffer;

/// Gating block length in seconds. Shorter buffers are measured as one block.
pub const BLOCK_SECS: f64 = 0.4;
/// Blocks at or below this loudness are ignored as silence.
pub const ABSOLUTE_GATE_LUFS: f64 = -70.0;

/// Loudness estimate for mixing feedback. Not a certified BS.1770 meter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoudnessMetrics {
    /// Gated block loudness; negative infinity when nothing passes the gates.
    pub integrated_lufs: f64,
    pub true_peak_dbfs: f64,
    /// Sampled peak minus RMS. `None` when either is undefined (silence).
    pub crest_factor_db: Option<f64>,
}

pub fn analyze(buffer: &AudioBuffer, level: &LevelMetrics) -> LoudnessMetrics {
    let (integrated_lufs, true_peak) = match measure(buffer) {
        Ok(values) => values,
        Err(e) => {
            log::warn!("Loudness meter failed: {:?}", e);
            (f64::NEG_INFINITY, 0.0)
        }
    };
    LoudnessMetrics {
        integrated_lufs,
        // The meter's oversampled peak can land a hair under the sampled one.
        true_peak_dbfs: amplitude_to_db(true_peak.max(level.peak_linear)),
        crest_factor_db: crest_factor_db(level.peak_dbfs, level.rms_dbfs),
    }
}

pub fn crest_factor_db(peak_dbfs: f64, rms_dbfs: f64) -> Option<f64> {
    if peak_dbfs.is_finite() && rms_dbfs.is_finite() {
        Some((peak_dbfs - rms_dbfs).max(0.0))
    } else {
        None
    }
}

/// Integrated loudness and linear true peak over every channel.
fn measure(buffer: &AudioBuffer) -> Result<(f64, f64), ebur128::Error> {
    if buffer.is_empty() {
        return Ok((f64::NEG_INFINITY, 0.0));
    }

    let channel_count = buffer.channel_count() as u32;
    let mut meter = EbuR128::new(channel_count, buffer.sample_rate(), Mode::I | Mode::TRUE_PEAK)?;
    // Every channel weighs 1.0; the default map would drop a fourth channel as LFE.
    for c in 2..channel_count {
        meter.set_channel(c, Channel::Center)?;
    }

    let planar: Vec<&[f32]> = buffer.channels().collect();
    meter.add_frames_planar_f32(&planar)?;

    let integrated = if buffer.duration_secs() < BLOCK_SECS {
        short_loudness(&meter, buffer)?
    } else {
        meter.loudness_global()?
    };

    let mut true_peak = 0.0f64;
    for c in 0..channel_count {
        true_peak = true_peak.max(meter.true_peak(c)?);
    }

    Ok((integrated, true_peak))
}

/// The meter emits no gating block below 400 ms, so a short buffer is read
/// through a window covering just its own length.
fn short_loudness(meter: &EbuR128, buffer: &AudioBuffer) -> Result<f64, ebur128::Error> {
    let window_ms = ((buffer.duration_secs() * 1000.0) as u32).max(1);
    let loudness = meter.loudness_window(window_ms)?;
    Ok(if loudness > ABSOLUTE_GATE_LUFS {
        loudness
    } else {
        f64::NEG_INFINITY
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::level;
    use crate::analysis::test_signals::*;
    use crate::config::Thresholds;

    fn measure(buffer: &AudioBuffer) -> LoudnessMetrics {
        let level = level::analyze(buffer, &Thresholds::default());
        analyze(buffer, &level)
    }

    #[test]
    fn test_full_scale_sine_loudness() {
        let buffer = mono(48000, sine(997.0, 1.0, 48000, 48000 * 3));
        let loudness = measure(&buffer);
        assert!(
            (loudness.integrated_lufs + 3.01).abs() < 0.3,
            "loudness {}",
            loudness.integrated_lufs
        );
        let crest = loudness.crest_factor_db.unwrap();
        assert!((crest - 3.01).abs() < 0.05, "crest {}", crest);
    }

    #[test]
    fn test_quiet_sine_is_twenty_db_lower() {
        let loud = measure(&mono(48000, sine(997.0, 1.0, 48000, 48000 * 2)));
        let quiet = measure(&mono(48000, sine(997.0, 0.1, 48000, 48000 * 2)));
        let diff = loud.integrated_lufs - quiet.integrated_lufs;
        assert!((diff - 20.0).abs() < 0.05, "diff {}", diff);
    }

    #[test]
    fn test_silence_is_gated_out() {
        let tone = sine(997.0, 0.5, 48000, 48000);
        let tone_only = measure(&mono(48000, tone.clone()));

        let mut padded = tone;
        padded.extend(std::iter::repeat(0.0).take(48000 * 2));
        let with_silence = measure(&mono(48000, padded));

        assert!(
            (tone_only.integrated_lufs - with_silence.integrated_lufs).abs() < 1.0,
            "{} vs {}",
            tone_only.integrated_lufs,
            with_silence.integrated_lufs
        );
    }

    #[test]
    fn test_silent_and_empty_buffers() {
        for buffer in [mono(48000, vec![0.0; 48000]), mono(48000, vec![])] {
            let loudness = measure(&buffer);
            assert_eq!(loudness.integrated_lufs, f64::NEG_INFINITY);
            assert_eq!(loudness.true_peak_dbfs, f64::NEG_INFINITY);
            assert_eq!(loudness.crest_factor_db, None);
        }
    }

    #[test]
    fn test_short_buffer_is_one_block() {
        let loudness = measure(&mono(48000, sine(997.0, 1.0, 48000, 4800)));
        assert!(loudness.integrated_lufs.is_finite());
        assert!(loudness.integrated_lufs > -6.0);
    }

    #[test]
    fn test_true_peak_finds_inter_sample_peak() {
        // Quarter-rate sine sampled at 45 degrees: every sample sits at 0.707.
        let samples: Vec<f32> = (0..4800)
            .map(|n| (std::f64::consts::FRAC_PI_2 * n as f64 + std::f64::consts::FRAC_PI_4).sin() as f32)
            .collect();
        let buffer = mono(48000, samples);
        let level = level::analyze(&buffer, &Thresholds::default());
        let loudness = analyze(&buffer, &level);
        assert!((level.peak_dbfs + 3.01).abs() < 0.05);
        assert!(loudness.true_peak_dbfs > -0.5, "true peak {}", loudness.true_peak_dbfs);
        assert!(loudness.true_peak_dbfs < 1.0);
    }

    #[test]
    fn test_true_peak_never_below_sample_peak() {
        let buffer = stereo(44100, noise(8, 0.6, 5000), noise(9, 0.3, 5000));
        let level = level::analyze(&buffer, &Thresholds::default());
        let loudness = analyze(&buffer, &level);
        assert!(loudness.true_peak_dbfs >= level.peak_dbfs);
    }

    #[test]
    fn test_fourth_channel_counts_toward_loudness() {
        let tone = sine(997.0, 0.5, 48000, 48000);
        let silent = vec![0.0f32; 48000];
        let quad = |fourth: Vec<f32>| {
            AudioBuffer::new(48000, vec![silent.clone(), silent.clone(), silent.clone(), fourth])
                .unwrap()
        };
        let loudness = measure(&quad(tone));
        assert!(loudness.integrated_lufs.is_finite(), "{}", loudness.integrated_lufs);
        assert!((loudness.true_peak_dbfs + 6.02).abs() < 0.2);
        assert_eq!(measure(&quad(silent.clone())).integrated_lufs, f64::NEG_INFINITY);
    }

    #[test]
    fn test_short_quiet_buffer_is_gated() {
        let loudness = measure(&mono(48000, sine(997.0, 1e-5, 48000, 4800)));
        assert_eq!(loudness.integrated_lufs, f64::NEG_INFINITY);
        assert!(loudness.true_peak_dbfs.is_finite());
    }

    #[test]
    fn test_crest_factor_undefined_for_silence() {
        assert_eq!(crest_factor_db(f64::NEG_INFINITY, f64::NEG_INFINITY), None);
        assert_eq!(crest_factor_db(-1.0, -7.0), Some(6.0));
    }
}
