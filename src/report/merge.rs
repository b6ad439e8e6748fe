use crate::analysis::frequency::FrequencyMetrics;
use crate::analysis::level::{self, ChannelLevel};
use crate::analysis::loudness::{self, LoudnessMetrics};
use crate::analysis::stereo::StereoMetrics;
use crate::analysis::{power_to_db, ItemMetrics};
use crate::config::Thresholds;

use super::TrackMetrics;

/// Combines the items of one track, weighting each by its sample count.
/// Returns `None` for an empty slice.
pub fn merge_items(items: &[ItemMetrics], thresholds: &Thresholds) -> Option<TrackMetrics> {
    let first = items.first()?;

    let level = merge_level(items);
    let loudness = LoudnessMetrics {
        integrated_lufs: merge_loudness(items),
        true_peak_dbfs: items
            .iter()
            .map(|i| i.loudness.true_peak_dbfs)
            .fold(f64::NEG_INFINITY, f64::max),
        crest_factor_db: loudness::crest_factor_db(level.peak_dbfs, level.rms_dbfs),
    };

    Some(TrackMetrics {
        sample_rate: first.sample_rate,
        channels: items.iter().map(|i| i.channels).max().unwrap_or(0),
        duration_secs: items.iter().map(|i| i.duration_secs).sum(),
        level,
        frequency: merge_frequency(items),
        stereo: merge_stereo(items, thresholds),
        loudness,
    })
}

fn merge_level(items: &[ItemMetrics]) -> level::LevelMetrics {
    let channel_count = items.iter().map(|i| i.level.per_channel.len()).max().unwrap_or(0);

    let per_channel: Vec<ChannelLevel> = (0..channel_count)
        .map(|c| {
            let mut peak = 0.0f64;
            let mut energy = 0.0f64;
            let mut frames = 0usize;
            let mut clipped = 0usize;
            for item in items {
                if let Some(ch) = item.level.per_channel.get(c) {
                    peak = peak.max(ch.peak_linear);
                    energy += ch.rms_linear * ch.rms_linear * item.frames as f64;
                    frames += item.frames;
                    clipped += ch.clipped_samples;
                }
            }
            let rms = if frames > 0 {
                (energy / frames as f64).sqrt().min(peak)
            } else {
                0.0
            };
            level::channel_from_linear(peak, rms, clipped)
        })
        .collect();

    level::from_channels(per_channel)
}

fn merge_frequency(items: &[ItemMetrics]) -> FrequencyMetrics {
    let measured: Vec<&ItemMetrics> = items
        .iter()
        .filter(|i| !i.frequency.insufficient_samples)
        .collect();
    if measured.is_empty() {
        return FrequencyMetrics::new([0.0; 5], None, None, true);
    }

    // Long but silent items carry no spectral shape to average.
    let voiced: Vec<&ItemMetrics> = measured
        .into_iter()
        .filter(|i| i.frequency.spectral_centroid_hz.is_some())
        .collect();
    if voiced.is_empty() {
        return FrequencyMetrics::new([0.0; 5], None, None, false);
    }

    let mut fractions = [0.0f64; 5];
    for (slot, band) in fractions.iter_mut().enumerate() {
        *band = weighted_mean(voiced.iter().map(|i| (i.frequency.bands.fractions()[slot], i.frames)))
            .unwrap_or(0.0);
    }
    let centroid = weighted_mean(
        voiced
            .iter()
            .filter_map(|i| i.frequency.spectral_centroid_hz.map(|v| (v, i.frames))),
    );
    let rolloff = weighted_mean(
        voiced
            .iter()
            .filter_map(|i| i.frequency.spectral_rolloff_hz.map(|v| (v, i.frames))),
    );

    FrequencyMetrics::new(fractions, centroid, rolloff, false)
}

fn merge_stereo(items: &[ItemMetrics], thresholds: &Thresholds) -> Option<StereoMetrics> {
    let stereo: Vec<(&StereoMetrics, usize)> = items
        .iter()
        .filter_map(|i| i.stereo.as_ref().map(|s| (s, i.frames)))
        .collect();
    let width = weighted_mean(stereo.iter().map(|(s, w)| (s.width, *w)))?;
    let coherence = weighted_mean(stereo.iter().map(|(s, w)| (s.phase_coherence, *w)))?;
    Some(StereoMetrics::new(width, coherence, thresholds))
}

/// Energy-domain mean of the items that produced a finite loudness.
fn merge_loudness(items: &[ItemMetrics]) -> f64 {
    let energy = weighted_mean(
        items
            .iter()
            .filter(|i| i.loudness.integrated_lufs.is_finite())
            .map(|i| (10f64.powf(i.loudness.integrated_lufs / 10.0), i.frames)),
    );
    energy.map_or(f64::NEG_INFINITY, power_to_db)
}

/// Weighted mean; falls back to the plain mean when every weight is zero.
fn weighted_mean(values: impl Iterator<Item = (f64, usize)>) -> Option<f64> {
    let values: Vec<(f64, usize)> = values.collect();
    if values.is_empty() {
        return None;
    }
    let total: usize = values.iter().map(|(_, w)| w).sum();
    if total == 0 {
        return Some(values.iter().map(|(v, _)| v).sum::<f64>() / values.len() as f64);
    }
    Some(values.iter().map(|(v, w)| v * *w as f64).sum::<f64>() / total as f64)
}
