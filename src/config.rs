use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub thresholds: Thresholds,
}

/// Diagnostic thresholds shared by the analyzers and the report rules.
///
/// The defaults are the engine's reference values. Overriding them is meant
/// for tests and tuning, not per-request configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Sampled peak above this (dBFS) warns about clipping risk.
    #[serde(default = "default_peak_warning_dbfs")]
    pub peak_warning_dbfs: f64,
    /// Absolute sample value at or above which a sample counts as clipped.
    #[serde(default = "default_clip_level")]
    pub clip_level: f32,
    /// Low band share of total spectral energy (dB) above which the mix is muddy.
    #[serde(default = "default_low_band_max_db")]
    pub low_band_max_db: f64,
    /// Phase coherence below this breaks mono compatibility.
    #[serde(default = "default_phase_coherence_min")]
    pub phase_coherence_min: f64,
    #[serde(default = "default_loudness_max_lufs")]
    pub loudness_max_lufs: f64,
    /// Streaming reference quoted in the loudness diagnostic.
    #[serde(default = "default_loudness_target_lufs")]
    pub loudness_target_lufs: f64,
    #[serde(default = "default_crest_factor_min_db")]
    pub crest_factor_min_db: f64,
    #[serde(default = "default_spectral_centroid_min_hz")]
    pub spectral_centroid_min_hz: f64,
    #[serde(default = "default_stereo_width_min")]
    pub stereo_width_min: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            peak_warning_dbfs: default_peak_warning_dbfs(),
            clip_level: default_clip_level(),
            low_band_max_db: default_low_band_max_db(),
            phase_coherence_min: default_phase_coherence_min(),
            loudness_max_lufs: default_loudness_max_lufs(),
            loudness_target_lufs: default_loudness_target_lufs(),
            crest_factor_min_db: default_crest_factor_min_db(),
            spectral_centroid_min_hz: default_spectral_centroid_min_hz(),
            stereo_width_min: default_stereo_width_min(),
        }
    }
}

fn default_peak_warning_dbfs() -> f64 { -0.3 }
fn default_clip_level() -> f32 { 0.999 }
fn default_low_band_max_db() -> f64 { -6.0 }
fn default_phase_coherence_min() -> f64 { 0.5 }
fn default_loudness_max_lufs() -> f64 { -8.0 }
fn default_loudness_target_lufs() -> f64 { -14.0 }
fn default_crest_factor_min_db() -> f64 { 6.0 }
fn default_spectral_centroid_min_hz() -> f64 { 500.0 }
fn default_stereo_width_min() -> f64 { 0.1 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}
