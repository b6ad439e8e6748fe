use serde::Serialize;

use super::TrackMetrics;
use crate::config::Thresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    ClippingRisk,
    ClippingDetected,
    MuddyLowEnd,
    DarkMix,
    PhaseCancellation,
    NarrowStereo,
    TooLoud,
    OverCompressed,
    ItemFailed,
    Unanalyzable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
}

/// One threshold check: `check` returns the message when the rule fires.
pub struct Rule {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub check: fn(&TrackMetrics, &Thresholds) -> Option<String>,
}

pub const RULES: &[Rule] = &[
    Rule {
        code: DiagnosticCode::ClippingRisk,
        severity: Severity::Warning,
        check: |m, t| {
            (m.level.peak_dbfs > t.peak_warning_dbfs).then(|| {
                format!("Peak level very hot: {:.1} dBFS (risk of clipping)", m.level.peak_dbfs)
            })
        },
    },
    Rule {
        code: DiagnosticCode::ClippingDetected,
        severity: Severity::Error,
        check: |m, _| {
            m.level.clipping.then(|| {
                format!("Clipping detected: {} clipped samples", m.level.clipped_samples)
            })
        },
    },
    Rule {
        code: DiagnosticCode::MuddyLowEnd,
        severity: Severity::Warning,
        check: |m, t| {
            let low = m.frequency.bands.low.db;
            (low > t.low_band_max_db).then(|| {
                format!("Excessive low-frequency energy: {:.1} dB of total (muddy mix)", low)
            })
        },
    },
    Rule {
        code: DiagnosticCode::DarkMix,
        severity: Severity::Info,
        check: |m, t| {
            let centroid = m.frequency.spectral_centroid_hz?;
            (centroid < t.spectral_centroid_min_hz)
                .then(|| format!("Spectral centroid very low: {:.0} Hz (dark mix)", centroid))
        },
    },
    Rule {
        code: DiagnosticCode::PhaseCancellation,
        severity: Severity::Warning,
        check: |m, t| {
            let stereo = m.stereo.as_ref()?;
            (stereo.phase_coherence < t.phase_coherence_min).then(|| {
                format!(
                    "Phase cancellation risk: coherence {:.2}, may cancel in mono",
                    stereo.phase_coherence
                )
            })
        },
    },
    Rule {
        code: DiagnosticCode::NarrowStereo,
        severity: Severity::Info,
        check: |m, t| {
            let stereo = m.stereo.as_ref()?;
            (stereo.width < t.stereo_width_min).then(|| {
                format!("Narrow stereo image: width {:.2}, mostly mono", stereo.width)
            })
        },
    },
    Rule {
        code: DiagnosticCode::TooLoud,
        severity: Severity::Warning,
        check: |m, t| {
            let lufs = m.loudness.integrated_lufs;
            (lufs > t.loudness_max_lufs).then(|| {
                format!(
                    "Too loud for streaming: {:.1} LUFS (target: {:.0} LUFS)",
                    lufs, t.loudness_target_lufs
                )
            })
        },
    },
    Rule {
        code: DiagnosticCode::OverCompressed,
        severity: Severity::Warning,
        check: |m, t| {
            let crest = m.loudness.crest_factor_db?;
            (crest < t.crest_factor_min_db)
                .then(|| format!("Low crest factor: {:.1} dB (possibly over-compressed)", crest))
        },
    },
];

/// Every rule that fires for `metrics`, in table order.
pub fn evaluate(metrics: &TrackMetrics, thresholds: &Thresholds) -> Vec<Diagnostic> {
    RULES
        .iter()
        .filter_map(|rule| {
            (rule.check)(metrics, thresholds).map(|message| Diagnostic {
                severity: rule.severity,
                code: rule.code,
                message,
            })
        })
        .collect()
}
