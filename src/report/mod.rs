pub mod aggregate;
pub mod diagnostics;
pub mod merge;

use serde::Serialize;

use crate::analysis::{FrequencyMetrics, LevelMetrics, LoudnessMetrics, StereoMetrics};

pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};

/// Metrics of every analyzed item of a track, merged sample-weighted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackMetrics {
    /// Sample rate of the first analyzed item.
    pub sample_rate: u32,
    /// Widest channel count among the items.
    pub channels: usize,
    pub duration_secs: f64,
    pub level: LevelMetrics,
    pub frequency: FrequencyMetrics,
    /// `None` when no item had two or more channels.
    pub stereo: Option<StereoMetrics>,
    pub loudness: LoudnessMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    Analyzed,
    /// No item of the track could be decoded, or it had none.
    Unanalyzable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub track: String,
    pub status: TrackStatus,
    pub items_analyzed: usize,
    pub items_failed: usize,
    #[serde(flatten)]
    pub metrics: Option<TrackMetrics>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisReport {
    pub fn has(&self, code: DiagnosticCode) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }
}

/// Reports in the order the tracks were requested. Duplicate track names
/// stay separate entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReportSet {
    pub reports: Vec<AnalysisReport>,
}

impl ReportSet {
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnalysisReport> {
        self.reports.iter()
    }

    /// First report for `track`.
    pub fn get(&self, track: &str) -> Option<&AnalysisReport> {
        self.reports.iter().find(|r| r.track == track)
    }
}
