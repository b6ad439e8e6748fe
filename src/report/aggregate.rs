use rayon::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::diagnostics::{self, Diagnostic, DiagnosticCode, Severity};
use super::merge::merge_items;
use super::{AnalysisReport, ReportSet, TrackStatus};
use crate::analysis::{analyze_buffer, ItemMetrics};
use crate::audio::decode::{AudioDecoder, DecodeError};
use crate::config::Thresholds;

/// A track to analyze and the audio items placed on it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrackSource {
    pub name: String,
    #[serde(default)]
    pub items: Vec<PathBuf>,
}

impl TrackSource {
    pub fn new(name: impl Into<String>, items: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            name: name.into(),
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

/// An item that could not be decoded.
#[derive(Debug)]
pub struct ItemFailure {
    pub item: PathBuf,
    pub error: DecodeError,
}

/// Decodes, analyzes and merges tracks into a [`ReportSet`].
///
/// Tracks and their items are processed in parallel; reports come back in
/// request order. A failing item never aborts the run.
pub struct ReportAggregator<'a, D: AudioDecoder> {
    decoder: &'a D,
    thresholds: &'a Thresholds,
    on_item: Option<&'a (dyn Fn() + Sync)>,
}

impl<'a, D: AudioDecoder> ReportAggregator<'a, D> {
    pub fn new(decoder: &'a D, thresholds: &'a Thresholds) -> Self {
        Self {
            decoder,
            thresholds,
            on_item: None,
        }
    }

    /// Called once per finished item, successful or not.
    pub fn with_progress(mut self, on_item: &'a (dyn Fn() + Sync)) -> Self {
        self.on_item = Some(on_item);
        self
    }

    pub fn run(&self, tracks: &[TrackSource], track_filter: Option<&str>) -> ReportSet {
        let selected: Vec<&TrackSource> = tracks
            .iter()
            .filter(|t| matches_filter(&t.name, track_filter))
            .collect();

        log::info!(
            "Analyzing {} of {} tracks ({} items)",
            selected.len(),
            tracks.len(),
            selected.iter().map(|t| t.items.len()).sum::<usize>()
        );

        let reports = selected
            .par_iter()
            .map(|track| self.analyze_track(track))
            .collect();

        ReportSet { reports }
    }

    fn analyze_track(&self, track: &TrackSource) -> AnalysisReport {
        let outcomes: Vec<Result<ItemMetrics, ItemFailure>> = track
            .items
            .par_iter()
            .map(|item| {
                let outcome = self.analyze_item(item);
                if let Some(on_item) = self.on_item {
                    on_item();
                }
                outcome
            })
            .collect();

        let mut items = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(metrics) => items.push(metrics),
                Err(failure) => failures.push(failure),
            }
        }

        build_report(&track.name, &items, &failures, self.thresholds)
    }

    fn analyze_item(&self, item: &Path) -> Result<ItemMetrics, ItemFailure> {
        match self.decoder.decode(item) {
            Ok(buffer) => Ok(analyze_buffer(&buffer, self.thresholds)),
            Err(error) => {
                log::warn!("Could not analyze {}: {}", item.display(), error);
                Err(ItemFailure {
                    item: item.to_path_buf(),
                    error,
                })
            }
        }
    }
}

/// Case-insensitive substring match; no filter selects every track.
pub fn matches_filter(name: &str, track_filter: Option<&str>) -> bool {
    match track_filter {
        Some(filter) => name.to_lowercase().contains(&filter.to_lowercase()),
        None => true,
    }
}

/// Merges analyzed items into a report. Failures become diagnostics; a
/// track with nothing analyzed is marked unanalyzable.
pub fn build_report(
    track: &str,
    items: &[ItemMetrics],
    failures: &[ItemFailure],
    thresholds: &Thresholds,
) -> AnalysisReport {
    let metrics = merge_items(items, thresholds);

    let mut report_diagnostics: Vec<Diagnostic> = failures
        .iter()
        .map(|f| Diagnostic {
            severity: Severity::Warning,
            code: DiagnosticCode::ItemFailed,
            message: format!("could not analyze item: {}: {}", f.item.display(), f.error),
        })
        .collect();

    let status = match &metrics {
        Some(m) => {
            report_diagnostics.extend(diagnostics::evaluate(m, thresholds));
            TrackStatus::Analyzed
        }
        None => {
            let message = if failures.is_empty() {
                "track has no audio items".to_string()
            } else {
                format!("none of the {} audio items could be analyzed", failures.len())
            };
            report_diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: DiagnosticCode::Unanalyzable,
                message,
            });
            TrackStatus::Unanalyzable
        }
    };

    log::debug!(
        "Track '{}': {:?}, {} diagnostics",
        track,
        status,
        report_diagnostics.len()
    );

    AnalysisReport {
        track: track.to_string(),
        status,
        items_analyzed: items.len(),
        items_failed: failures.len(),
        metrics,
        diagnostics: report_diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        assert!(matches_filter("Lead Vocal", Some("vocal")));
        assert!(matches_filter("Lead Vocal", Some("LEAD")));
        assert!(!matches_filter("Bass DI", Some("vocal")));
        assert!(matches_filter("Bass DI", None));
        assert!(matches_filter("Bass DI", Some("")));
    }

    #[test]
    fn test_track_without_items_is_unanalyzable() {
        let report = build_report("Empty", &[], &[], &Thresholds::default());
        assert_eq!(report.status, TrackStatus::Unanalyzable);
        assert!(report.metrics.is_none());
        assert!(report.has(DiagnosticCode::Unanalyzable));
    }

    #[test]
    fn test_failures_become_diagnostics() {
        let failures = vec![ItemFailure {
            item: PathBuf::from("missing.wav"),
            error: DecodeError::NotFound(PathBuf::from("missing.wav")),
        }];
        let report = build_report("Gtr", &[], &failures, &Thresholds::default());
        assert_eq!(report.items_failed, 1);
        assert_eq!(report.status, TrackStatus::Unanalyzable);
        let failed = &report.diagnostics[0];
        assert_eq!(failed.code, DiagnosticCode::ItemFailed);
        assert!(failed.message.starts_with("could not analyze item: missing.wav"));
    }
}
