use serde::Serialize;

use crate::audio::buffer::AudioBuffer;
use crate::config::Thresholds;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StereoMetrics {
    /// Side energy over mid plus side energy: 0.0 is mono, 1.0 is fully out of phase.
    pub width: f64,
    /// Zero-lag normalized correlation of left and right, -1.0 to 1.0.
    pub phase_coherence: f64,
    pub mono_compatible: bool,
}

impl StereoMetrics {
    pub(crate) fn new(width: f64, phase_coherence: f64, thresholds: &Thresholds) -> Self {
        Self {
            width: width.clamp(0.0, 1.0),
            phase_coherence: phase_coherence.clamp(-1.0, 1.0),
            mono_compatible: phase_coherence >= thresholds.phase_coherence_min,
        }
    }
}

/// Measures the first two channels as left and right.
///
/// Returns `None` for mono buffers. Two silent channels count as fully
/// coherent since nothing can cancel; one silent channel against signal is
/// uncorrelated.
pub fn analyze(buffer: &AudioBuffer, thresholds: &Thresholds) -> Option<StereoMetrics> {
    let (left, right) = match (buffer.channel(0), buffer.channel(1)) {
        (Some(l), Some(r)) => (l, r),
        _ => return None,
    };

    let mut mid_energy = 0.0f64;
    let mut side_energy = 0.0f64;
    let mut sum_ll = 0.0f64;
    let mut sum_rr = 0.0f64;
    let mut sum_lr = 0.0f64;

    for (&l, &r) in left.iter().zip(right) {
        let (l, r) = (l as f64, r as f64);
        let mid = (l + r) * 0.5;
        let side = (l - r) * 0.5;
        mid_energy += mid * mid;
        side_energy += side * side;
        sum_ll += l * l;
        sum_rr += r * r;
        sum_lr += l * r;
    }

    let total = mid_energy + side_energy;
    let width = if total > 0.0 { side_energy / total } else { 0.0 };

    let phase_coherence = match (sum_ll > 0.0, sum_rr > 0.0) {
        (true, true) => sum_lr / (sum_ll.sqrt() * sum_rr.sqrt()),
        (false, false) => 1.0,
        _ => 0.0,
    };

    Some(StereoMetrics::new(width, phase_coherence, thresholds))
}
