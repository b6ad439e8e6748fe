use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;

use super::power_to_db;
use crate::audio::buffer::AudioBuffer;

/// Window length of the spectral transform, in samples.
pub const FFT_SIZE: usize = 4096;
/// Step between consecutive windows (50% overlap).
pub const HOP_SIZE: usize = 2048;
/// Share of band-range energy that defines the spectral rolloff.
pub const ROLLOFF_FRACTION: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Low,
    LowMid,
    Mid,
    HighMid,
    High,
}

impl Band {
    pub const ALL: [Band; 5] = [Band::Low, Band::LowMid, Band::Mid, Band::HighMid, Band::High];

    /// Cutoffs in Hz, lower bound inclusive, upper bound exclusive
    /// (the top band includes 20 kHz).
    pub fn range_hz(self) -> (f64, f64) {
        match self {
            Band::Low => (20.0, 250.0),
            Band::LowMid => (250.0, 500.0),
            Band::Mid => (500.0, 2000.0),
            Band::HighMid => (2000.0, 6000.0),
            Band::High => (6000.0, 20000.0),
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn containing(freq_hz: f64) -> Option<Band> {
        if freq_hz == 20000.0 {
            return Some(Band::High);
        }
        Band::ALL.into_iter().find(|band| {
            let (low, high) = band.range_hz();
            freq_hz >= low && freq_hz < high
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandEnergy {
    /// Share of total band-range energy, 0.0 to 1.0.
    pub fraction: f64,
    /// Same share in dB relative to the total.
    pub db: f64,
}

impl BandEnergy {
    fn from_fraction(fraction: f64) -> Self {
        Self {
            fraction,
            db: power_to_db(fraction),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandEnergies {
    pub low: BandEnergy,
    pub low_mid: BandEnergy,
    pub mid: BandEnergy,
    pub high_mid: BandEnergy,
    pub high: BandEnergy,
}

impl BandEnergies {
    fn from_fractions(f: [f64; 5]) -> Self {
        Self {
            low: BandEnergy::from_fraction(f[0]),
            low_mid: BandEnergy::from_fraction(f[1]),
            mid: BandEnergy::from_fraction(f[2]),
            high_mid: BandEnergy::from_fraction(f[3]),
            high: BandEnergy::from_fraction(f[4]),
        }
    }

    pub fn get(&self, band: Band) -> &BandEnergy {
        match band {
            Band::Low => &self.low,
            Band::LowMid => &self.low_mid,
            Band::Mid => &self.mid,
            Band::HighMid => &self.high_mid,
            Band::High => &self.high,
        }
    }

    pub fn fractions(&self) -> [f64; 5] {
        Band::ALL.map(|band| self.get(band).fraction)
    }
}

/// Spectral balance of the mono sum.
///
/// With no measurable energy every band reports a zero fraction and the
/// optional fields are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyMetrics {
    pub bands: BandEnergies,
    pub dominant_band: Option<Band>,
    pub spectral_centroid_hz: Option<f64>,
    pub spectral_rolloff_hz: Option<f64>,
    /// Fewer samples than one analysis window.
    pub insufficient_samples: bool,
}

impl FrequencyMetrics {
    pub(crate) fn new(
        fractions: [f64; 5],
        spectral_centroid_hz: Option<f64>,
        spectral_rolloff_hz: Option<f64>,
        insufficient_samples: bool,
    ) -> Self {
        let dominant_band = Band::ALL
            .into_iter()
            .filter(|band| fractions[band.index()] > 0.0)
            .fold(None, |best: Option<Band>, band| match best {
                Some(b) if fractions[b.index()] >= fractions[band.index()] => Some(b),
                _ => Some(band),
            });
        Self {
            bands: BandEnergies::from_fractions(fractions),
            dominant_band,
            spectral_centroid_hz,
            spectral_rolloff_hz,
            insufficient_samples,
        }
    }

    fn insufficient() -> Self {
        Self::new([0.0; 5], None, None, true)
    }
}

pub fn analyze(buffer: &AudioBuffer) -> FrequencyMetrics {
    if buffer.frames() < FFT_SIZE {
        return FrequencyMetrics::insufficient();
    }

    let samples = buffer.mono_sum();
    let spectrum = average_power_spectrum(&samples);
    let bin_hz = buffer.sample_rate() as f64 / FFT_SIZE as f64;

    let mut band_energy = [0.0f64; 5];
    let mut weighted_freq = 0.0f64;
    for (k, &power) in spectrum.iter().enumerate() {
        let freq = k as f64 * bin_hz;
        if let Some(band) = Band::containing(freq) {
            band_energy[band.index()] += power;
            weighted_freq += freq * power;
        }
    }

    let total: f64 = band_energy.iter().sum();
    if total <= 0.0 {
        return FrequencyMetrics::new([0.0; 5], None, None, false);
    }

    let fractions = band_energy.map(|e| e / total);
    let centroid = weighted_freq / total;
    let rolloff = rolloff_hz(&spectrum, bin_hz, total);

    FrequencyMetrics::new(fractions, Some(centroid), rolloff, false)
}

/// Mean magnitude-squared spectrum over all full windows, bins `0..=FFT_SIZE/2`.
fn average_power_spectrum(samples: &[f32]) -> Vec<f64> {
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FFT_SIZE);
    let hann = hann_window(FFT_SIZE);

    let bins = FFT_SIZE / 2 + 1;
    let mut power = vec![0.0f64; bins];
    let mut windows = 0usize;

    let mut pos = 0;
    while pos + FFT_SIZE <= samples.len() {
        let mut buffer: Vec<Complex<f32>> = samples[pos..pos + FFT_SIZE]
            .iter()
            .zip(&hann)
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();
        fft.process(&mut buffer);

        for (acc, c) in power.iter_mut().zip(&buffer[..bins]) {
            *acc += c.norm_sqr() as f64;
        }
        windows += 1;
        pos += HOP_SIZE;
    }

    let scale = 1.0 / windows.max(1) as f64;
    power.iter_mut().for_each(|p| *p *= scale);
    power
}

fn rolloff_hz(spectrum: &[f64], bin_hz: f64, total: f64) -> Option<f64> {
    let target = total * ROLLOFF_FRACTION;
    let mut cumulative = 0.0;
    for (k, &power) in spectrum.iter().enumerate() {
        let freq = k as f64 * bin_hz;
        if Band::containing(freq).is_none() {
            continue;
        }
        cumulative += power;
        if cumulative >= target {
            return Some(freq);
        }
    }
    None
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_signals::*;

    #[test]
    fn test_bass_sine_lands_in_low_band() {
        let buffer = mono(44100, sine(100.0, 0.5, 44100, 44100));
        let freq = analyze(&buffer);
        assert!(!freq.insufficient_samples);
        assert_eq!(freq.dominant_band, Some(Band::Low));
        assert!(freq.bands.low.fraction > 0.95, "low {}", freq.bands.low.fraction);
        assert!(freq.bands.low.db > -0.5);
        let centroid = freq.spectral_centroid_hz.unwrap();
        assert!(centroid > 80.0 && centroid < 150.0, "centroid {}", centroid);
    }

    #[test]
    fn test_band_placement() {
        for (hz, band) in [(1000.0, Band::Mid), (350.0, Band::LowMid), (3000.0, Band::HighMid), (10000.0, Band::High)] {
            let buffer = mono(48000, sine(hz, 0.5, 48000, 24000));
            assert_eq!(analyze(&buffer).dominant_band, Some(band), "{} Hz", hz);
        }
    }

    #[test]
    fn test_fractions_sum_to_one() {
        let buffer = mono(44100, noise(42, 0.5, 44100));
        let freq = analyze(&buffer);
        let sum: f64 = freq.bands.fractions().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        let rolloff = freq.spectral_rolloff_hz.unwrap();
        assert!(rolloff > 10000.0, "white noise rolloff {}", rolloff);
    }

    #[test]
    fn test_short_buffer_is_flagged() {
        let freq = analyze(&mono(44100, sine(440.0, 0.5, 44100, FFT_SIZE - 1)));
        assert!(freq.insufficient_samples);
        assert_eq!(freq.bands.fractions(), [0.0; 5]);
        assert_eq!(freq.dominant_band, None);

        let empty = analyze(&mono(44100, vec![]));
        assert!(empty.insufficient_samples);
    }

    #[test]
    fn test_long_silence_is_zero_without_flag() {
        let freq = analyze(&mono(44100, vec![0.0; FFT_SIZE * 3]));
        assert!(!freq.insufficient_samples);
        assert_eq!(freq.bands.fractions(), [0.0; 5]);
        assert_eq!(freq.bands.low.db, f64::NEG_INFINITY);
        assert_eq!(freq.spectral_centroid_hz, None);
        assert_eq!(freq.dominant_band, None);
    }

    #[test]
    fn test_stereo_is_mono_summed() {
        let tone = sine(100.0, 0.5, 44100, 22050);
        let inverted: Vec<f32> = tone.iter().map(|s| -s).collect();
        let freq = analyze(&stereo(44100, tone, inverted));
        assert_eq!(freq.dominant_band, None);
    }
}
