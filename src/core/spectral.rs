//! Band-limited spectral peak search.
//!
//! The window is small and fixed, so the default estimator is a direct
//! correlation against precomputed cosine/sine tables rather than an FFT.
//! Callers go through [`SpectralEstimator`] so a faster transform can be
//! dropped in without touching ingestion or smoothing.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::RangeInclusive;

/// Cardiac band, Hz (48-180 BPM).
pub const CARDIAC_BAND_HZ: (f64, f64) = (0.8, 3.0);

/// Respiration band, Hz (6-30 RPM).
pub const RESPIRATION_BAND_HZ: (f64, f64) = (0.1, 0.5);

/// Winning bin inside one physiological band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandPeak {
    pub bin: usize,
    pub frequency_hz: f64,
    /// Events per minute (BPM or RPM)
    pub rate_per_min: f64,
    pub magnitude: f64,
}

/// Peaks found in both bands. A band is `None` when it maps to no bins at
/// the configured sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BandPeaks {
    pub cardiac: Option<BandPeak>,
    pub respiration: Option<BandPeak>,
}

/// Narrow seam between the sample window and the rate smoother.
pub trait SpectralEstimator: Send {
    /// Locate the cardiac and respiration peaks in a full analysis window.
    fn band_peaks(&self, window: &[f64]) -> BandPeaks;

    /// Window length this estimator expects.
    fn window_size(&self) -> usize;
}

/// Inclusive bin range covering `[lo_hz, hi_hz]`, clipped to `[1, W/2)`.
///
/// Returns `None` when no bin falls inside the band.
pub fn band_bins(
    band_hz: (f64, f64),
    sample_rate_hz: f64,
    window_size: usize,
) -> Option<RangeInclusive<usize>> {
    let half = window_size / 2;
    if half < 2 || !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
        return None;
    }

    let resolution = sample_rate_hz / window_size as f64;
    let first = (band_hz.0 / resolution).ceil().max(1.0);
    let last = (band_hz.1 / resolution).floor().min((half - 1) as f64);
    if first > last {
        return None;
    }
    Some(first as usize..=last as usize)
}

/// O(W²) discrete correlation restricted to the two physiological bands.
#[derive(Debug, Clone)]
pub struct DirectCorrelation {
    window_size: usize,
    sample_rate_hz: f64,
    cos_table: Vec<f64>,
    sin_table: Vec<f64>,
    cardiac_bins: Option<RangeInclusive<usize>>,
    respiration_bins: Option<RangeInclusive<usize>>,
}

impl DirectCorrelation {
    /// Build an estimator for a `window_size` window sampled at `sample_rate_hz`.
    pub fn new(window_size: usize, sample_rate_hz: f64) -> Self {
        let w = window_size.max(1);
        // cos/sin(-2π m / W) for m in [0, W); k*t is reduced mod W on lookup
        let (cos_table, sin_table): (Vec<f64>, Vec<f64>) = (0..w)
            .map(|m| {
                let angle = -2.0 * PI * m as f64 / w as f64;
                (angle.cos(), angle.sin())
            })
            .unzip();

        let cardiac_bins = band_bins(CARDIAC_BAND_HZ, sample_rate_hz, w);
        let respiration_bins = band_bins(RESPIRATION_BAND_HZ, sample_rate_hz, w);
        tracing::debug!(
            window_size = w,
            sample_rate_hz,
            ?cardiac_bins,
            ?respiration_bins,
            "spectral estimator configured"
        );

        Self {
            window_size: w,
            sample_rate_hz,
            cos_table,
            sin_table,
            cardiac_bins,
            respiration_bins,
        }
    }

    pub fn cardiac_bins(&self) -> Option<RangeInclusive<usize>> {
        self.cardiac_bins.clone()
    }

    pub fn respiration_bins(&self) -> Option<RangeInclusive<usize>> {
        self.respiration_bins.clone()
    }

    /// Frequency of a bin in Hz.
    pub fn bin_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate_hz / self.window_size as f64
    }

    /// Magnitude of a single bin.
    pub fn bin_magnitude(&self, window: &[f64], k: usize) -> f64 {
        let w = self.window_size;
        let (mut real, mut imag) = (0.0, 0.0);
        for (t, &x) in window.iter().take(w).enumerate() {
            let m = (k * t) % w;
            real += x * self.cos_table[m];
            imag += x * self.sin_table[m];
        }
        (real * real + imag * imag).sqrt()
    }

    /// Magnitudes for every bin in `[0, W/2)`.
    pub fn magnitude_spectrum(&self, window: &[f64]) -> Vec<f64> {
        (0..self.window_size / 2)
            .map(|k| self.bin_magnitude(window, k))
            .collect()
    }

    /// Highest-magnitude bin in the range; ties go to the lowest index.
    fn peak_in(&self, window: &[f64], bins: &Option<RangeInclusive<usize>>) -> Option<BandPeak> {
        let bins = bins.clone()?;
        let mut best: Option<(usize, f64)> = None;
        for k in bins {
            let magnitude = self.bin_magnitude(window, k);
            match best {
                Some((_, m)) if magnitude <= m => {}
                _ => best = Some((k, magnitude)),
            }
        }

        best.map(|(bin, magnitude)| {
            let frequency_hz = self.bin_frequency(bin);
            BandPeak {
                bin,
                frequency_hz,
                rate_per_min: frequency_hz * 60.0,
                magnitude,
            }
        })
    }
}

impl SpectralEstimator for DirectCorrelation {
    fn band_peaks(&self, window: &[f64]) -> BandPeaks {
        BandPeaks {
            cardiac: self.peak_in(window, &self.cardiac_bins),
            respiration: self.peak_in(window, &self.respiration_bins),
        }
    }

    fn window_size(&self) -> usize {
        self.window_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_hz: f64, amplitude: f64, sample_rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq_hz * i as f64 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_band_bins_at_reference_rate() {
        assert_eq!(band_bins(CARDIAC_BAND_HZ, 10.0, 256), Some(21..=76));
        assert_eq!(band_bins(RESPIRATION_BAND_HZ, 10.0, 256), Some(3..=12));
    }

    #[test]
    fn test_band_bins_clipped_to_nyquist() {
        // At 2 Hz the cardiac band runs past Nyquist
        let bins = band_bins(CARDIAC_BAND_HZ, 2.0, 256).unwrap();
        assert_eq!(*bins.start(), 103);
        assert_eq!(*bins.end(), 127);

        // At 0.5 Hz there is nothing left of it
        assert_eq!(band_bins(CARDIAC_BAND_HZ, 0.5, 256), None);
        assert_eq!(band_bins(CARDIAC_BAND_HZ, 0.0, 256), None);
    }

    #[test]
    fn test_cardiac_peak_for_pure_tone() {
        let estimator = DirectCorrelation::new(256, 10.0);
        let window = sine(1.2, 10.0, 10.0, 256);
        let peaks = estimator.band_peaks(&window);

        let cardiac = peaks.cardiac.unwrap();
        let resolution_bpm = 10.0 / 256.0 * 60.0;
        assert!(
            (cardiac.rate_per_min - 72.0).abs() <= resolution_bpm,
            "got {} BPM",
            cardiac.rate_per_min
        );
        assert_eq!(cardiac.bin, 31);
    }

    #[test]
    fn test_respiration_peak_for_pure_tone() {
        let estimator = DirectCorrelation::new(256, 10.0);
        let window = sine(0.25, 20.0, 10.0, 256);
        let respiration = estimator.band_peaks(&window).respiration.unwrap();
        assert!((respiration.rate_per_min - 15.0).abs() <= 10.0 / 256.0 * 60.0);
    }

    #[test]
    fn test_tie_resolves_to_lowest_bin() {
        let estimator = DirectCorrelation::new(256, 10.0);
        let flat = vec![0.0; 256];
        let peaks = estimator.band_peaks(&flat);
        assert_eq!(peaks.cardiac.unwrap().bin, 21);
        assert_eq!(peaks.respiration.unwrap().bin, 3);
    }

    #[test]
    fn test_dc_bin_matches_sum() {
        let estimator = DirectCorrelation::new(16, 10.0);
        let window = vec![2.0; 16];
        let spectrum = estimator.magnitude_spectrum(&window);
        assert_eq!(spectrum.len(), 8);
        assert!((spectrum[0] - 32.0).abs() < 1e-9);
        assert!(spectrum[1..].iter().all(|&m| m < 1e-9));
    }
}
