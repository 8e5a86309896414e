//! Rate smoothing and signal-quality scoring.
//!
//! Two independent exponential filters: the cardiac channel adapts quickly,
//! the respiration channel slowly. Outputs are clamped to physiological
//! ranges; the internal filter state is not.

use crate::core::spectral::BandPeaks;
use serde::{Deserialize, Serialize};

/// Weight given to a new cardiac reading.
const CARDIAC_ALPHA: f64 = 0.2;

/// Weight given to a new respiration reading.
const RESPIRATION_ALPHA: f64 = 0.1;

pub const HEART_RATE_RANGE: (f64, f64) = (40.0, 180.0);
pub const BREATHING_RATE_RANGE: (f64, f64) = (8.0, 30.0);

/// Cardiac-peak magnitude that maps to 100% signal quality.
const FULL_QUALITY_MAGNITUDE: f64 = 1000.0;

const INITIAL_HEART_RATE: f64 = 70.0;
const INITIAL_BREATHING_RATE: f64 = 15.0;

/// Externally visible vital-sign estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalSignEstimate {
    /// Beats per minute, within `[40, 180]`
    pub heart_rate: f64,
    /// Respirations per minute, within `[8, 30]`
    pub breathing_rate: f64,
    /// `[0, 100]`
    pub signal_quality: f64,
}

impl Default for VitalSignEstimate {
    fn default() -> Self {
        Self {
            heart_rate: INITIAL_HEART_RATE,
            breathing_rate: INITIAL_BREATHING_RATE,
            signal_quality: 0.0,
        }
    }
}

/// Single-pole exponential filter.
#[derive(Debug, Clone, Copy)]
struct ExpFilter {
    value: f64,
    alpha: f64,
}

impl ExpFilter {
    /// Move toward `raw` by `alpha` of the gap. Non-finite input is ignored.
    fn update(&mut self, raw: f64) -> f64 {
        if raw.is_finite() {
            self.value = self.value * (1.0 - self.alpha) + raw * self.alpha;
        }
        self.value
    }
}

/// Produces [`VitalSignEstimate`] from raw band peaks.
#[derive(Debug, Clone)]
pub struct RateSmoother {
    cardiac: ExpFilter,
    respiration: ExpFilter,
    signal_quality: f64,
}

impl RateSmoother {
    pub fn new() -> Self {
        Self {
            cardiac: ExpFilter {
                value: INITIAL_HEART_RATE,
                alpha: CARDIAC_ALPHA,
            },
            respiration: ExpFilter {
                value: INITIAL_BREATHING_RATE,
                alpha: RESPIRATION_ALPHA,
            },
            signal_quality: 0.0,
        }
    }

    /// Unclamped cardiac filter state.
    pub fn filtered_heart_rate(&self) -> f64 {
        self.cardiac.value
    }

    /// Unclamped respiration filter state.
    pub fn filtered_breathing_rate(&self) -> f64 {
        self.respiration.value
    }

    /// Feed one raw cardiac rate (BPM).
    pub fn update_heart_rate(&mut self, raw_bpm: f64) -> f64 {
        self.cardiac.update(raw_bpm)
    }

    /// Feed one raw respiration rate (RPM).
    pub fn update_breathing_rate(&mut self, raw_rpm: f64) -> f64 {
        self.respiration.update(raw_rpm)
    }

    /// Fold a spectral result into the filters and return the new estimate.
    ///
    /// A missing band leaves its channel untouched.
    pub fn update(&mut self, peaks: &BandPeaks) -> VitalSignEstimate {
        if let Some(cardiac) = peaks.cardiac {
            self.update_heart_rate(cardiac.rate_per_min);
            self.signal_quality = signal_quality(cardiac.magnitude);
        }
        if let Some(respiration) = peaks.respiration {
            self.update_breathing_rate(respiration.rate_per_min);
        }
        self.estimate()
    }

    /// Current clamped estimate.
    pub fn estimate(&self) -> VitalSignEstimate {
        VitalSignEstimate {
            heart_rate: self
                .cardiac
                .value
                .clamp(HEART_RATE_RANGE.0, HEART_RATE_RANGE.1),
            breathing_rate: self
                .respiration
                .value
                .clamp(BREATHING_RATE_RANGE.0, BREATHING_RATE_RANGE.1),
            signal_quality: self.signal_quality,
        }
    }
}

impl Default for RateSmoother {
    fn default() -> Self {
        Self::new()
    }
}

/// `min(100, magnitude / 1000 * 100)`, floored at zero.
pub fn signal_quality(cardiac_magnitude: f64) -> f64 {
    if !cardiac_magnitude.is_finite() {
        return 0.0;
    }
    (cardiac_magnitude / FULL_QUALITY_MAGNITUDE * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spectral::BandPeak;

    fn peak(rate_per_min: f64, magnitude: f64) -> BandPeak {
        BandPeak {
            bin: 0,
            frequency_hz: rate_per_min / 60.0,
            rate_per_min,
            magnitude,
        }
    }

    #[test]
    fn test_smoothing_is_contraction() {
        let mut smoother = RateSmoother::new();
        let raws = [72.0, 300.0, -50.0, 41.0, 41.0, 179.0, 0.0, 1e6];
        for raw in raws {
            let old = smoother.filtered_heart_rate();
            let new = smoother.update_heart_rate(raw);
            assert!((new - old).abs() <= (raw - old).abs());
            // Never overshoots the target
            assert!((raw - new).abs() <= (raw - old).abs());

            let old = smoother.filtered_breathing_rate();
            let new = smoother.update_breathing_rate(raw / 4.0);
            assert!((new - old).abs() <= (raw / 4.0 - old).abs());
        }
    }

    #[test]
    fn test_outputs_clamped() {
        let mut smoother = RateSmoother::new();
        for _ in 0..100 {
            let estimate = smoother.update(&BandPeaks {
                cardiac: Some(peak(500.0, 10.0)),
                respiration: Some(peak(-20.0, 10.0)),
            });
            assert!((40.0..=180.0).contains(&estimate.heart_rate));
            assert!((8.0..=30.0).contains(&estimate.breathing_rate));
        }
        let estimate = smoother.estimate();
        assert_eq!(estimate.heart_rate, 180.0);
        assert_eq!(estimate.breathing_rate, 8.0);
    }

    #[test]
    fn test_time_constants() {
        let mut smoother = RateSmoother::new();
        smoother.update(&BandPeaks {
            cardiac: Some(peak(80.0, 0.0)),
            respiration: Some(peak(25.0, 0.0)),
        });
        // 70*0.8 + 80*0.2, 15*0.9 + 25*0.1
        assert!((smoother.filtered_heart_rate() - 72.0).abs() < 1e-9);
        assert!((smoother.filtered_breathing_rate() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_signal_quality_scale() {
        assert_eq!(signal_quality(0.0), 0.0);
        assert!((signal_quality(250.0) - 25.0).abs() < 1e-9);
        assert_eq!(signal_quality(5000.0), 100.0);
        assert_eq!(signal_quality(f64::NAN), 0.0);
    }

    #[test]
    fn test_missing_band_keeps_channel() {
        let mut smoother = RateSmoother::new();
        let estimate = smoother.update(&BandPeaks {
            cardiac: None,
            respiration: Some(peak(20.0, 0.0)),
        });
        assert_eq!(estimate.heart_rate, 70.0);
        assert_eq!(estimate.signal_quality, 0.0);
    }

    #[test]
    fn test_non_finite_raw_ignored() {
        let mut smoother = RateSmoother::new();
        smoother.update_heart_rate(f64::NAN);
        assert_eq!(smoother.filtered_heart_rate(), 70.0);
    }
}
