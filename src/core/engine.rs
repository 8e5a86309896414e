//! The vital-sign engine.
//!
//! `VitalsEngine` owns every piece of pipeline state: the sample ring,
//! calibration, the active detection parameters, the rate smoother and the
//! last published outputs. Its methods are the only way to change any of it.
//!
//! Sample path (every event):
//! 1. gain + optional noise gate
//! 2. baseline update while Warming
//! 3. store `scaled - baseline` in the ring
//! 4. presence and distance from the mode-adjusted threshold
//!
//! Every `decimation` samples the latest window is handed to the spectral
//! estimator and its band peaks are smoothed into a new vital-sign estimate.

use crate::core::calibration::{CalibrationStatus, CalibrationTracker, DEFAULT_WARMUP_SAMPLES};
use crate::core::detection::{
    self, parse_sensitivity, DetectionMode, DetectionParameters, DetectionState, ParameterError,
};
use crate::core::ring::{SampleRing, DEFAULT_RING_CAPACITY, DEFAULT_WINDOW_SIZE};
use crate::core::smoothing::{RateSmoother, VitalSignEstimate};
use crate::core::spectral::{BandPeaks, DirectCorrelation, SpectralEstimator};
use serde::{Deserialize, Serialize};

/// Structural engine settings. Fixed for the engine's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Event cadence of the measurement subsystem, in Hz
    pub sample_rate_hz: f64,
    /// Ring capacity (N)
    pub ring_capacity: usize,
    /// Spectral window (W)
    pub window_size: usize,
    /// Run the spectral pass every this many samples (M)
    pub decimation: usize,
    /// Warm-up length for baseline calibration
    pub warmup_samples: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 10.0,
            ring_capacity: DEFAULT_RING_CAPACITY,
            window_size: DEFAULT_WINDOW_SIZE,
            decimation: 10,
            warmup_samples: DEFAULT_WARMUP_SAMPLES,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if !self.sample_rate_hz.is_finite() || self.sample_rate_hz <= 0.0 {
            return Err(EngineConfigError::InvalidSampleRate(self.sample_rate_hz));
        }
        if self.window_size < 4 {
            return Err(EngineConfigError::WindowTooSmall(self.window_size));
        }
        if self.window_size > self.ring_capacity {
            return Err(EngineConfigError::WindowExceedsRing {
                window: self.window_size,
                capacity: self.ring_capacity,
            });
        }
        if self.decimation == 0 {
            return Err(EngineConfigError::ZeroDecimation);
        }
        Ok(())
    }
}

/// Invalid engine structure.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineConfigError {
    InvalidSampleRate(f64),
    WindowTooSmall(usize),
    WindowExceedsRing { window: usize, capacity: usize },
    ZeroDecimation,
}

impl std::fmt::Display for EngineConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineConfigError::InvalidSampleRate(r) => {
                write!(f, "Sample rate must be finite and positive, got {r}")
            }
            EngineConfigError::WindowTooSmall(w) => {
                write!(f, "Spectral window of {w} samples is too small")
            }
            EngineConfigError::WindowExceedsRing { window, capacity } => write!(
                f,
                "Spectral window ({window}) exceeds ring capacity ({capacity})"
            ),
            EngineConfigError::ZeroDecimation => write!(f, "Decimation must be at least 1"),
        }
    }
}

impl std::error::Error for EngineConfigError {}

/// Engine construction failure.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Config(EngineConfigError),
    Parameters(ParameterError),
    EstimatorWindowMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Config(e) => write!(f, "Engine config error: {e}"),
            EngineError::Parameters(e) => write!(f, "{e}"),
            EngineError::EstimatorWindowMismatch { expected, actual } => write!(
                f,
                "Estimator expects a {actual}-sample window, engine provides {expected}"
            ),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<EngineConfigError> for EngineError {
    fn from(e: EngineConfigError) -> Self {
        EngineError::Config(e)
    }
}

impl From<ParameterError> for EngineError {
    fn from(e: ParameterError) -> Self {
        EngineError::Parameters(e)
    }
}

/// Result of a spectral pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EstimateOutcome {
    /// Peaks were found and smoothed into a new estimate
    Updated {
        vitals: VitalSignEstimate,
        peaks: BandPeaks,
    },
    /// Not enough real samples yet; the previous estimate stands
    LowConfidence { collected: usize, required: usize },
}

/// Owned pipeline state and its operations.
pub struct VitalsEngine {
    config: EngineConfig,
    ring: SampleRing,
    calibration: CalibrationTracker,
    params: DetectionParameters,
    estimator: Box<dyn SpectralEstimator>,
    smoother: RateSmoother,
    detection: DetectionState,
    vitals: VitalSignEstimate,
    last_stored: Option<f64>,
    samples_since_estimate: usize,
}

impl std::fmt::Debug for VitalsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VitalsEngine")
            .field("config", &self.config)
            .field("params", &self.params)
            .field("calibration", &self.calibration.status())
            .field("detection", &self.detection)
            .field("vitals", &self.vitals)
            .finish_non_exhaustive()
    }
}

impl VitalsEngine {
    /// Create an engine using the direct-correlation estimator.
    pub fn new(config: EngineConfig, params: DetectionParameters) -> Result<Self, EngineError> {
        config.validate()?;
        let estimator = DirectCorrelation::new(config.window_size, config.sample_rate_hz);
        Self::with_estimator(config, params, Box::new(estimator))
    }

    /// Create an engine with a caller-supplied spectral estimator.
    pub fn with_estimator(
        config: EngineConfig,
        params: DetectionParameters,
        estimator: Box<dyn SpectralEstimator>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        params.validate()?;
        if estimator.window_size() != config.window_size {
            return Err(EngineError::EstimatorWindowMismatch {
                expected: config.window_size,
                actual: estimator.window_size(),
            });
        }

        Ok(Self {
            ring: SampleRing::new(config.ring_capacity),
            calibration: CalibrationTracker::new(config.warmup_samples),
            params,
            estimator,
            smoother: RateSmoother::new(),
            detection: DetectionState::default(),
            vitals: VitalSignEstimate::default(),
            last_stored: None,
            samples_since_estimate: 0,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Sample path
    // ------------------------------------------------------------------

    /// Ingest one amplitude reading. The phase reading is accepted but unused.
    ///
    /// Never fails: a non-finite amplitude is dropped and the last detection
    /// state is returned unchanged.
    pub fn ingest(&mut self, amplitude: f64, _phase: f64) -> DetectionState {
        if !amplitude.is_finite() {
            tracing::warn!(amplitude, "dropping non-finite amplitude sample");
            return self.detection;
        }

        let params = self.params;
        let scaled = detection::scale_amplitude(&params, amplitude);
        let baseline = self.calibration.update(scaled);
        let stored = scaled - baseline;

        self.ring.push(stored);
        self.last_stored = Some(stored);
        self.samples_since_estimate += 1;

        self.detection = detection::classify(&params, stored);
        self.detection
    }

    /// Whether enough samples have arrived since the last spectral pass.
    pub fn estimate_due(&self) -> bool {
        self.samples_since_estimate >= self.config.decimation
    }

    /// Ingest a sample and run the spectral pass when it falls due.
    pub fn process(
        &mut self,
        amplitude: f64,
        phase: f64,
    ) -> (DetectionState, Option<EstimateOutcome>) {
        let detection = self.ingest(amplitude, phase);
        let outcome = self.estimate_due().then(|| self.run_estimate());
        (detection, outcome)
    }

    // ------------------------------------------------------------------
    // Spectral path
    // ------------------------------------------------------------------

    /// Copy of the latest analysis window, or `None` until it is full.
    ///
    /// Lets a caller run the estimator away from the ingestion path and hand
    /// the result back through [`VitalsEngine::apply_peaks`].
    pub fn window_snapshot(&self) -> Option<Vec<f64>> {
        self.ring.latest_window(self.config.window_size)
    }

    /// Run the estimator on the latest window and smooth the result.
    pub fn run_estimate(&mut self) -> EstimateOutcome {
        self.samples_since_estimate = 0;

        match self.window_snapshot() {
            Some(window) => {
                let peaks = self.estimator.band_peaks(&window);
                self.apply_peaks(peaks)
            }
            None => {
                let outcome = EstimateOutcome::LowConfidence {
                    collected: self.ring.filled(),
                    required: self.config.window_size,
                };
                tracing::debug!(?outcome, "spectral window not yet full");
                outcome
            }
        }
    }

    /// Fold externally computed band peaks into the smoother.
    pub fn apply_peaks(&mut self, peaks: BandPeaks) -> EstimateOutcome {
        self.vitals = self.smoother.update(&peaks);
        tracing::debug!(
            raw_hr = peaks.cardiac.map(|p| p.rate_per_min),
            raw_br = peaks.respiration.map(|p| p.rate_per_min),
            heart_rate = self.vitals.heart_rate,
            breathing_rate = self.vitals.breathing_rate,
            quality = self.vitals.signal_quality,
            "vital signs updated"
        );
        EstimateOutcome::Updated {
            vitals: self.vitals,
            peaks,
        }
    }

    // ------------------------------------------------------------------
    // Outputs
    // ------------------------------------------------------------------

    pub fn vital_signs(&self) -> VitalSignEstimate {
        self.vitals
    }

    pub fn detection_state(&self) -> DetectionState {
        self.detection
    }

    pub fn calibration(&self) -> CalibrationStatus {
        self.calibration.status()
    }

    pub fn parameters(&self) -> DetectionParameters {
        self.params
    }

    /// Most recent baseline-corrected value written to the ring.
    pub fn last_stored(&self) -> Option<f64> {
        self.last_stored
    }

    pub fn ring(&self) -> &SampleRing {
        &self.ring
    }

    // ------------------------------------------------------------------
    // Controls
    // ------------------------------------------------------------------

    /// Swap in a complete parameter set after validating it.
    pub fn set_parameters(&mut self, params: DetectionParameters) -> Result<(), ParameterError> {
        params.validate()?;
        if params != self.params {
            tracing::info!(?params, "detection parameters updated");
        }
        self.params = params;
        Ok(())
    }

    pub fn set_sensitivity(&mut self, sensitivity: i64) -> Result<(), ParameterError> {
        let sensitivity = parse_sensitivity(sensitivity)?;
        self.set_parameters(DetectionParameters {
            sensitivity,
            ..self.params
        })
    }

    pub fn set_mode(&mut self, mode: DetectionMode) {
        self.params.mode = mode;
        tracing::info!(%mode, "detection mode changed");
    }

    pub fn set_noise_filter_enabled(&mut self, enabled: bool) {
        self.params.noise_filter_enabled = enabled;
        tracing::info!(enabled, "noise filter toggled");
    }

    /// Restart baseline calibration. Ring contents are kept.
    pub fn reset_baseline(&mut self) {
        self.calibration.reset();
    }

    /// Restart calibration and discard buffered samples.
    ///
    /// The spectral pass reports low confidence until the window refills.
    pub fn trigger_calibration(&mut self) {
        self.calibration.reset();
        self.ring.clear();
        self.last_stored = None;
        self.samples_since_estimate = 0;
    }

    /// Freeze the current baseline.
    pub fn disable_auto_calibration(&mut self) {
        self.calibration.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calibration::CalibrationPhase;

    fn engine() -> VitalsEngine {
        VitalsEngine::new(EngineConfig::default(), DetectionParameters::default()).unwrap()
    }

    #[test]
    fn test_engine_config_validation() {
        assert!(EngineConfig::default().validate().is_ok());

        let bad_rate = EngineConfig {
            sample_rate_hz: 0.0,
            ..Default::default()
        };
        assert!(bad_rate.validate().is_err());

        let oversized = EngineConfig {
            window_size: 1024,
            ..Default::default()
        };
        assert_eq!(
            oversized.validate(),
            Err(EngineConfigError::WindowExceedsRing {
                window: 1024,
                capacity: 512
            })
        );

        let no_decimation = EngineConfig {
            decimation: 0,
            ..Default::default()
        };
        assert_eq!(
            no_decimation.validate(),
            Err(EngineConfigError::ZeroDecimation)
        );
    }

    #[test]
    fn test_estimator_window_must_match() {
        let result = VitalsEngine::with_estimator(
            EngineConfig::default(),
            DetectionParameters::default(),
            Box::new(DirectCorrelation::new(128, 10.0)),
        );
        assert!(matches!(
            result,
            Err(EngineError::EstimatorWindowMismatch {
                expected: 256,
                actual: 128
            })
        ));
    }

    #[test]
    fn test_first_sample_stored_value() {
        let mut engine = engine();
        // gain 3.0 -> scaled 30, baseline 1.5, stored 28.5
        engine.ingest(10.0, 0.0);
        assert!((engine.last_stored().unwrap() - 28.5).abs() < 1e-9);
        assert!(engine.detection_state().person_present);
        assert!((engine.detection_state().distance - 71.5).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_sample_returns_last_state() {
        let mut engine = engine();
        let before = engine.ingest(10.0, 0.0);
        let after = engine.ingest(f64::NAN, 0.0);
        assert_eq!(before, after);
        assert_eq!(engine.ring().total_written(), 1);
    }

    #[test]
    fn test_low_confidence_before_window_fills() {
        let mut engine = engine();
        for _ in 0..255 {
            engine.ingest(1.0, 0.0);
        }
        assert_eq!(
            engine.run_estimate(),
            EstimateOutcome::LowConfidence {
                collected: 255,
                required: 256
            }
        );
        assert_eq!(engine.vital_signs(), VitalSignEstimate::default());

        engine.ingest(1.0, 0.0);
        assert!(matches!(
            engine.run_estimate(),
            EstimateOutcome::Updated { .. }
        ));
    }

    #[test]
    fn test_decimation_cadence() {
        let mut engine = engine();
        let mut passes = 0;
        for _ in 0..100 {
            if engine.process(1.0, 0.0).1.is_some() {
                passes += 1;
            }
        }
        assert_eq!(passes, 10);
    }

    #[test]
    fn test_invalid_sensitivity_leaves_state_untouched() {
        let mut engine = engine();
        let before = engine.parameters();
        assert_eq!(
            engine.set_sensitivity(101),
            Err(ParameterError::SensitivityOutOfRange(101))
        );
        assert_eq!(
            engine.set_sensitivity(0),
            Err(ParameterError::SensitivityOutOfRange(0))
        );
        assert_eq!(engine.parameters(), before);

        engine.set_sensitivity(80).unwrap();
        assert_eq!(engine.parameters().sensitivity, 80);
    }

    #[test]
    fn test_mode_change_applies_to_next_sample() {
        let mut engine = engine();
        engine.disable_auto_calibration();
        // baseline 0, gain 3 -> stored 6; Normal threshold 5, LongRange 10
        assert!(engine.ingest(2.0, 0.0).person_present);
        engine.set_mode(DetectionMode::LongRange);
        assert!(!engine.ingest(2.0, 0.0).person_present);
        engine.set_mode(DetectionMode::Precision);
        assert!(engine.ingest(2.0, 0.0).person_present);
    }

    #[test]
    fn test_trigger_calibration_clears_ring() {
        let mut engine = engine();
        for _ in 0..300 {
            engine.ingest(5.0, 0.0);
        }
        assert_eq!(engine.calibration().phase, CalibrationPhase::Locked);

        engine.trigger_calibration();
        let status = engine.calibration();
        assert_eq!(status.phase, CalibrationPhase::Warming);
        assert_eq!(status.baseline, 0.0);
        assert_eq!(status.warmup_count, 0);
        assert_eq!(engine.ring().filled(), 0);
        assert!(matches!(
            engine.run_estimate(),
            EstimateOutcome::LowConfidence { collected: 0, .. }
        ));
    }

    #[test]
    fn test_reset_baseline_keeps_ring() {
        let mut engine = engine();
        for _ in 0..300 {
            engine.ingest(5.0, 0.0);
        }
        engine.reset_baseline();
        assert_eq!(engine.calibration().phase, CalibrationPhase::Warming);
        assert_eq!(engine.ring().filled(), 300);
    }
}
