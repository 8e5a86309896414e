//! Adaptive baseline calibration.
//!
//! During a bounded warm-up the baseline follows the incoming amplitude with
//! an exponential decay. Once the warm-up count is reached (or auto
//! calibration is switched off) the baseline is frozen until an explicit reset.

use serde::{Deserialize, Serialize};

/// Number of samples in the warm-up window.
pub const DEFAULT_WARMUP_SAMPLES: u32 = 100;

/// Weight kept from the previous baseline on each warm-up update.
const BASELINE_DECAY: f64 = 0.95;

/// Calibration state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationPhase {
    /// Baseline is being re-estimated from incoming samples
    Warming,
    /// Baseline is frozen
    Locked,
}

/// Read-only view of the calibration state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStatus {
    pub phase: CalibrationPhase,
    pub baseline: f64,
    pub warmup_count: u32,
    pub auto_calibrate: bool,
}

/// Tracks the resting-state amplitude subtracted from every sample.
#[derive(Debug, Clone)]
pub struct CalibrationTracker {
    baseline: f64,
    warmup_count: u32,
    auto_calibrate: bool,
    warmup_samples: u32,
}

impl CalibrationTracker {
    /// Create a tracker in the Warming phase.
    pub fn new(warmup_samples: u32) -> Self {
        Self {
            baseline: 0.0,
            warmup_count: 0,
            auto_calibrate: true,
            warmup_samples,
        }
    }

    /// Current phase, derived from the counter and the auto-calibrate flag.
    pub fn phase(&self) -> CalibrationPhase {
        if self.auto_calibrate && self.warmup_count < self.warmup_samples {
            CalibrationPhase::Warming
        } else {
            CalibrationPhase::Locked
        }
    }

    /// Current baseline estimate.
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Number of warm-up updates applied since the last reset.
    pub fn warmup_count(&self) -> u32 {
        self.warmup_count
    }

    pub fn status(&self) -> CalibrationStatus {
        CalibrationStatus {
            phase: self.phase(),
            baseline: self.baseline,
            warmup_count: self.warmup_count,
            auto_calibrate: self.auto_calibrate,
        }
    }

    /// Feed one scaled amplitude and return the baseline to subtract from it.
    ///
    /// The baseline only moves while Warming.
    pub fn update(&mut self, amplitude: f64) -> f64 {
        if self.phase() == CalibrationPhase::Warming {
            self.baseline = self.baseline * BASELINE_DECAY + amplitude * (1.0 - BASELINE_DECAY);
            self.warmup_count += 1;

            if self.warmup_count >= self.warmup_samples {
                self.auto_calibrate = false;
                tracing::info!(
                    baseline = self.baseline,
                    samples = self.warmup_count,
                    "calibration locked"
                );
            }
        }
        self.baseline
    }

    /// Re-enter Warming with a zero baseline. Idempotent.
    pub fn reset(&mut self) {
        self.baseline = 0.0;
        self.warmup_count = 0;
        self.auto_calibrate = true;
        tracing::info!("calibration reset, warming up");
    }

    /// Freeze the current baseline without resetting it.
    pub fn disable(&mut self) {
        if self.auto_calibrate {
            tracing::info!(baseline = self.baseline, "auto calibration disabled");
        }
        self.auto_calibrate = false;
    }
}

impl Default for CalibrationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_WARMUP_SAMPLES)
    }
}
