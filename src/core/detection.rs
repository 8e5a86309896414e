//! Presence and distance decisions for each ingested sample.
//!
//! Detection combines the operator's sensitivity, the detection mode, the
//! noise floor and the calibrated baseline. The policy is stateless; every
//! call works from one `DetectionParameters` snapshot.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lowest accepted sensitivity.
pub const MIN_SENSITIVITY: u8 = 10;

/// Highest accepted sensitivity.
pub const MAX_SENSITIVITY: u8 = 100;

/// Threshold multipliers indexed by `DetectionMode as usize`.
const MODE_MULTIPLIERS: [f64; 3] = [1.0, 0.5, 2.0];

/// Detection mode selected by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMode {
    #[default]
    Normal = 0,
    /// Halved threshold for close, subtle targets
    Precision = 1,
    /// Doubled threshold to reject clutter at range
    #[serde(alias = "long_range")]
    LongRange = 2,
}

impl DetectionMode {
    pub const ALL: [DetectionMode; 3] = [
        DetectionMode::Normal,
        DetectionMode::Precision,
        DetectionMode::LongRange,
    ];

    /// Multiplier applied to the adaptive threshold.
    pub const fn threshold_multiplier(self) -> f64 {
        MODE_MULTIPLIERS[self as usize]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DetectionMode::Normal => "normal",
            DetectionMode::Precision => "precision",
            DetectionMode::LongRange => "long-range",
        }
    }
}

impl std::fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionMode {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "normal" => Ok(DetectionMode::Normal),
            "precision" => Ok(DetectionMode::Precision),
            "long-range" | "longrange" => Ok(DetectionMode::LongRange),
            other => Err(ParameterError::UnknownMode(other.to_string())),
        }
    }
}

/// Rejected control input.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterError {
    SensitivityOutOfRange(i64),
    UnknownMode(String),
    InvalidNoiseFloor(f64),
    InvalidThresholdBase(f64),
}

impl std::fmt::Display for ParameterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterError::SensitivityOutOfRange(v) => write!(
                f,
                "Invalid parameter: sensitivity {v} outside {MIN_SENSITIVITY}..={MAX_SENSITIVITY}"
            ),
            ParameterError::UnknownMode(m) => write!(
                f,
                "Invalid parameter: unknown mode '{m}' (expected normal, precision or long-range)"
            ),
            ParameterError::InvalidNoiseFloor(v) => {
                write!(f, "Invalid parameter: noise floor {v} must be finite and >= 0")
            }
            ParameterError::InvalidThresholdBase(v) => {
                write!(f, "Invalid parameter: threshold base {v} must be finite and >= 0")
            }
        }
    }
}

impl std::error::Error for ParameterError {}

/// Validate a sensitivity value coming from an untyped control surface.
pub fn parse_sensitivity(value: i64) -> Result<u8, ParameterError> {
    u8::try_from(value)
        .ok()
        .filter(|v| (MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(v))
        .ok_or(ParameterError::SensitivityOutOfRange(value))
}

/// Operator-adjustable detection controls.
///
/// A `Copy` value: the engine swaps the whole struct at once so a sample
/// never sees a half-applied update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionParameters {
    /// Sensitivity in `[10, 100]`
    pub sensitivity: u8,
    pub mode: DetectionMode,
    /// Scaled amplitudes below this are zeroed when the noise filter is on
    pub noise_floor: f64,
    /// Threshold at zero sensitivity, before the mode multiplier
    pub threshold_base: f64,
    pub noise_filter_enabled: bool,
}

impl Default for DetectionParameters {
    fn default() -> Self {
        Self {
            sensitivity: 50,
            mode: DetectionMode::Normal,
            noise_floor: 5.0,
            threshold_base: 10.0,
            noise_filter_enabled: false,
        }
    }
}

impl DetectionParameters {
    /// Check every field; the first violation is reported.
    pub fn validate(&self) -> Result<(), ParameterError> {
        parse_sensitivity(i64::from(self.sensitivity))?;
        if !self.noise_floor.is_finite() || self.noise_floor < 0.0 {
            return Err(ParameterError::InvalidNoiseFloor(self.noise_floor));
        }
        if !self.threshold_base.is_finite() || self.threshold_base < 0.0 {
            return Err(ParameterError::InvalidThresholdBase(self.threshold_base));
        }
        Ok(())
    }
}

/// Presence decision for the latest sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionState {
    pub person_present: bool,
    /// Relative distance on a 0-100 scale
    pub distance: f64,
}

/// Amplitude gain for a sensitivity: `1 + sensitivity/100 * 4`.
pub fn gain(sensitivity: u8) -> f64 {
    1.0 + (f64::from(sensitivity) / 100.0) * 4.0
}

/// Apply gain and the optional noise gate to a raw amplitude.
pub fn scale_amplitude(params: &DetectionParameters, raw: f64) -> f64 {
    let scaled = raw * gain(params.sensitivity);
    if params.noise_filter_enabled && scaled < params.noise_floor {
        0.0
    } else {
        scaled
    }
}

/// Threshold before the mode multiplier.
pub fn adaptive_threshold(params: &DetectionParameters) -> f64 {
    params.threshold_base * f64::from(100 - params.sensitivity.min(100)) / 100.0
}

/// Threshold after the mode multiplier.
pub fn mode_threshold(params: &DetectionParameters) -> f64 {
    adaptive_threshold(params) * params.mode.threshold_multiplier()
}

/// Classify one baseline-corrected sample.
pub fn classify(params: &DetectionParameters, stored: f64) -> DetectionState {
    DetectionState {
        person_present: stored > mode_threshold(params),
        distance: (100.0 - stored).clamp(0.0, 100.0),
    }
}
