//! Core signal pipeline.
//!
//! This module contains:
//! - The sample ring and baseline calibration
//! - Per-sample presence/distance detection
//! - Band-limited spectral peak search and rate smoothing
//! - The engine tying them together, and exportable reports

pub mod calibration;
pub mod detection;
pub mod engine;
pub mod report;
pub mod ring;
pub mod smoothing;
pub mod spectral;

// Re-export commonly used types
pub use calibration::{CalibrationPhase, CalibrationStatus, CalibrationTracker};
pub use detection::{DetectionMode, DetectionParameters, DetectionState, ParameterError};
pub use engine::{EngineConfig, EngineConfigError, EngineError, EstimateOutcome, VitalsEngine};
pub use report::{ReportBuilder, VitalsReport, PRODUCER_NAME, REPORT_VERSION};
pub use ring::SampleRing;
pub use smoothing::{RateSmoother, VitalSignEstimate};
pub use spectral::{BandPeak, BandPeaks, DirectCorrelation, SpectralEstimator};
