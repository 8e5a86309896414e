//! WiFi Vitals Agent - presence and vital-sign estimation from radio amplitude.
//!
//! This library turns a stream of radio amplitude samples into a cardiac
//! rate, a respiration rate, a presence flag, a relative distance and a
//! signal-quality score, under operator-adjustable sensitivity, detection
//! mode and calibration controls.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WiFi Vitals Agent                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Source    │──▶│ Calibration │──▶│  Detection  │       │
//! │  │ (amplitude) │   │ (baseline)  │   │ (presence)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                                             │               │
//! │                                             ▼               │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Smoother   │◀──│  Spectral   │◀──│ Sample Ring │       │
//! │  │ (HR / BR)   │   │ (every 10)  │   │  (512 / 256)│       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use wifi_vitals_agent::core::{DetectionParameters, EngineConfig, VitalsEngine};
//! use wifi_vitals_agent::source::SyntheticConfig;
//!
//! let mut engine =
//!     VitalsEngine::new(EngineConfig::default(), DetectionParameters::default()).unwrap();
//!
//! for amplitude in SyntheticConfig::default().amplitudes(600) {
//!     engine.process(amplitude, 0.0);
//! }
//!
//! let vitals = engine.vital_signs();
//! assert!((40.0..=180.0).contains(&vitals.heart_rate));
//! ```

pub mod config;
pub mod control;
pub mod core;
pub mod pipeline;
pub mod source;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use control::{ControlCommand, ControlError, ControlHandle};
pub use core::{
    DetectionMode, DetectionParameters, DetectionState, EngineConfig, EstimateOutcome,
    ParameterError, ReportBuilder, VitalSignEstimate, VitalsEngine, VitalsReport,
};
pub use pipeline::{Pipeline, PipelineOutputs};
pub use source::{RadioSample, SyntheticConfig, SyntheticSource};
pub use stats::{PipelineStats, SharedPipelineStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Accuracy notice that can be displayed to users.
pub const ACCURACY_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║              WIFI VITALS AGENT - ACCURACY NOTICE                 ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  Rates are inferred from radio signal strength only.             ║
║                                                                  ║
║  ✓ WHAT IT ESTIMATES:                                            ║
║    • Whether someone is present in the radio path                ║
║    • A relative (unitless) distance figure                       ║
║    • Approximate heart and breathing rates for one subject       ║
║                                                                  ║
║  ✗ WHAT IT IS NOT:                                               ║
║    • A medical device or clinical measurement                    ║
║    • Able to separate multiple people                            ║
║    • A calibrated distance sensor                                ║
║                                                                  ║
║  Estimates are low confidence until the first 256 samples        ║
║  (about 26 seconds at 10 Hz) have been collected.                ║
║                                                                  ║
║  Recalibrate after moving the radios with:                       ║
║    wifi-vitals calibrate                                         ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_notice_contents() {
        assert!(ACCURACY_NOTICE.contains("ACCURACY"));
        assert!(ACCURACY_NOTICE.contains("NOT"));
        assert!(ACCURACY_NOTICE.contains("medical device"));
    }
}
