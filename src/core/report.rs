//! Serialisable vital-sign reports.
//!
//! A report captures one published pipeline state (vitals, detection,
//! calibration and the parameters in force) together with producer
//! metadata, for session export.

use crate::core::calibration::CalibrationStatus;
use crate::core::detection::{DetectionParameters, DetectionState};
use crate::core::engine::VitalsEngine;
use crate::core::smoothing::VitalSignEstimate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Report schema version.
pub const REPORT_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "wifi-vitals-agent";

/// Producer metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    /// Unique instance identifier (UUID)
    pub instance_id: String,
    /// Host the agent ran on, when it could be determined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// One exported pipeline state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalsReport {
    pub report_version: String,
    /// When the reported state was produced (RFC3339)
    pub observed_at_utc: String,
    pub producer: ReportProducer,
    /// Sequence number within the session
    pub sequence: u64,
    pub vitals: VitalSignEstimate,
    pub detection: DetectionState,
    pub calibration: CalibrationStatus,
    pub parameters: DetectionParameters,
    /// Spectral window was full when this state was produced
    pub window_full: bool,
    /// Reminder that figures are not clinical measurements
    pub notes: String,
}

/// Builds reports for one agent instance.
#[derive(Debug)]
pub struct ReportBuilder {
    instance_id: Uuid,
    device: Option<String>,
    sequence: u64,
}

impl ReportBuilder {
    /// Create a builder with a fresh instance ID.
    pub fn new() -> Self {
        let device = hostname::get().ok().and_then(|h| h.into_string().ok());

        Self {
            instance_id: Uuid::new_v4(),
            device,
            sequence: 0,
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Snapshot the engine's current outputs.
    pub fn build(&mut self, engine: &VitalsEngine) -> VitalsReport {
        let window_full = engine.ring().filled() >= engine.config().window_size;
        self.build_from_parts(
            Utc::now(),
            engine.vital_signs(),
            engine.detection_state(),
            engine.calibration(),
            engine.parameters(),
            window_full,
        )
    }

    /// Build a report from already published outputs.
    pub fn build_from_parts(
        &mut self,
        observed_at: DateTime<Utc>,
        vitals: VitalSignEstimate,
        detection: DetectionState,
        calibration: CalibrationStatus,
        parameters: DetectionParameters,
        window_full: bool,
    ) -> VitalsReport {
        self.sequence += 1;

        VitalsReport {
            report_version: REPORT_VERSION.to_string(),
            observed_at_utc: observed_at.to_rfc3339(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: crate::VERSION.to_string(),
                instance_id: self.instance_id.to_string(),
                device: self.device.clone(),
            },
            sequence: self.sequence,
            vitals,
            detection,
            calibration,
            parameters,
            window_full,
            notes: "Derived from radio amplitude; not a clinical measurement".to_string(),
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
