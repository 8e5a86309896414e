//! Control surface for display and operator collaborators.
//!
//! Commands are validated when sent and applied by the pipeline worker
//! between two samples, so a sample always sees one complete parameter set.

use crate::core::detection::{parse_sensitivity, DetectionMode, DetectionParameters, ParameterError};
use crate::core::engine::VitalsEngine;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// A single control change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    SetSensitivity(u8),
    SetMode(DetectionMode),
    SetNoiseFilterEnabled(bool),
    /// Replace every detection parameter at once
    SetParameters(DetectionParameters),
    /// Reset calibration and clear buffered samples
    TriggerCalibration,
    /// Reset calibration only
    ResetBaseline,
    DisableAutoCalibration,
}

impl ControlCommand {
    /// Apply to an engine. Errors leave the engine unchanged.
    pub fn apply(self, engine: &mut VitalsEngine) -> Result<(), ParameterError> {
        match self {
            ControlCommand::SetSensitivity(s) => engine.set_sensitivity(i64::from(s)),
            ControlCommand::SetMode(mode) => {
                engine.set_mode(mode);
                Ok(())
            }
            ControlCommand::SetNoiseFilterEnabled(enabled) => {
                engine.set_noise_filter_enabled(enabled);
                Ok(())
            }
            ControlCommand::SetParameters(params) => engine.set_parameters(params),
            ControlCommand::TriggerCalibration => {
                engine.trigger_calibration();
                Ok(())
            }
            ControlCommand::ResetBaseline => {
                engine.reset_baseline();
                Ok(())
            }
            ControlCommand::DisableAutoCalibration => {
                engine.disable_auto_calibration();
                Ok(())
            }
        }
    }
}

/// Errors returned to a control caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlError {
    Invalid(ParameterError),
    Disconnected,
}

impl std::fmt::Display for ControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlError::Invalid(e) => write!(f, "{e}"),
            ControlError::Disconnected => write!(f, "Pipeline is no longer running"),
        }
    }
}

impl std::error::Error for ControlError {}

impl From<ParameterError> for ControlError {
    fn from(e: ParameterError) -> Self {
        ControlError::Invalid(e)
    }
}

/// Cloneable sender side of the control channel.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: Sender<ControlCommand>,
}

/// Create a connected control handle and receiver.
pub fn control_channel() -> (ControlHandle, Receiver<ControlCommand>) {
    let (tx, rx) = unbounded();
    (ControlHandle { tx }, rx)
}

impl ControlHandle {
    fn send(&self, command: ControlCommand) -> Result<(), ControlError> {
        self.tx
            .send(command)
            .map_err(|_| ControlError::Disconnected)
    }

    /// Validate and queue a sensitivity change.
    pub fn set_sensitivity(&self, value: i64) -> Result<(), ControlError> {
        let sensitivity = parse_sensitivity(value)?;
        self.send(ControlCommand::SetSensitivity(sensitivity))
    }

    pub fn set_mode(&self, mode: DetectionMode) -> Result<(), ControlError> {
        self.send(ControlCommand::SetMode(mode))
    }

    /// Parse and queue a mode change by name.
    pub fn set_mode_str(&self, mode: &str) -> Result<(), ControlError> {
        self.set_mode(mode.parse()?)
    }

    pub fn set_noise_filter_enabled(&self, enabled: bool) -> Result<(), ControlError> {
        self.send(ControlCommand::SetNoiseFilterEnabled(enabled))
    }

    /// Validate and queue a full parameter swap.
    pub fn set_parameters(&self, params: DetectionParameters) -> Result<(), ControlError> {
        params.validate()?;
        self.send(ControlCommand::SetParameters(params))
    }

    pub fn trigger_calibration(&self) -> Result<(), ControlError> {
        self.send(ControlCommand::TriggerCalibration)
    }

    pub fn reset_baseline(&self) -> Result<(), ControlError> {
        self.send(ControlCommand::ResetBaseline)
    }

    pub fn disable_auto_calibration(&self) -> Result<(), ControlError> {
        self.send(ControlCommand::DisableAutoCalibration)
    }
}

/// Apply every queued command and return the ones that took effect.
pub fn drain_commands(
    rx: &Receiver<ControlCommand>,
    engine: &mut VitalsEngine,
) -> Vec<ControlCommand> {
    let mut applied = Vec::new();
    while let Ok(command) = rx.try_recv() {
        match command.apply(engine) {
            Ok(()) => applied.push(command),
            Err(e) => tracing::warn!(?command, error = %e, "control command rejected"),
        }
    }
    applied
}
