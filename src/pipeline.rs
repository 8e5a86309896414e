//! Threaded pipeline runner.
//!
//! One worker thread owns the [`VitalsEngine`]. It drains queued control
//! commands, ingests the next sample, runs the decimated spectral pass when
//! due and publishes the outputs. Ingestion and estimation therefore never
//! interleave, and control changes land between samples.
//!
//! ```text
//!   source ──samples──▶ ┌──────────────┐ ──outputs──▶ display (read lock)
//!                       │ VitalsEngine │
//!   control ─commands─▶ └──────────────┘ ──updates──▶ estimate listeners
//! ```

use crate::control::{control_channel, drain_commands, ControlCommand, ControlHandle};
use crate::core::calibration::CalibrationStatus;
use crate::core::detection::{DetectionParameters, DetectionState};
use crate::core::engine::{EstimateOutcome, VitalsEngine};
use crate::core::smoothing::VitalSignEstimate;
use crate::source::RadioSample;
use crate::stats::SharedPipelineStats;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

/// How long the worker waits for a sample before re-checking controls.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Depth of the estimate update queue; older updates are dropped when full.
const UPDATE_QUEUE_CAPACITY: usize = 64;

/// Latest published pipeline state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutputs {
    pub vitals: VitalSignEstimate,
    pub detection: DetectionState,
    pub calibration: CalibrationStatus,
    pub parameters: DetectionParameters,
    pub last_estimate: Option<EstimateOutcome>,
    pub window_full: bool,
    pub updated_at: DateTime<Utc>,
}

impl PipelineOutputs {
    fn from_engine(engine: &VitalsEngine, last_estimate: Option<EstimateOutcome>) -> Self {
        Self {
            vitals: engine.vital_signs(),
            detection: engine.detection_state(),
            calibration: engine.calibration(),
            parameters: engine.parameters(),
            last_estimate,
            window_full: engine.ring().filled() >= engine.config().window_size,
            updated_at: Utc::now(),
        }
    }
}

/// Shared, read-mostly view of the outputs.
pub type SharedOutputs = Arc<RwLock<PipelineOutputs>>;

/// Running pipeline.
#[derive(Debug)]
pub struct Pipeline {
    control: ControlHandle,
    outputs: SharedOutputs,
    updates: Receiver<EstimateOutcome>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<VitalsEngine>>,
}

impl Pipeline {
    /// Move `engine` onto a worker thread fed by `samples`.
    pub fn spawn(
        engine: VitalsEngine,
        samples: Receiver<RadioSample>,
        stats: SharedPipelineStats,
    ) -> Result<Self, std::io::Error> {
        let (control, control_rx) = control_channel();
        let (updates_tx, updates) = bounded(UPDATE_QUEUE_CAPACITY);
        let outputs = Arc::new(RwLock::new(PipelineOutputs::from_engine(&engine, None)));
        let running = Arc::new(AtomicBool::new(true));

        let worker = Worker {
            engine,
            samples,
            control_rx,
            updates_tx,
            outputs: Arc::clone(&outputs),
            running: Arc::clone(&running),
            stats,
            last_estimate: None,
        };

        let handle = std::thread::Builder::new()
            .name("vitals-pipeline".to_string())
            .spawn(move || worker.run())?;

        tracing::info!("pipeline started");
        Ok(Self {
            control,
            outputs,
            updates,
            running,
            worker: Some(handle),
        })
    }

    /// Handle for sending control commands.
    pub fn control(&self) -> &ControlHandle {
        &self.control
    }

    /// Receiver of every spectral pass result.
    pub fn updates(&self) -> &Receiver<EstimateOutcome> {
        &self.updates
    }

    pub fn outputs(&self) -> PipelineOutputs {
        self.outputs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn vital_signs(&self) -> VitalSignEstimate {
        self.outputs().vitals
    }

    pub fn detection_state(&self) -> DetectionState {
        self.outputs().detection
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the worker and return the engine it owned.
    pub fn stop(&mut self) -> Option<VitalsEngine> {
        self.running.store(false, Ordering::SeqCst);
        let engine = self.worker.take().and_then(|h| h.join().ok());
        if engine.is_some() {
            tracing::info!("pipeline stopped");
        }
        engine
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    engine: VitalsEngine,
    samples: Receiver<RadioSample>,
    control_rx: Receiver<ControlCommand>,
    updates_tx: Sender<EstimateOutcome>,
    outputs: SharedOutputs,
    running: Arc<AtomicBool>,
    stats: SharedPipelineStats,
    last_estimate: Option<EstimateOutcome>,
}

impl Worker {
    fn run(mut self) -> VitalsEngine {
        while self.running.load(Ordering::SeqCst) {
            match self.samples.recv_timeout(IDLE_POLL) {
                Ok(sample) => {
                    self.apply_controls();
                    self.handle_sample(sample);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.apply_controls() {
                        self.publish();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("sample source disconnected");
                    self.apply_controls();
                    self.publish();
                    break;
                }
            }
        }
        // Commands queued before shutdown still take effect
        if self.apply_controls() {
            self.publish();
        }
        self.running.store(false, Ordering::SeqCst);
        self.engine
    }

    /// Returns true when at least one command took effect.
    fn apply_controls(&mut self) -> bool {
        let applied = drain_commands(&self.control_rx, &mut self.engine);
        for command in &applied {
            if matches!(
                command,
                ControlCommand::TriggerCalibration | ControlCommand::ResetBaseline
            ) {
                self.stats.record_calibration();
            }
        }
        !applied.is_empty()
    }

    fn handle_sample(&mut self, sample: RadioSample) {
        if sample.amplitude.is_finite() {
            self.stats.record_sample();
        } else {
            self.stats.record_rejected_sample();
        }

        let (_, outcome) = self.engine.process(sample.amplitude, sample.phase);
        if let Some(outcome) = outcome {
            match outcome {
                EstimateOutcome::Updated { .. } => self.stats.record_estimate(),
                EstimateOutcome::LowConfidence { .. } => self.stats.record_low_confidence(),
            }
            self.last_estimate = Some(outcome);
            if self.updates_tx.try_send(outcome).is_err() {
                tracing::debug!("estimate update queue full, dropping update");
            }
        }
        self.publish();
    }

    fn publish(&self) {
        let outputs = PipelineOutputs::from_engine(&self.engine, self.last_estimate);
        *self
            .outputs
            .write()
            .unwrap_or_else(PoisonError::into_inner) = outputs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calibration::CalibrationPhase;
    use crate::core::engine::EngineConfig;
    use crate::source::sample_channel;
    use crate::stats::create_shared_stats;

    fn spawn() -> (Pipeline, Sender<RadioSample>, SharedPipelineStats) {
        let engine =
            VitalsEngine::new(EngineConfig::default(), DetectionParameters::default()).unwrap();
        let (tx, rx) = sample_channel();
        let stats = create_shared_stats();
        let pipeline = Pipeline::spawn(engine, rx, Arc::clone(&stats)).unwrap();
        (pipeline, tx, stats)
    }

    fn wait_for_exit(pipeline: &Pipeline) {
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while pipeline.is_running() {
            assert!(
                std::time::Instant::now() < deadline,
                "worker did not exit after the source disconnected"
            );
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_pipeline_processes_samples() {
        let (mut pipeline, tx, stats) = spawn();
        for _ in 0..20 {
            tx.send(RadioSample::amplitude(1.0)).unwrap();
        }
        drop(tx);

        // Worker exits on its own once the queue is drained
        wait_for_exit(&pipeline);
        let engine = pipeline.stop().unwrap();
        assert_eq!(engine.ring().total_written(), 20);
        assert_eq!(stats.snapshot().samples_ingested, 20);
        assert_eq!(stats.snapshot().low_confidence_estimates, 2);
        assert_eq!(pipeline.updates().try_iter().count(), 2);
    }

    #[test]
    fn test_controls_applied_while_idle() {
        let (mut pipeline, _tx, stats) = spawn();
        pipeline.control().disable_auto_calibration().unwrap();
        pipeline.control().trigger_calibration().unwrap();

        let engine = pipeline.stop().unwrap();
        // Disable then reset: back to Warming
        assert_eq!(engine.calibration().phase, CalibrationPhase::Warming);
        assert_eq!(stats.snapshot().calibrations, 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut pipeline, _tx, _stats) = spawn();
        assert!(pipeline.stop().is_some());
        assert!(pipeline.stop().is_none());
        assert!(!pipeline.is_running());
    }
}
