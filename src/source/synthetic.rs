//! Synthetic radio source.
//!
//! Generates a deterministic mix of a cardiac and a respiration sinusoid at
//! a fixed sample rate. Stands in for the real measurement subsystem in the
//! CLI, demos and tests.

use crate::source::sample_channel;
use crate::source::types::RadioSample;
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Shape of the generated signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub sample_rate_hz: f64,
    pub cardiac_hz: f64,
    pub cardiac_amplitude: f64,
    pub respiration_hz: f64,
    pub respiration_amplitude: f64,
    /// Constant added to every sample
    pub offset: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 10.0,
            cardiac_hz: 1.2,
            cardiac_amplitude: 10.0,
            respiration_hz: 0.25,
            respiration_amplitude: 20.0,
            offset: 0.0,
        }
    }
}

impl SyntheticConfig {
    /// Amplitude of the `index`-th sample.
    pub fn amplitude_at(&self, index: u64) -> f64 {
        let t = index as f64 / self.sample_rate_hz;
        self.offset
            + self.cardiac_amplitude * (2.0 * PI * self.cardiac_hz * t).sin()
            + self.respiration_amplitude * (2.0 * PI * self.respiration_hz * t).sin()
    }

    /// The first `n` amplitudes, without any timing.
    pub fn amplitudes(&self, n: usize) -> Vec<f64> {
        (0..n as u64).map(|i| self.amplitude_at(i)).collect()
    }
}

/// Errors from the synthetic source.
#[derive(Debug)]
pub enum SourceError {
    AlreadyRunning,
    InvalidSampleRate(f64),
    Spawn(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::AlreadyRunning => write!(f, "Source is already running"),
            SourceError::InvalidSampleRate(r) => {
                write!(f, "Sample rate must be finite and positive, got {r}")
            }
            SourceError::Spawn(e) => write!(f, "Could not start source thread: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Background thread emitting synthetic samples in real time.
#[derive(Debug)]
pub struct SyntheticSource {
    config: SyntheticConfig,
    sender: Sender<RadioSample>,
    receiver: Receiver<RadioSample>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let (sender, receiver) = sample_channel();
        Self {
            config,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Start emitting samples.
    pub fn start(&mut self) -> Result<(), SourceError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SourceError::AlreadyRunning);
        }
        let rate = self.config.sample_rate_hz;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(SourceError::InvalidSampleRate(rate));
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let sender = self.sender.clone();
        let config = self.config;
        let period = Duration::from_secs_f64(1.0 / rate);

        let handle = std::thread::Builder::new()
            .name("synthetic-source".to_string())
            .spawn(move || {
                let mut index = 0u64;
                while running.load(Ordering::SeqCst) {
                    let sample = RadioSample::amplitude(config.amplitude_at(index));
                    // Drop the sample when the consumer lags
                    if sender.try_send(sample).is_err() {
                        tracing::warn!(index, "sample queue full, dropping synthetic sample");
                    }
                    index += 1;
                    std::thread::sleep(period);
                }
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                SourceError::Spawn(e.to_string())
            })?;

        self.handle = Some(handle);
        tracing::info!(rate_hz = rate, "synthetic source started");
        Ok(())
    }

    /// Stop emitting samples and wait for the thread to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            tracing::info!("synthetic source stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for radio samples.
    pub fn receiver(&self) -> &Receiver<RadioSample> {
        &self.receiver
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amplitudes_are_deterministic() {
        let config = SyntheticConfig::default();
        assert_eq!(config.amplitudes(32), config.amplitudes(32));
        assert_eq!(config.amplitude_at(0), 0.0);
    }

    #[test]
    fn test_offset_applied() {
        let config = SyntheticConfig {
            cardiac_amplitude: 0.0,
            respiration_amplitude: 0.0,
            offset: 50.0,
            ..Default::default()
        };
        assert!(config.amplitudes(10).iter().all(|&a| a == 50.0));
    }

    #[test]
    fn test_start_stop() {
        let mut source = SyntheticSource::new(SyntheticConfig {
            sample_rate_hz: 200.0,
            ..Default::default()
        });
        source.start().unwrap();
        assert!(source.is_running());
        assert!(matches!(source.start(), Err(SourceError::AlreadyRunning)));

        let first = source
            .receiver()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert_eq!(first.amplitude, 0.0);

        source.stop();
        assert!(!source.is_running());
    }

    #[test]
    fn test_rejects_bad_rate() {
        let mut source = SyntheticSource::new(SyntheticConfig {
            sample_rate_hz: 0.0,
            ..Default::default()
        });
        assert!(matches!(
            source.start(),
            Err(SourceError::InvalidSampleRate(_))
        ));
        assert!(!source.is_running());
    }
}
