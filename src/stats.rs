//! Pipeline activity counters.
//!
//! Counts what the pipeline has processed so an operator can see whether
//! data is flowing, without keeping any of the samples themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Atomic counters shared between the pipeline worker and readers.
#[derive(Debug)]
pub struct PipelineStats {
    samples_ingested: AtomicU64,
    samples_rejected: AtomicU64,
    estimates_computed: AtomicU64,
    low_confidence_estimates: AtomicU64,
    calibrations: AtomicU64,
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            samples_ingested: AtomicU64::new(0),
            samples_rejected: AtomicU64::new(0),
            estimates_computed: AtomicU64::new(0),
            low_confidence_estimates: AtomicU64::new(0),
            calibrations: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create stats that load from and save to `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!(error = %e, "could not load previous pipeline stats");
        }

        stats
    }

    pub fn record_sample(&self) {
        self.samples_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_sample(&self) {
        self.samples_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_estimate(&self) {
        self.estimates_computed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_low_confidence(&self) {
        self.low_confidence_estimates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_calibration(&self) {
        self.calibrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_ingested: self.samples_ingested.load(Ordering::Relaxed),
            samples_rejected: self.samples_rejected.load(Ordering::Relaxed),
            estimates_computed: self.estimates_computed.load(Ordering::Relaxed),
            low_confidence_estimates: self.low_confidence_estimates.load(Ordering::Relaxed),
            calibrations: self.calibrations.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start)
                .num_seconds()
                .max(0) as u64,
        }
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Samples ingested: {}\n\
             - Samples rejected: {}\n\
             - Spectral estimates: {}\n\
             - Low-confidence passes: {}\n\
             - Calibrations: {}\n\
             - Session duration: {} seconds",
            stats.samples_ingested,
            stats.samples_rejected,
            stats.estimates_computed,
            stats.low_confidence_estimates,
            stats.calibrations,
            stats.session_duration_secs
        )
    }

    /// Save counters to disk, if persistence is configured.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.snapshot();
            let persisted = PersistedStats {
                samples_ingested: stats.samples_ingested,
                samples_rejected: stats.samples_rejected,
                estimates_computed: stats.estimates_computed,
                low_confidence_estimates: stats.low_confidence_estimates,
                calibrations: stats.calibrations,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.samples_ingested
                    .store(persisted.samples_ingested, Ordering::Relaxed);
                self.samples_rejected
                    .store(persisted.samples_rejected, Ordering::Relaxed);
                self.estimates_computed
                    .store(persisted.estimates_computed, Ordering::Relaxed);
                self.low_confidence_estimates
                    .store(persisted.low_confidence_estimates, Ordering::Relaxed);
                self.calibrations
                    .store(persisted.calibrations, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    pub fn reset(&self) {
        self.samples_ingested.store(0, Ordering::Relaxed);
        self.samples_rejected.store(0, Ordering::Relaxed);
        self.estimates_computed.store(0, Ordering::Relaxed);
        self.low_confidence_estimates.store(0, Ordering::Relaxed);
        self.calibrations.store(0, Ordering::Relaxed);
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub samples_ingested: u64,
    pub samples_rejected: u64,
    pub estimates_computed: u64,
    pub low_confidence_estimates: u64,
    pub calibrations: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// On-disk format.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    samples_ingested: u64,
    samples_rejected: u64,
    estimates_computed: u64,
    low_confidence_estimates: u64,
    calibrations: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared stats.
pub type SharedPipelineStats = Arc<PipelineStats>;

pub fn create_shared_stats() -> SharedPipelineStats {
    Arc::new(PipelineStats::new())
}

pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedPipelineStats {
    Arc::new(PipelineStats::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = PipelineStats::new();
        stats.record_sample();
        stats.record_sample();
        stats.record_rejected_sample();
        stats.record_estimate();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.samples_ingested, 2);
        assert_eq!(snapshot.samples_rejected, 1);
        assert_eq!(snapshot.estimates_computed, 1);
        assert_eq!(snapshot.low_confidence_estimates, 0);
    }

    #[test]
    fn test_reset() {
        let stats = PipelineStats::new();
        stats.record_calibration();
        stats.record_low_confidence();
        stats.reset();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.calibrations, 0);
        assert_eq!(snapshot.low_confidence_estimates, 0);
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("wifi-vitals-stats-{}", uuid::Uuid::new_v4()))
            .join("stats.json");

        let stats = PipelineStats::with_persistence(path.clone());
        stats.record_sample();
        stats.record_estimate();
        stats.save().unwrap();

        let reloaded = PipelineStats::with_persistence(path.clone());
        let snapshot = reloaded.snapshot();
        assert_eq!(snapshot.samples_ingested, 1);
        assert_eq!(snapshot.estimates_computed, 1);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_summary_format() {
        let summary = PipelineStats::new().summary();
        assert!(summary.contains("Samples ingested"));
        assert!(summary.contains("Spectral estimates"));
    }
}
