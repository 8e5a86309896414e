//! Radio measurement event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One measurement delivered by the radio subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadioSample {
    /// Timestamp when the sample was taken
    pub timestamp: DateTime<Utc>,
    /// Signal amplitude
    pub amplitude: f64,
    /// Signal phase; carried through but not used by the pipeline
    pub phase: f64,
}

impl RadioSample {
    pub fn new(amplitude: f64, phase: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            amplitude,
            phase,
        }
    }

    /// Amplitude-only sample.
    pub fn amplitude(amplitude: f64) -> Self {
        Self::new(amplitude, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_creation() {
        let sample = RadioSample::new(3.5, 0.2);
        assert_eq!(sample.amplitude, 3.5);
        assert_eq!(sample.phase, 0.2);
        assert_eq!(RadioSample::amplitude(1.0).phase, 0.0);
    }
}
