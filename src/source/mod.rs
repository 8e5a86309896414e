//! Radio sample sources.
//!
//! The real measurement subsystem lives outside this crate; it hands samples
//! over through [`sample_channel`]. [`SyntheticSource`] produces a test signal
//! on the same kind of channel.

pub mod synthetic;
pub mod types;

pub use synthetic::{SourceError, SyntheticConfig, SyntheticSource};
pub use types::RadioSample;

use crossbeam_channel::{bounded, Receiver, Sender};

/// Default queue depth between a source and the pipeline.
pub const SAMPLE_QUEUE_CAPACITY: usize = 10_000;

/// Create a bounded sample channel for an external measurement subsystem.
pub fn sample_channel() -> (Sender<RadioSample>, Receiver<RadioSample>) {
    bounded(SAMPLE_QUEUE_CAPACITY)
}
