//! Fixed-capacity circular store of baseline-corrected amplitude samples.
//!
//! The ring never reallocates after construction. Reads return the most
//! recent `W` samples in chronological order, wrapping around the end of
//! the backing buffer as needed.

/// Default ring capacity (N).
pub const DEFAULT_RING_CAPACITY: usize = 512;

/// Default analysis window size (W).
pub const DEFAULT_WINDOW_SIZE: usize = 256;

/// Circular sample buffer with a monotonically advancing write index.
#[derive(Debug, Clone)]
pub struct SampleRing {
    /// Backing storage, always `capacity` long
    samples: Vec<f64>,
    /// Next slot to write, always in `[0, capacity)`
    write_index: usize,
    /// Number of samples ever written since construction or the last clear
    total_written: u64,
}

impl SampleRing {
    /// Create a zero-filled ring with the given capacity.
    ///
    /// A capacity of zero is bumped to one so index arithmetic stays defined.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity.max(1)],
            write_index: 0,
            total_written: 0,
        }
    }

    /// Ring capacity (N).
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Current write index.
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Total samples written since construction or the last clear.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of slots holding real (non-initial) samples.
    pub fn filled(&self) -> usize {
        usize::try_from(self.total_written)
            .unwrap_or(usize::MAX)
            .min(self.capacity())
    }

    /// Write a sample at the current index and advance modulo capacity.
    pub fn push(&mut self, value: f64) {
        self.samples[self.write_index] = value;
        self.write_index = (self.write_index + 1) % self.capacity();
        self.total_written = self.total_written.saturating_add(1);
    }

    /// Physical slot of the `i`-th sample of a `window`-long read.
    ///
    /// Computes `(write_index - window + i + N) mod N` without ever going
    /// below zero: the window is clipped to the capacity and `N` is added
    /// before the subtraction.
    pub fn window_index(&self, window: usize, i: usize) -> usize {
        let capacity = self.capacity();
        let window = window.min(capacity);
        (self.write_index + capacity - window + i) % capacity
    }

    /// Copy the most recent `window` samples, oldest first.
    ///
    /// Returns `None` until at least `window` real samples have been written,
    /// or when `window` exceeds the ring capacity.
    pub fn latest_window(&self, window: usize) -> Option<Vec<f64>> {
        if window == 0 || window > self.capacity() || self.filled() < window {
            return None;
        }

        Some(
            (0..window)
                .map(|i| self.samples[self.window_index(window, i)])
                .collect(),
        )
    }

    /// Most recently written sample, if any.
    pub fn last(&self) -> Option<f64> {
        if self.total_written == 0 {
            return None;
        }
        Some(self.samples[self.window_index(1, 0)])
    }

    /// Zero the contents and rewind the write index.
    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
        self.write_index = 0;
        self.total_written = 0;
    }
}

impl Default for SampleRing {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_index_stays_in_bounds() {
        let mut ring = SampleRing::default();
        for i in 0..1024 {
            ring.push(i as f64);
            assert!(ring.write_index() < DEFAULT_RING_CAPACITY);
        }
        assert_eq!(ring.write_index(), 0);
        assert_eq!(ring.total_written(), 1024);
    }

    #[test]
    fn test_wraparound_overwrites_every_slot() {
        let mut ring = SampleRing::new(8);
        for i in 0..16 {
            ring.push(i as f64);
        }
        // Two full passes: only the second pass survives
        let window = ring.latest_window(8).unwrap();
        assert_eq!(window, (8..16).map(|v| v as f64).collect::<Vec<_>>());
        assert_eq!(ring.total_written() / ring.capacity() as u64, 2);
    }

    #[test]
    fn test_latest_window_is_chronological_across_wrap() {
        let mut ring = SampleRing::new(8);
        for i in 0..11 {
            ring.push(i as f64);
        }
        assert_eq!(ring.write_index(), 3);
        assert_eq!(ring.latest_window(4).unwrap(), vec![7.0, 8.0, 9.0, 10.0]);
    }

    #[test]
    fn test_window_index_no_underflow_at_zero() {
        let ring = SampleRing::new(512);
        // write_index == 0, window == capacity
        assert_eq!(ring.window_index(512, 0), 0);
        assert_eq!(ring.window_index(256, 0), 256);
        assert_eq!(ring.window_index(256, 255), 511);
        // Oversized windows are clipped rather than underflowing
        assert_eq!(ring.window_index(10_000, 3), 3);
    }

    #[test]
    fn test_window_requires_enough_samples() {
        let mut ring = SampleRing::new(16);
        for _ in 0..7 {
            ring.push(1.0);
        }
        assert!(ring.latest_window(8).is_none());
        ring.push(1.0);
        assert!(ring.latest_window(8).is_some());
        assert!(ring.latest_window(17).is_none());
    }

    #[test]
    fn test_clear_resets_state() {
        let mut ring = SampleRing::new(4);
        ring.push(3.0);
        ring.push(4.0);
        assert_eq!(ring.last(), Some(4.0));

        ring.clear();
        assert_eq!(ring.write_index(), 0);
        assert_eq!(ring.filled(), 0);
        assert_eq!(ring.last(), None);
    }
}
