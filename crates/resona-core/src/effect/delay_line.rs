//! Fixed-length circular delay line
//!
//! Shared by the time-based stages. Length is fixed at construction and
//! measured in interleaved samples, so a stereo line delays both channels
//! by the same frame count without tracking them separately.

/// Circular f32 buffer with a single write cursor
#[derive(Debug)]
pub struct DelayLine {
    buffer: Vec<f32>,
    pos: usize,
}

impl DelayLine {
    /// Create a silent line of `len` samples (panics on zero length)
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "delay line length must be positive");
        Self {
            buffer: vec![0.0; len],
            pos: 0,
        }
    }

    /// Line length in samples
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Read behind the cursor
    ///
    /// `tap(0)` is the oldest sample, written a full line length ago; for
    /// `delay >= 1` this reads the sample written `delay` pushes ago. The
    /// offset must be less than `len`.
    #[inline]
    pub fn tap(&self, delay: usize) -> f32 {
        debug_assert!(delay < self.buffer.len());
        let read_pos = (self.pos + self.buffer.len() - delay) % self.buffer.len();
        self.buffer[read_pos]
    }

    /// Write a sample at the cursor and advance it
    #[inline]
    pub fn push(&mut self, value: f32) {
        self.buffer[self.pos] = value;
        self.pos = (self.pos + 1) % self.buffer.len();
    }

    /// Clear contents and rewind the cursor
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}
