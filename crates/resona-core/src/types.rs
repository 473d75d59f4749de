//! Common types for Resona
//!
//! Fundamental audio types used throughout the engine: the stream format
//! descriptor and the fixed-capacity interleaved sample block that all
//! processing operates on.

/// Audio sample type (32-bit float throughout the processing path)
pub type Sample = f32;

/// Stream format: sample rate and interleaved channel count
///
/// Fixed for the lifetime of a stream. Components that disagree on format
/// are a construction-time error, never a per-block negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    /// Create a format descriptor (panics on zero rate or zero channels)
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        assert!(sample_rate > 0, "sample rate must be positive");
        assert!(channels > 0, "channel count must be positive");
        Self { sample_rate, channels }
    }

    /// Samples per second across all channels
    #[inline]
    pub fn samples_per_second(&self) -> usize {
        self.sample_rate as usize * self.channels as usize
    }

    /// Convert a duration in seconds to a whole number of frames
    #[inline]
    pub fn frames_for_seconds(&self, seconds: f32) -> usize {
        (self.sample_rate as f32 * seconds) as usize
    }

    /// Convert a duration in seconds to interleaved sample count
    #[inline]
    pub fn samples_for_seconds(&self, seconds: f32) -> usize {
        self.frames_for_seconds(seconds) * self.channels as usize
    }
}

/// A fixed-capacity block of interleaved samples
///
/// Allocated once at construction; the audio thread only ever adjusts the
/// active frame count within the preallocated capacity. `samples()` and
/// `samples_mut()` expose exactly the active region, `buffer_mut()` exposes
/// the full capacity for a source to fill before committing a frame count.
#[derive(Debug, Clone)]
pub struct SampleBlock {
    samples: Vec<Sample>,
    channels: u16,
    frames: usize,
}

impl SampleBlock {
    /// Create a silent block with the given frame capacity
    pub fn new(capacity_frames: usize, channels: u16) -> Self {
        assert!(channels > 0, "channel count must be positive");
        Self {
            samples: vec![0.0; capacity_frames * channels as usize],
            channels,
            frames: 0,
        }
    }

    /// Frame capacity this block was allocated with
    #[inline]
    pub fn capacity_frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Interleaved channel count
    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of active frames
    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Set the active frame count (panics if beyond capacity)
    ///
    /// Real-time safe: never allocates.
    #[inline]
    pub fn set_frames(&mut self, frames: usize) {
        assert!(
            frames <= self.capacity_frames(),
            "set_frames beyond capacity ({} > {})",
            frames,
            self.capacity_frames()
        );
        self.frames = frames;
    }

    /// Active region as an interleaved slice
    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples[..self.frames * self.channels as usize]
    }

    /// Active region as a mutable interleaved slice
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [Sample] {
        let len = self.frames * self.channels as usize;
        &mut self.samples[..len]
    }

    /// Full capacity as a mutable slice, for a source to fill
    #[inline]
    pub fn buffer_mut(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    /// Zero the whole buffer and drop the active count to 0
    pub fn fill_silence(&mut self) {
        self.samples.fill(0.0);
        self.frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_math() {
        let fmt = AudioFormat::new(44100, 2);
        assert_eq!(fmt.frames_for_seconds(0.5), 22050);
        assert_eq!(fmt.samples_for_seconds(0.5), 44100);
        assert_eq!(fmt.samples_per_second(), 88200);
    }

    #[test]
    #[should_panic]
    fn format_rejects_zero_channels() {
        AudioFormat::new(44100, 0);
    }

    #[test]
    fn block_active_region_tracks_frames() {
        let mut block = SampleBlock::new(64, 2);
        assert_eq!(block.capacity_frames(), 64);
        assert!(block.is_empty());

        block.buffer_mut()[..4].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        block.set_frames(2);
        assert_eq!(block.samples(), &[1.0, 2.0, 3.0, 4.0]);

        block.set_frames(1);
        assert_eq!(block.samples(), &[1.0, 2.0]);
    }

    #[test]
    #[should_panic]
    fn block_rejects_frames_beyond_capacity() {
        let mut block = SampleBlock::new(8, 2);
        block.set_frames(9);
    }

    #[test]
    fn block_silence_resets_count() {
        let mut block = SampleBlock::new(8, 1);
        block.buffer_mut().fill(0.7);
        block.set_frames(8);
        block.fill_silence();
        assert!(block.is_empty());
        assert!(block.buffer_mut().iter().all(|&s| s == 0.0));
    }
}
