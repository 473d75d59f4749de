//! Sample sources
//!
//! A [`SampleSource`] is the upstream end of an effect chain: anything that
//! can fill interleaved blocks at a fixed format. Short reads are normal
//! (packet boundaries, end of stream approaching); an error is fatal to the
//! stream and the source must not be read again.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{AudioFormat, SampleBlock};

/// Errors from opening or reading a source
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: symphonia::core::errors::Error,
    },

    #[error("no decodable audio track in {path}")]
    NoAudioTrack { path: PathBuf },

    #[error("unsupported codec in {path}: {source}")]
    UnsupportedCodec {
        path: PathBuf,
        source: symphonia::core::errors::Error,
    },

    #[error("track in {path} has no {missing} in its codec parameters")]
    MissingParameters { path: PathBuf, missing: &'static str },

    #[error("decode failed mid-stream: {0}")]
    Stream(symphonia::core::errors::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A pull-based producer of interleaved f32 audio
pub trait SampleSource: Send {
    /// The fixed stream format of this source
    fn format(&self) -> AudioFormat;

    /// Fill `block` from frame 0 with up to `max_frames` frames
    ///
    /// Sets the block's active frame count and returns it. A return of 0
    /// means end of stream; fewer frames than requested is a normal short
    /// read, not an error. After an `Err` the source must not be read
    /// again.
    fn read(&mut self, block: &mut SampleBlock, max_frames: usize) -> Result<usize, DecodeError>;
}

/// An in-memory source over a fixed buffer of interleaved samples
///
/// Used by tests and tools that feed a chain without touching the decoder.
pub struct MemorySource {
    samples: Vec<f32>,
    format: AudioFormat,
    cursor: usize,
}

impl MemorySource {
    /// Wrap interleaved samples (panics if not a whole number of frames)
    pub fn new(samples: Vec<f32>, format: AudioFormat) -> Self {
        assert!(
            samples.len() % format.channels as usize == 0,
            "sample count must be a multiple of the channel count"
        );
        Self { samples, format, cursor: 0 }
    }

    /// Frames remaining before end of stream
    pub fn frames_remaining(&self) -> usize {
        (self.samples.len() - self.cursor) / self.format.channels as usize
    }
}

impl SampleSource for MemorySource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, block: &mut SampleBlock, max_frames: usize) -> Result<usize, DecodeError> {
        let channels = self.format.channels as usize;
        let frames = max_frames
            .min(block.capacity_frames())
            .min(self.frames_remaining());
        let n = frames * channels;

        block.buffer_mut()[..n].copy_from_slice(&self.samples[self.cursor..self.cursor + n]);
        block.set_frames(frames);
        self.cursor += n;
        Ok(frames)
    }
}
