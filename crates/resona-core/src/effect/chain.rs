//! The effect chain
//!
//! Owns an upstream [`SampleSource`] and the five stages in their fixed
//! order: echo, reverb, tremolo, chorus, compressor. Pulling a block reads
//! from the source, then runs every stage over exactly the frames the
//! source produced; a short read shortens the processed region, it never
//! pads. The chain is built for the source's format and the format never
//! changes afterwards.

use thiserror::Error;

use crate::effect::{
    Chorus, Compressor, EffectStage, MultiTapEcho, Reverb, StageControl, Tremolo,
};
use crate::source::{DecodeError, SampleSource};
use crate::types::{AudioFormat, SampleBlock};

/// Errors from pulling through a chain
#[derive(Error, Debug)]
pub enum ChainError {
    /// Fatal: the block was allocated for a different channel count than
    /// the chain's stream format. The chain must be rebuilt, not retried.
    #[error("block channel count {block} does not match stream format {format}")]
    FormatMismatch { block: u16, format: u16 },

    #[error(transparent)]
    Source(#[from] DecodeError),
}

/// Control handles for every stage in the chain, in processing order
#[derive(Clone)]
pub struct ChainControls {
    pub echo: StageControl,
    pub reverb: StageControl,
    pub tremolo: StageControl,
    pub chorus: StageControl,
    pub compressor: StageControl,
}

impl ChainControls {
    /// Disable every stage
    pub fn disable_all(&self) {
        for control in [
            &self.echo,
            &self.reverb,
            &self.tremolo,
            &self.chorus,
            &self.compressor,
        ] {
            control.configure(false, 0.0);
        }
    }
}

/// Pull-based effect chain over an upstream source
pub struct EffectChain {
    source: Box<dyn SampleSource>,
    stages: Vec<Box<dyn EffectStage>>,
    format: AudioFormat,
}

impl EffectChain {
    /// Build the chain for the source's format; all stages start disabled
    pub fn new(source: Box<dyn SampleSource>) -> (Self, ChainControls) {
        let format = source.format();

        let echo = MultiTapEcho::new(format);
        let reverb = Reverb::new(format);
        let tremolo = Tremolo::new(format);
        let chorus = Chorus::new(format);
        let compressor = Compressor::new(format);

        let controls = ChainControls {
            echo: echo.control(),
            reverb: reverb.control(),
            tremolo: tremolo.control(),
            chorus: chorus.control(),
            compressor: compressor.control(),
        };

        let stages: Vec<Box<dyn EffectStage>> = vec![
            Box::new(echo),
            Box::new(reverb),
            Box::new(tremolo),
            Box::new(chorus),
            Box::new(compressor),
        ];

        (Self { source, stages, format }, controls)
    }

    /// The chain's fixed stream format
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Pull up to `max_frames` frames through the chain
    ///
    /// Returns the frame count the source produced (0 = end of stream).
    /// Every stage processes exactly that region in place.
    pub fn pull(&mut self, block: &mut SampleBlock, max_frames: usize) -> Result<usize, ChainError> {
        if block.channels() != self.format.channels {
            return Err(ChainError::FormatMismatch {
                block: block.channels(),
                format: self.format.channels,
            });
        }

        let max_frames = max_frames.min(block.capacity_frames());
        let frames = self.source.read(block, max_frames)?;
        debug_assert!(frames <= max_frames);

        for stage in &mut self.stages {
            stage.process(block.samples_mut(), frames);
        }
        Ok(frames)
    }

    /// Clear the time-domain state of every stage
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}
