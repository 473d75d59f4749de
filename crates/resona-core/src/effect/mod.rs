//! Effect stage system
//!
//! Each stage is an in-place transform over interleaved f32 samples with two
//! externally controlled parameters: an enable switch and a level in [0, 1].
//! Parameters are published from a control thread through a single packed
//! atomic word, so the audio thread always observes the enable bit and the
//! level from the same update. Stages never allocate, lock, or fail inside
//! `process`.
//!
//! How a stage maps its level onto DSP coefficients is the stage's own
//! business; each one names its mapping as a dedicated function so the
//! curve is testable in isolation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

mod chain;
mod chorus;
mod compressor;
mod delay_line;
mod echo;
mod reverb;
mod tremolo;

pub use chain::{ChainControls, ChainError, EffectChain};
pub use chorus::Chorus;
pub use compressor::Compressor;
pub use delay_line::DelayLine;
pub use echo::MultiTapEcho;
pub use reverb::Reverb;
pub use tremolo::Tremolo;

/// Levels at or below this leave a stage as a pure passthrough
pub const ACTIVATION_EPSILON: f32 = 0.001;

/// A stage's externally visible parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageParams {
    pub enabled: bool,
    /// Effect intensity in [0, 1]
    pub level: f32,
}

impl Default for StageParams {
    fn default() -> Self {
        Self { enabled: false, level: 0.0 }
    }
}

/// Packed parameter word shared between the control and audio threads
///
/// Layout: bit 32 = enabled, bits 0-31 = level as f32 bits. A single
/// atomic word means the audio thread can never see an enable flag from
/// one update paired with a level from another.
pub(crate) struct ParamSlot(AtomicU64);

const ENABLED_BIT: u64 = 1 << 32;

impl ParamSlot {
    pub(crate) fn new(params: StageParams) -> Self {
        Self(AtomicU64::new(Self::pack(params)))
    }

    fn pack(params: StageParams) -> u64 {
        let mut word = params.level.to_bits() as u64;
        if params.enabled {
            word |= ENABLED_BIT;
        }
        word
    }

    fn unpack(word: u64) -> StageParams {
        StageParams {
            enabled: word & ENABLED_BIT != 0,
            level: f32::from_bits(word as u32),
        }
    }

    pub(crate) fn store(&self, params: StageParams) {
        self.0.store(Self::pack(params), Ordering::Release);
    }

    #[inline]
    pub(crate) fn load(&self) -> StageParams {
        Self::unpack(self.0.load(Ordering::Acquire))
    }
}

/// Cloneable control handle for one stage
///
/// Lives on the UI/control side; `configure` never fails and takes effect
/// at the next processed block. Out-of-range or non-finite levels are
/// clamped here so the audio thread only ever sees valid values.
#[derive(Clone)]
pub struct StageControl {
    slot: Arc<ParamSlot>,
}

impl StageControl {
    pub(crate) fn new(slot: Arc<ParamSlot>) -> Self {
        Self { slot }
    }

    /// Publish new parameters to the audio thread
    pub fn configure(&self, enabled: bool, level: f32) {
        let level = if level.is_finite() {
            level.clamp(0.0, 1.0)
        } else {
            log::warn!("non-finite effect level {level}, clamping to 0");
            0.0
        };
        self.slot.store(StageParams { enabled, level });
    }

    /// Read back the last published parameters
    pub fn params(&self) -> StageParams {
        self.slot.load()
    }
}

/// An in-place effect stage over interleaved samples
///
/// Contract: `samples.len() == frames * channels` for the channel count the
/// stage was constructed with; `process` transforms exactly that region and
/// returns `frames` (1:1, never reorders or buffers). A disabled or
/// below-epsilon stage returns the region bit-exact and leaves its internal
/// state untouched. `frames == 0` is a no-op.
pub trait EffectStage: Send {
    /// Stage name for logging and display
    fn name(&self) -> &'static str;

    /// Control handle for publishing parameter changes
    fn control(&self) -> StageControl;

    /// Process `frames` frames in place, returning the frames processed
    fn process(&mut self, samples: &mut [f32], frames: usize) -> usize;

    /// Clear time-domain state (delay lines, oscillator phase)
    fn reset(&mut self);
}
