//! Reverb stage
//!
//! Single recirculating delay line with a fixed decay. Unlike the echo, the
//! wet mix has a floor: any enabled level above the activation threshold
//! contributes at least 20% wet signal.

use std::sync::Arc;

use crate::effect::delay_line::DelayLine;
use crate::effect::{EffectStage, ParamSlot, StageControl, StageParams, ACTIVATION_EPSILON};
use crate::types::AudioFormat;

/// Tail delay in seconds
const DELAY_SECONDS: f32 = 0.3;
/// Portion of the delayed signal recirculated into the line
const DECAY: f32 = 0.5;
/// Wet mix floor when enabled
const MIN_WET: f32 = 0.2;
/// Additional wet mix at full level
const WET_RANGE: f32 = 0.3;

pub struct Reverb {
    slot: Arc<ParamSlot>,
    line: DelayLine,
}

impl Reverb {
    pub fn new(format: AudioFormat) -> Self {
        Self::with_line_samples(format.samples_for_seconds(DELAY_SECONDS).max(1))
    }

    pub(crate) fn with_line_samples(len: usize) -> Self {
        Self {
            slot: Arc::new(ParamSlot::new(StageParams::default())),
            line: DelayLine::new(len),
        }
    }

    /// Wet mix for a level in [0, 1]
    fn wet_for(level: f32) -> f32 {
        MIN_WET + level * WET_RANGE
    }
}

impl EffectStage for Reverb {
    fn name(&self) -> &'static str {
        "reverb"
    }

    fn control(&self) -> StageControl {
        StageControl::new(Arc::clone(&self.slot))
    }

    fn process(&mut self, samples: &mut [f32], frames: usize) -> usize {
        let params = self.slot.load();
        let wet = if params.enabled { Self::wet_for(params.level) } else { 0.0 };
        if !params.enabled || wet <= ACTIVATION_EPSILON {
            return frames;
        }

        for s in samples.iter_mut() {
            let delayed = self.line.tap(0);
            let input = *s;
            *s = input * (1.0 - wet) + delayed * wet;
            self.line.push(input + delayed * DECAY);
        }
        frames
    }

    fn reset(&mut self) {
        self.line.reset();
    }
}
