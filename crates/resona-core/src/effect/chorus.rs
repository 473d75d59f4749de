//! Chorus stage
//!
//! Short delay line read at a position swept by a slow sine LFO. The read
//! offset is quantized to whole samples (no interpolation) and the line
//! stores the raw input, not a feedback mix, so the wet path is always one
//! clean detuned copy.

use std::f32::consts::TAU;
use std::sync::Arc;

use crate::effect::delay_line::DelayLine;
use crate::effect::{EffectStage, ParamSlot, StageControl, StageParams, ACTIVATION_EPSILON};
use crate::types::AudioFormat;

/// Line length in seconds
const DELAY_SECONDS: f32 = 0.04;
/// Sweep rate in Hz
const LFO_RATE_HZ: f32 = 0.25;
/// Sweep depth floor as a fraction of the line when enabled
const MIN_DEPTH: f32 = 0.02;
/// Additional sweep depth at full level
const DEPTH_RANGE: f32 = 0.04;
/// Dry portion of the output
const DRY_GAIN: f32 = 0.8;
/// Wet portion of the output
const WET_GAIN: f32 = 0.2;

pub struct Chorus {
    slot: Arc<ParamSlot>,
    line: DelayLine,
    sample_rate: f32,
    lfo_index: u64,
}

impl Chorus {
    pub fn new(format: AudioFormat) -> Self {
        Self::with_line_samples(format, format.samples_for_seconds(DELAY_SECONDS).max(1))
    }

    pub(crate) fn with_line_samples(format: AudioFormat, len: usize) -> Self {
        Self {
            slot: Arc::new(ParamSlot::new(StageParams::default())),
            line: DelayLine::new(len),
            sample_rate: format.sample_rate as f32,
            lfo_index: 0,
        }
    }

    /// Sweep depth (fraction of the line length) for a level in [0, 1]
    fn depth_for(level: f32) -> f32 {
        MIN_DEPTH + level * DEPTH_RANGE
    }
}

impl EffectStage for Chorus {
    fn name(&self) -> &'static str {
        "chorus"
    }

    fn control(&self) -> StageControl {
        StageControl::new(Arc::clone(&self.slot))
    }

    fn process(&mut self, samples: &mut [f32], frames: usize) -> usize {
        let params = self.slot.load();
        let depth = if params.enabled { Self::depth_for(params.level) } else { 0.0 };
        if !params.enabled || depth <= ACTIVATION_EPSILON {
            return frames;
        }

        let len = self.line.len() as f32;
        for s in samples.iter_mut() {
            let phase = TAU * LFO_RATE_HZ * self.lfo_index as f32 / self.sample_rate;
            let lfo = (1.0 + phase.sin()) / 2.0;
            let delay = (lfo * depth * len) as usize;

            let delayed = self.line.tap(delay);
            let input = *s;
            *s = input * DRY_GAIN + delayed * WET_GAIN;
            self.line.push(input);
            self.lfo_index += 1;
        }
        frames
    }

    fn reset(&mut self) {
        self.line.reset();
        self.lfo_index = 0;
    }
}
