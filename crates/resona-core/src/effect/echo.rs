//! Multi-tap echo stage
//!
//! Single fixed-length delay line with a feedback path. The wet mix scales
//! linearly with the stage level; feedback is constant, so higher levels
//! make the echo louder rather than longer.

use std::sync::Arc;

use crate::effect::delay_line::DelayLine;
use crate::effect::{EffectStage, ParamSlot, StageControl, StageParams, ACTIVATION_EPSILON};
use crate::types::AudioFormat;

/// Echo delay in seconds
const DELAY_SECONDS: f32 = 0.35;
/// Portion of the delayed signal fed back into the line
const FEEDBACK: f32 = 0.4;
/// Wet mix at full level
const MAX_MIX: f32 = 0.4;

pub struct MultiTapEcho {
    slot: Arc<ParamSlot>,
    line: DelayLine,
}

impl MultiTapEcho {
    pub fn new(format: AudioFormat) -> Self {
        Self::with_line_samples(format.samples_for_seconds(DELAY_SECONDS).max(1))
    }

    /// Construct with an explicit line length in interleaved samples
    pub(crate) fn with_line_samples(len: usize) -> Self {
        Self {
            slot: Arc::new(ParamSlot::new(StageParams::default())),
            line: DelayLine::new(len),
        }
    }

    /// Wet mix for a level in [0, 1]
    fn mix_for(level: f32) -> f32 {
        level * MAX_MIX
    }
}

impl EffectStage for MultiTapEcho {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn control(&self) -> StageControl {
        StageControl::new(Arc::clone(&self.slot))
    }

    fn process(&mut self, samples: &mut [f32], frames: usize) -> usize {
        let params = self.slot.load();
        let mix = if params.enabled { Self::mix_for(params.level) } else { 0.0 };
        if !params.enabled || mix <= ACTIVATION_EPSILON {
            return frames;
        }

        for s in samples.iter_mut() {
            let delayed = self.line.tap(0);
            let input = *s;
            *s = input * (1.0 - mix) + delayed * mix;
            self.line.push(input + delayed * FEEDBACK);
        }
        frames
    }

    fn reset(&mut self) {
        self.line.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process_all(echo: &mut MultiTapEcho, samples: &mut [f32]) {
        let frames = samples.len();
        let processed = echo.process(samples, frames);
        assert_eq!(processed, frames);
    }

    #[test]
    fn disabled_is_bit_exact_identity() {
        let mut echo = MultiTapEcho::with_line_samples(16);
        let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.13).sin()).collect();
        let mut samples = input.clone();
        process_all(&mut echo, &mut samples);
        assert_eq!(samples, input);
    }

    #[test]
    fn below_epsilon_level_is_passthrough() {
        let mut echo = MultiTapEcho::with_line_samples(16);
        echo.control().configure(true, 0.001);
        let input = vec![0.5; 32];
        let mut samples = input.clone();
        process_all(&mut echo, &mut samples);
        assert_eq!(samples, input);
    }

    #[test]
    fn impulse_echoes_after_one_line_length() {
        let mut echo = MultiTapEcho::with_line_samples(4);
        echo.control().configure(true, 1.0);

        let mut samples = vec![0.0f32; 13];
        samples[0] = 1.0;
        process_all(&mut echo, &mut samples);

        // Dry portion of the impulse
        assert!((samples[0] - 0.6).abs() < 1e-6);
        assert_eq!(&samples[1..4], &[0.0, 0.0, 0.0]);
        // First echo: unit impulse through the 0.4 wet mix
        assert!((samples[4] - 0.4).abs() < 1e-6);
        // Second echo scaled by feedback
        assert!((samples[8] - 0.4 * FEEDBACK).abs() < 1e-6);
        assert!((samples[12] - 0.4 * FEEDBACK * FEEDBACK).abs() < 1e-6);
    }

    #[test]
    fn disabled_freezes_delay_state() {
        let mut echo = MultiTapEcho::with_line_samples(4);
        echo.control().configure(true, 1.0);

        // Charge the line
        let mut samples = vec![1.0f32; 4];
        process_all(&mut echo, &mut samples);

        // A disabled pass must not consume or advance the stored echo
        echo.control().configure(false, 1.0);
        let mut silence = vec![0.0f32; 4];
        process_all(&mut echo, &mut silence);
        assert_eq!(silence, vec![0.0; 4]);

        // Re-enabled: the charged line plays back as if never paused
        echo.control().configure(true, 1.0);
        let mut tail = vec![0.0f32; 4];
        process_all(&mut echo, &mut tail);
        assert!(tail.iter().any(|&s| s.abs() > 0.1), "stored echo lost: {tail:?}");
    }

    #[test]
    fn zero_frames_is_a_no_op() {
        let mut echo = MultiTapEcho::with_line_samples(8);
        echo.control().configure(true, 1.0);
        assert_eq!(echo.process(&mut [], 0), 0);
    }

    #[test]
    fn reset_silences_the_tail() {
        let mut echo = MultiTapEcho::with_line_samples(4);
        echo.control().configure(true, 1.0);
        let mut samples = vec![1.0f32; 8];
        process_all(&mut echo, &mut samples);

        echo.reset();
        let mut silence = vec![0.0f32; 8];
        process_all(&mut echo, &mut silence);
        assert_eq!(silence, vec![0.0; 8]);
    }
}
