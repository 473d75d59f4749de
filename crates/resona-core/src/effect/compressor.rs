//! Compressor stage
//!
//! Memoryless soft limiter: samples whose magnitude exceeds the threshold
//! keep only 30% of the overshoot, preserving sign. Higher stage levels
//! raise the threshold, so the effect softens as the level goes up. No
//! attack or release smoothing and no state to reset.

use std::sync::Arc;

use crate::effect::{EffectStage, ParamSlot, StageControl, StageParams};
use crate::types::AudioFormat;

/// Threshold floor when enabled
const MIN_THRESHOLD: f32 = 0.5;
/// Additional threshold at full level
const THRESHOLD_RANGE: f32 = 0.4;
/// Fraction of the overshoot kept above the threshold
const RATIO: f32 = 0.3;
/// Thresholds at or above this are treated as bypass
const BYPASS_THRESHOLD: f32 = 0.99;

pub struct Compressor {
    slot: Arc<ParamSlot>,
}

impl Compressor {
    pub fn new(_format: AudioFormat) -> Self {
        Self {
            slot: Arc::new(ParamSlot::new(StageParams::default())),
        }
    }

    /// Limiting threshold for a level in [0, 1]
    fn threshold_for(level: f32) -> f32 {
        MIN_THRESHOLD + level * THRESHOLD_RANGE
    }
}

impl EffectStage for Compressor {
    fn name(&self) -> &'static str {
        "compressor"
    }

    fn control(&self) -> StageControl {
        StageControl::new(Arc::clone(&self.slot))
    }

    fn process(&mut self, samples: &mut [f32], frames: usize) -> usize {
        let params = self.slot.load();
        let threshold = if params.enabled { Self::threshold_for(params.level) } else { 1.0 };
        if !params.enabled || threshold >= BYPASS_THRESHOLD {
            return frames;
        }

        for s in samples.iter_mut() {
            let magnitude = s.abs();
            if magnitude > threshold {
                *s = s.signum() * (threshold + (magnitude - threshold) * RATIO);
            }
        }
        frames
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn format() -> AudioFormat {
        AudioFormat::new(48000, 2)
    }

    #[test]
    fn disabled_is_bit_exact_identity() {
        let mut comp = Compressor::new(format());
        let input = vec![0.1, -0.9, 1.5, -2.0, 0.0];
        let mut samples = input.clone();
        comp.process(&mut samples, 5);
        assert_eq!(samples, input);
    }

    #[test]
    fn below_threshold_passes_bit_exact() {
        let mut comp = Compressor::new(format());
        comp.control().configure(true, 0.0); // threshold 0.5

        let input = vec![0.49, -0.5, 0.25, -0.1, 0.0];
        let mut samples = input.clone();
        comp.process(&mut samples, 5);
        assert_eq!(samples, input);
    }

    #[test]
    fn overshoot_is_reduced_and_sign_preserved() {
        let mut comp = Compressor::new(format());
        comp.control().configure(true, 0.0); // threshold 0.5

        let mut samples = vec![1.0, -1.0, 0.7, -0.7];
        comp.process(&mut samples, 4);

        assert_relative_eq!(samples[0], 0.5 + 0.5 * RATIO, epsilon = 1e-6);
        assert_relative_eq!(samples[1], -(0.5 + 0.5 * RATIO), epsilon = 1e-6);
        assert_relative_eq!(samples[2], 0.5 + 0.2 * RATIO, epsilon = 1e-6);
        assert_relative_eq!(samples[3], -(0.5 + 0.2 * RATIO), epsilon = 1e-6);

        // Output magnitude never exceeds input magnitude
        assert!(samples[0] < 1.0 && samples[1] > -1.0);
    }

    #[test]
    fn threshold_tracks_level() {
        let mut comp = Compressor::new(format());
        comp.control().configure(true, 0.5); // threshold 0.7

        let mut samples = vec![0.69, 0.8];
        comp.process(&mut samples, 2);

        assert_eq!(samples[0], 0.69);
        let expected = Compressor::threshold_for(0.5) + (0.8 - Compressor::threshold_for(0.5)) * RATIO;
        assert_relative_eq!(samples[1], expected, epsilon = 1e-6);
    }
}
