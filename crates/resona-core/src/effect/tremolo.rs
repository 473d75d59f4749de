//! Tremolo stage
//!
//! Sinusoidal amplitude modulation. Both depth and rate follow the stage
//! level, so turning it up makes the wobble deeper and faster at once. The
//! modulator phase is a running sample index that only advances while the
//! stage is active, so the wobble resumes where it paused.

use std::f32::consts::TAU;
use std::sync::Arc;

use crate::effect::{EffectStage, ParamSlot, StageControl, StageParams, ACTIVATION_EPSILON};
use crate::types::AudioFormat;

/// Modulation depth floor when enabled
const MIN_DEPTH: f32 = 0.3;
/// Additional depth at full level
const DEPTH_RANGE: f32 = 0.4;
/// Modulation rate floor in Hz
const MIN_RATE_HZ: f32 = 2.0;
/// Additional rate at full level in Hz
const RATE_RANGE_HZ: f32 = 4.0;

pub struct Tremolo {
    slot: Arc<ParamSlot>,
    sample_rate: f32,
    sample_index: u64,
}

impl Tremolo {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            slot: Arc::new(ParamSlot::new(StageParams::default())),
            sample_rate: format.sample_rate as f32,
            sample_index: 0,
        }
    }

    /// Modulation depth for a level in [0, 1]
    fn depth_for(level: f32) -> f32 {
        MIN_DEPTH + level * DEPTH_RANGE
    }

    /// Modulation rate in Hz for a level in [0, 1]
    fn rate_for(level: f32) -> f32 {
        MIN_RATE_HZ + level * RATE_RANGE_HZ
    }
}

impl EffectStage for Tremolo {
    fn name(&self) -> &'static str {
        "tremolo"
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

        let samples_per_cycle = self.sample_rate / Self::rate_for(params.level);
        for s in samples.iter_mut() {
            let phase = self.sample_index as f32 / samples_per_cycle;
            let gain = 1.0 - depth * 0.5 * (1.0 + (TAU * phase).sin());
            *s *= gain;
            self.sample_index += 1;
        }
        frames
    }

    fn reset(&mut self) {
        self.sample_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn format() -> AudioFormat {
        AudioFormat::new(48000, 1)
    }

    #[test]
    fn disabled_is_bit_exact_identity() {
        let mut trem = Tremolo::new(format());
        let input: Vec<f32> = (0..256).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut samples = input.clone();
        trem.process(&mut samples, 256);
        assert_eq!(samples, input);
    }

    /// The modulator averages to 1 - depth/2 over whole cycles, so a DC
    /// input comes out attenuated by exactly that factor.
    #[test]
    fn average_gain_matches_depth() {
        let mut trem = Tremolo::new(format());
        trem.control().configure(true, 0.5);

        let depth = Tremolo::depth_for(0.5);
        let rate = Tremolo::rate_for(0.5);
        // Enough samples for an exact number of modulation cycles
        let cycles = 8;
        let n = (48000.0 / rate * cycles as f32) as usize;

        let mut samples = vec![1.0f32; n];
        trem.process(&mut samples, n);

        let mean = samples.iter().sum::<f32>() / n as f32;
        assert_relative_eq!(mean, 1.0 - depth * 0.5, epsilon = 1e-3);
    }

    #[test]
    fn gain_stays_within_modulation_bounds() {
        let mut trem = Tremolo::new(format());
        trem.control().configure(true, 1.0);

        let depth = Tremolo::depth_for(1.0);
        let mut samples = vec![1.0f32; 48000];
        trem.process(&mut samples, 48000);

        for &s in &samples {
            assert!(s <= 1.0 + 1e-6 && s >= 1.0 - depth - 1e-6, "gain out of bounds: {s}");
        }
    }

    /// Phase must not advance across disabled blocks.
    #[test]
    fn phase_pauses_while_disabled() {
        let mut running = Tremolo::new(format());
        running.control().configure(true, 0.0);
        let mut paused = Tremolo::new(format());
        paused.control().configure(true, 0.0);

        let mut a = vec![1.0f32; 512];
        running.process(&mut a, 512);

        let mut b = vec![1.0f32; 256];
        paused.process(&mut b, 256);
        paused.control().configure(false, 0.0);
        let mut gap = vec![1.0f32; 1000];
        paused.process(&mut gap, 1000);
        paused.control().configure(true, 0.0);
        let mut c = vec![1.0f32; 256];
        paused.process(&mut c, 256);

        assert_eq!(&a[256..], &c[..]);
    }

    #[test]
    fn reset_rewinds_the_phase() {
        let mut trem = Tremolo::new(format());
        trem.control().configure(true, 0.3);

        let mut first = vec![1.0f32; 128];
        trem.process(&mut first, 128);

        trem.reset();
        let mut second = vec![1.0f32; 128];
        trem.process(&mut second, 128);
        assert_eq!(first, second);
    }
}
