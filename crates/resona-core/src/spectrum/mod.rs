//! Real-time spectrum analyzer
//!
//! Accumulates capture samples into a fixed 1024-point window, Hann-weighted
//! at write time, and runs a forward FFT each time the window fills. Windows
//! never overlap: after each transform the cursor rewinds and the window is
//! cleared, so every capture sample contributes to exactly one frame.
//!
//! The analyzer is thread-confined to the capture callback. It never
//! allocates after construction except when a completed frame is cloned for
//! delivery off the audio thread.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// FFT window length in samples (power of two, required by the transform)
pub const FFT_WINDOW_LEN: usize = 1024;
/// Usable bins: positive frequencies only
pub const SPECTRUM_BINS: usize = FFT_WINDOW_LEN / 2;
/// Magnitude floor applied before the dB conversion, avoids -inf
const MAGNITUDE_FLOOR: f32 = 1e-10;

/// Fraction of zone-warp output positions spent on the low zone
const LEFT_ZONE: f32 = 0.45;
/// Fraction spent on the emphasized center band
const CENTER_ZONE: f32 = 0.10;

/// How transform bins are mapped onto display values
///
/// The two policies are alternate designs, not composable: a frame is
/// produced under exactly one of them and carries it along for the
/// renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayMode {
    /// Index-warped line display: output positions spread across three
    /// zones of the spectrum, with 10% of them packed into the
    /// `center_start..center_end` bin band for extra detail there.
    ZoneWarp {
        points: usize,
        center_start: usize,
        center_end: usize,
    },
    /// Fixed-width bars over an explicit frequency range, bins log-spaced.
    FrequencyBars {
        bars: usize,
        freq_start: f32,
        freq_end: f32,
    },
}

impl DisplayMode {
    /// Default line display: 980 points warped around bins 400..480
    pub fn zone_warp() -> Self {
        DisplayMode::ZoneWarp {
            points: 980,
            center_start: 400,
            center_end: 480,
        }
    }

    /// Default bar display: 64 bars over 40 Hz .. 16 kHz
    pub fn frequency_bars() -> Self {
        DisplayMode::FrequencyBars {
            bars: 64,
            freq_start: 40.0,
            freq_end: 16_000.0,
        }
    }

    /// Number of values in a frame produced under this mode
    pub fn output_len(&self) -> usize {
        match *self {
            DisplayMode::ZoneWarp { points, .. } => points,
            DisplayMode::FrequencyBars { bars, .. } => bars,
        }
    }

    /// dB clamp floor for this mode
    pub fn floor_db(&self) -> f32 {
        match self {
            DisplayMode::ZoneWarp { .. } => -80.0,
            DisplayMode::FrequencyBars { .. } => -60.0,
        }
    }

    /// Exponential smoothing factor (weight of the new frame)
    pub fn smoothing(&self) -> f32 {
        match self {
            DisplayMode::ZoneWarp { .. } => 0.17,
            DisplayMode::FrequencyBars { .. } => 0.35,
        }
    }
}

/// One completed analysis frame: smoothed, clamped dB values in display
/// order, plus the mode they were mapped under
#[derive(Debug, Clone)]
pub struct SpectrumFrame {
    pub values: Vec<f32>,
    pub mode: DisplayMode,
}

/// Zone-warp output position to transform bin
///
/// The first 45% of positions sweep bins below the center band, the next
/// 10% sweep the band itself, the rest sweep up to the top bin. Monotone
/// and clamped to the usable bin range.
fn zone_warp_bin(index: usize, points: usize, center_start: usize, center_end: usize) -> usize {
    debug_assert!(points > 1);
    // A configured band that overruns the usable bins collapses gracefully
    // toward the top instead of wrapping
    let center_end = center_end.min(SPECTRUM_BINS - 1);
    let center_start = center_start.min(center_end);
    let norm = index as f32 / (points - 1) as f32;
    let bin = if norm < LEFT_ZONE {
        (norm / LEFT_ZONE) * center_start as f32
    } else if norm < LEFT_ZONE + CENTER_ZONE {
        let center_norm = (norm - LEFT_ZONE) / CENTER_ZONE;
        center_start as f32 + center_norm * (center_end - center_start) as f32
    } else {
        let right_norm = (norm - LEFT_ZONE - CENTER_ZONE) / (1.0 - LEFT_ZONE - CENTER_ZONE);
        center_end as f32 + right_norm * (SPECTRUM_BINS - 1 - center_end) as f32
    };
    (bin as usize).min(SPECTRUM_BINS - 1)
}

/// Frequency-bar index to transform bin, log-spaced over the range
fn bar_bin(bar: usize, bars: usize, freq_start: f32, freq_end: f32, sample_rate: u32) -> usize {
    let t = if bars > 1 { bar as f32 / (bars - 1) as f32 } else { 0.0 };
    let freq = freq_start * (freq_end / freq_start).powf(t);
    let bin = (freq * FFT_WINDOW_LEN as f32 / sample_rate as f32).round() as usize;
    bin.min(SPECTRUM_BINS - 1)
}

/// Windowing, FFT, mapping and smoothing for one capture stream
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    window: Vec<Complex<f32>>,
    hann: Vec<f32>,
    cursor: usize,
    channels: usize,
    sample_rate: u32,
    /// Raw per-bin dB from the latest transform, before mapping
    bin_db: Vec<f32>,
    /// Smoothed output; doubles as the previous frame for smoothing
    frame: SpectrumFrame,
}

impl SpectrumAnalyzer {
    /// Build an analyzer for interleaved capture at the given format
    pub fn new(mode: DisplayMode, sample_rate: u32, channels: u16) -> Self {
        assert!(channels > 0, "channel count must be positive");

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_WINDOW_LEN);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        // Precomputed Hann coefficients, applied at accumulate time
        let hann: Vec<f32> = (0..FFT_WINDOW_LEN)
            .map(|i| {
                let t = i as f32 / (FFT_WINDOW_LEN - 1) as f32;
                0.5 * (1.0 - (std::f32::consts::TAU * t).cos())
            })
            .collect();

        let frame = SpectrumFrame {
            values: vec![mode.floor_db(); mode.output_len()],
            mode,
        };

        Self {
            fft,
            scratch,
            window: vec![Complex::new(0.0, 0.0); FFT_WINDOW_LEN],
            hann,
            cursor: 0,
            channels: channels as usize,
            sample_rate,
            bin_db: vec![mode.floor_db(); SPECTRUM_BINS],
            frame,
        }
    }

    /// The display mode frames are produced under
    pub fn mode(&self) -> DisplayMode {
        self.frame.mode
    }

    /// Raw (unsmoothed, unclamped-above-floor) dB of one transform bin
    ///
    /// Reflects the most recent completed transform.
    pub fn bin_db(&self, bin: usize) -> f32 {
        self.bin_db[bin]
    }

    /// Feed interleaved capture samples
    ///
    /// Only the first channel of each frame is windowed. `on_frame` runs
    /// once per completed window, on the calling thread, with a borrow of
    /// the new frame; clone it to move it elsewhere.
    pub fn push(&mut self, interleaved: &[f32], mut on_frame: impl FnMut(&SpectrumFrame)) {
        for frame in interleaved.chunks_exact(self.channels) {
            let sample = if frame[0].is_finite() { frame[0] } else { 0.0 };
            self.window[self.cursor] = Complex::new(sample * self.hann[self.cursor], 0.0);
            self.cursor += 1;

            if self.cursor == FFT_WINDOW_LEN {
                self.transform();
                on_frame(&self.frame);
            }
        }
    }

    /// Discard any partially accumulated window and the smoothing history
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.window.fill(Complex::new(0.0, 0.0));
        let floor = self.frame.mode.floor_db();
        self.frame.values.fill(floor);
        self.bin_db.fill(floor);
    }

    /// Transform the filled window and fold it into the smoothed frame
    fn transform(&mut self) {
        self.fft.process_with_scratch(&mut self.window, &mut self.scratch);

        for (bin, value) in self.window[..SPECTRUM_BINS].iter().enumerate() {
            let magnitude = (value.re * value.re + value.im * value.im)
                .sqrt()
                .max(MAGNITUDE_FLOOR);
            self.bin_db[bin] = 20.0 * magnitude.log10();
        }

        let mode = self.frame.mode;
        let floor = mode.floor_db();
        let alpha = mode.smoothing();
        for (i, smoothed) in self.frame.values.iter_mut().enumerate() {
            let bin = match mode {
                DisplayMode::ZoneWarp { points, center_start, center_end } => {
                    zone_warp_bin(i, points, center_start, center_end)
                }
                DisplayMode::FrequencyBars { bars, freq_start, freq_end } => {
                    bar_bin(i, bars, freq_start, freq_end, self.sample_rate)
                }
            };
            let db = self.bin_db[bin].clamp(floor, 0.0);
            *smoothed = *smoothed * (1.0 - alpha) + db * alpha;
        }

        // Non-overlapping windows: start the next one from scratch
        self.window.fill(Complex::new(0.0, 0.0));
        self.cursor = 0;
    }
}
