//! Spectrum capture stream
//!
//! Opens an input (or loopback, where the platform exposes it as an input)
//! device and runs a [`SpectrumAnalyzer`] inside its callback. Completed
//! frames are cloned onto a bounded channel; when the consumer falls
//! behind, frames are dropped rather than blocking the callback. Device
//! unavailability surfaces once, at start.

use crossbeam::channel::{bounded, Receiver};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream};

use crate::audio::config::CaptureConfig;
use crate::audio::device;
use crate::audio::error::{AudioError, AudioResult};
use crate::spectrum::{DisplayMode, SpectrumAnalyzer, SpectrumFrame};

/// Frames buffered toward the renderer before dropping
const FRAME_QUEUE_CAPACITY: usize = 16;

/// Running capture stream
///
/// Dropping the handle stops the callback; the frame receiver then simply
/// runs dry.
pub struct CaptureHandle {
    _stream: Stream,
    sample_rate: u32,
    channels: u16,
}

impl CaptureHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Start analyzing an input device under the given display mode
pub fn start_capture(
    mode: DisplayMode,
    config: &CaptureConfig,
) -> AudioResult<(CaptureHandle, Receiver<SpectrumFrame>)> {
    let device = device::input_device(config.device.as_deref())?;
    let supported = device
        .default_input_config()
        .map_err(|e| AudioError::CaptureUnavailable(e.to_string()))?;
    if supported.sample_format() != SampleFormat::F32 {
        return Err(AudioError::CaptureUnavailable(format!(
            "input device delivers {:?}, expected f32",
            supported.sample_format()
        )));
    }

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let stream_config = supported.config();

    let mut analyzer = SpectrumAnalyzer::new(mode, sample_rate, channels);
    let (frame_tx, frame_rx) = bounded(FRAME_QUEUE_CAPACITY);

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                analyzer.push(data, |frame| {
                    // Drop-on-full: the renderer catching up is not the
                    // callback's problem
                    let _ = frame_tx.try_send(frame.clone());
                });
            },
            move |err| {
                log::error!("capture stream error: {err}");
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

    log::info!(
        "capture started: {} Hz, {} channel(s), {} point spectrum",
        sample_rate,
        channels,
        mode.output_len()
    );

    Ok((
        CaptureHandle {
            _stream: stream,
            sample_rate,
            channels,
        },
        frame_rx,
    ))
}
