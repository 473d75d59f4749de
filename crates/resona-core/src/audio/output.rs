//! Playback output stream
//!
//! Builds a CPAL output stream whose callback owns the [`EffectChain`] and
//! a preallocated scratch block. Transport commands arrive over a lock-free
//! ring and are applied at block boundaries; position and end-of-stream
//! state flow back to the control thread through atomics. The handle owns
//! the stream, so dropping it stops the callback before anything it used is
//! freed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig};

use crate::audio::config::{
    frames_for_latency, latency_ms, BufferSize, PlaybackConfig, DEFAULT_BUFFER_SIZE,
    MAX_BUFFER_SIZE,
};
use crate::audio::device;
use crate::audio::error::{AudioError, AudioResult};
use crate::effect::EffectChain;
use crate::types::SampleBlock;

/// Transport commands from the control thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Pause,
    Resume,
    Stop,
}

/// Command queue capacity; commands are rare, this never fills in practice
const COMMAND_QUEUE_CAPACITY: usize = 64;

fn command_channel() -> (rtrb::Producer<PlayerCommand>, rtrb::Consumer<PlayerCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}

/// State the callback publishes for the control thread
struct PlaybackShared {
    /// Cleared while paused or stopped
    playing: AtomicBool,
    /// Source exhausted or failed; the stream keeps running on silence
    finished: AtomicBool,
    /// A source read failed mid-stream
    failed: AtomicBool,
    frames_played: AtomicU64,
}

/// Running playback stream
///
/// Field order matters: the stream is declared first so teardown stops the
/// callback before the rest of the handle goes away.
pub struct PlaybackHandle {
    _stream: Stream,
    commands: rtrb::Producer<PlayerCommand>,
    shared: Arc<PlaybackShared>,
    sample_rate: u32,
    buffer_frames: u32,
}

impl PlaybackHandle {
    pub fn pause(&mut self) {
        let _ = self.commands.push(PlayerCommand::Pause);
    }

    pub fn resume(&mut self) {
        let _ = self.commands.push(PlayerCommand::Resume);
    }

    /// Stop pulling from the source; the stream plays silence until dropped
    pub fn stop(&mut self) {
        let _ = self.commands.push(PlayerCommand::Stop);
    }

    /// True once the source has been exhausted (or has failed)
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    /// True if playback ended because a source read failed
    pub fn has_failed(&self) -> bool {
        self.shared.failed.load(Ordering::Acquire)
    }

    /// Frames delivered to the device so far
    pub fn position_frames(&self) -> u64 {
        self.shared.frames_played.load(Ordering::Relaxed)
    }

    pub fn position_seconds(&self) -> f64 {
        self.position_frames() as f64 / self.sample_rate as f64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Output latency implied by the negotiated buffer size
    pub fn latency_ms(&self) -> f32 {
        latency_ms(self.buffer_frames, self.sample_rate)
    }
}

/// Everything the output callback owns
struct PlaybackState {
    chain: EffectChain,
    block: SampleBlock,
    command_rx: rtrb::Consumer<PlayerCommand>,
    shared: Arc<PlaybackShared>,
    stopped: bool,
}

impl PlaybackState {
    /// Drain pending transport commands (lock-free, block boundary only)
    fn apply_commands(&mut self) {
        while let Ok(command) = self.command_rx.pop() {
            match command {
                PlayerCommand::Pause => self.shared.playing.store(false, Ordering::Release),
                PlayerCommand::Resume => {
                    if !self.stopped {
                        self.shared.playing.store(true, Ordering::Release);
                    }
                }
                PlayerCommand::Stop => {
                    self.stopped = true;
                    self.shared.playing.store(false, Ordering::Release);
                    self.shared.finished.store(true, Ordering::Release);
                }
            }
        }
    }

    /// Fill one device buffer of interleaved output
    fn render(&mut self, data: &mut [f32], out_channels: usize) {
        self.apply_commands();

        let frames_wanted = data.len() / out_channels;
        if self.stopped
            || !self.shared.playing.load(Ordering::Acquire)
            || self.shared.finished.load(Ordering::Acquire)
        {
            data.fill(0.0);
            return;
        }

        let src_channels = self.chain.format().channels as usize;
        let mut filled = 0;
        while filled < frames_wanted {
            let want = (frames_wanted - filled).min(MAX_BUFFER_SIZE);
            match self.chain.pull(&mut self.block, want) {
                Ok(0) => {
                    self.shared.finished.store(true, Ordering::Release);
                    break;
                }
                Ok(frames) => {
                    let produced = self.block.samples();
                    let out = &mut data[filled * out_channels..(filled + frames) * out_channels];
                    for (i, frame) in out.chunks_mut(out_channels).enumerate() {
                        let src = &produced[i * src_channels..(i + 1) * src_channels];
                        frame[0] = src[0];
                        if out_channels > 1 {
                            frame[1] = if src_channels > 1 { src[1] } else { src[0] };
                        }
                        for ch in frame.iter_mut().skip(2) {
                            *ch = 0.0;
                        }
                    }
                    filled += frames;
                }
                Err(e) => {
                    log::error!("source read failed, stopping playback: {e}");
                    self.shared.failed.store(true, Ordering::Release);
                    self.shared.finished.store(true, Ordering::Release);
                    break;
                }
            }
        }

        // Underrun or end of stream: pad with silence, never stale data
        data[filled * out_channels..].fill(0.0);
        self.shared
            .frames_played
            .fetch_add(filled as u64, Ordering::Relaxed);
    }
}

/// Pick the best supported output configuration and buffer size
fn get_output_config(
    device: &cpal::Device,
    config: &PlaybackConfig,
    source_rate: u32,
) -> AudioResult<(cpal::SupportedStreamConfig, u32)> {
    let supported: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();
    if supported.is_empty() {
        return Err(AudioError::ConfigError(
            "no supported output configurations".to_string(),
        ));
    }

    // Follow the source rate unless the caller overrides it; matching the
    // source avoids pitch shift since there is no resampler in this path
    let target_rate = config.sample_rate.unwrap_or(source_rate);

    let best = supported
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.channels() >= 2)
        .find(|c| target_rate >= c.min_sample_rate().0 && target_rate <= c.max_sample_rate().0)
        .or_else(|| supported.iter().find(|c| c.sample_format() == SampleFormat::F32))
        .ok_or_else(|| {
            AudioError::ConfigError("device offers no f32 output configuration".to_string())
        })?;

    let sample_rate = if target_rate >= best.min_sample_rate().0
        && target_rate <= best.max_sample_rate().0
    {
        cpal::SampleRate(target_rate)
    } else {
        let fallback = best.max_sample_rate();
        log::warn!(
            "device does not support {target_rate} Hz, using {} Hz (playback will be pitch-shifted)",
            fallback.0
        );
        fallback
    };
    let stream_config = best.clone().with_sample_rate(sample_rate);

    let buffer_frames = match config.buffer_size {
        BufferSize::Default => match config.latency_hint_ms {
            Some(hint) => frames_for_latency(hint, sample_rate.0),
            None => DEFAULT_BUFFER_SIZE,
        },
        BufferSize::Fixed(frames) => frames.clamp(64, MAX_BUFFER_SIZE as u32),
        BufferSize::LowLatency => 256,
    };

    Ok((stream_config, buffer_frames))
}

/// Start playing a chain on an output device
///
/// The chain (and the source inside it) moves into the audio callback;
/// keep the [`ChainControls`](crate::effect::ChainControls) from building
/// it to adjust effects while it plays.
pub fn start_playback(chain: EffectChain, config: &PlaybackConfig) -> AudioResult<PlaybackHandle> {
    let device = device::output_device(config.device.as_deref())?;
    let source_format = chain.format();
    let (supported, buffer_frames) = get_output_config(&device, config, source_format.sample_rate)?;

    let sample_rate = supported.sample_rate().0;
    let out_channels = supported.channels() as usize;
    if sample_rate != source_format.sample_rate {
        log::warn!(
            "source is {} Hz but device runs at {} Hz",
            source_format.sample_rate,
            sample_rate
        );
    }

    let stream_config = StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size: CpalBufferSize::Fixed(buffer_frames),
    };

    let (command_tx, command_rx) = command_channel();
    let shared = Arc::new(PlaybackShared {
        playing: AtomicBool::new(true),
        finished: AtomicBool::new(false),
        failed: AtomicBool::new(false),
        frames_played: AtomicU64::new(0),
    });

    let mut state = PlaybackState {
        block: SampleBlock::new(MAX_BUFFER_SIZE, source_format.channels),
        chain,
        command_rx,
        shared: Arc::clone(&shared),
        stopped: false,
    };

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                state.render(data, out_channels);
            },
            move |err| {
                log::error!("output stream error: {err}");
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

    log::info!(
        "playback started: {} Hz, {} channel(s), {} frame buffer ({:.1} ms)",
        sample_rate,
        out_channels,
        buffer_frames,
        latency_ms(buffer_frames, sample_rate)
    );

    Ok(PlaybackHandle {
        _stream: stream,
        commands: command_tx,
        shared,
        sample_rate,
        buffer_frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::types::AudioFormat;

    fn test_state(samples: Vec<f32>, channels: u16) -> (PlaybackState, Arc<PlaybackShared>) {
        let format = AudioFormat::new(48000, channels);
        let (chain, _controls) = EffectChain::new(Box::new(MemorySource::new(samples, format)));
        let (_tx, command_rx) = command_channel();
        let shared = Arc::new(PlaybackShared {
            playing: AtomicBool::new(true),
            finished: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            frames_played: AtomicU64::new(0),
        });
        let state = PlaybackState {
            block: SampleBlock::new(MAX_BUFFER_SIZE, channels),
            chain,
            command_rx,
            shared: Arc::clone(&shared),
            stopped: false,
        };
        (state, shared)
    }

    #[test]
    fn render_copies_stereo_frames_through() {
        let (mut state, shared) = test_state(vec![0.1, 0.2, 0.3, 0.4], 2);
        let mut data = vec![9.0f32; 8];
        state.render(&mut data, 2);

        assert_eq!(&data[..4], &[0.1, 0.2, 0.3, 0.4]);
        // Source ended mid-buffer: remainder is silence, not stale data
        assert_eq!(&data[4..], &[0.0; 4]);
        assert!(shared.finished.load(Ordering::Acquire));
        assert_eq!(shared.frames_played.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn render_upmixes_mono_to_both_channels() {
        let (mut state, _shared) = test_state(vec![0.5, -0.5], 1);
        let mut data = vec![0.0f32; 4];
        state.render(&mut data, 2);
        assert_eq!(data, [0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn render_zeroes_extra_device_channels() {
        let (mut state, _shared) = test_state(vec![0.1, 0.2, 0.3, 0.4], 2);
        let mut data = vec![9.0f32; 8];
        state.render(&mut data, 4);
        assert_eq!(&data[..4], &[0.1, 0.2, 0.0, 0.0]);
        assert_eq!(&data[4..], &[0.3, 0.4, 0.0, 0.0]);
    }

    #[test]
    fn finished_stream_renders_silence() {
        let (mut state, shared) = test_state(vec![0.5; 4], 2);
        let mut data = vec![1.0f32; 4];
        state.render(&mut data, 2);
        assert!(!shared.finished.load(Ordering::Acquire));

        // Exhaust the source, then render again
        let mut rest = vec![1.0f32; 16];
        state.render(&mut rest, 2);
        assert!(shared.finished.load(Ordering::Acquire));

        let mut after = vec![1.0f32; 4];
        state.render(&mut after, 2);
        assert_eq!(after, [0.0; 4]);
    }

    #[test]
    fn commands_gate_rendering() {
        let format = AudioFormat::new(48000, 1);
        let (chain, _controls) =
            EffectChain::new(Box::new(MemorySource::new(vec![0.5; 64], format)));
        let (mut tx, command_rx) = command_channel();
        let shared = Arc::new(PlaybackShared {
            playing: AtomicBool::new(true),
            finished: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            frames_played: AtomicU64::new(0),
        });
        let mut state = PlaybackState {
            block: SampleBlock::new(MAX_BUFFER_SIZE, 1),
            chain,
            command_rx,
            shared: Arc::clone(&shared),
            stopped: false,
        };

        tx.push(PlayerCommand::Pause).unwrap();
        let mut data = vec![1.0f32; 8];
        state.render(&mut data, 1);
        assert_eq!(data, [0.0; 8]);
        assert_eq!(shared.frames_played.load(Ordering::Relaxed), 0);

        tx.push(PlayerCommand::Resume).unwrap();
        state.render(&mut data, 1);
        assert_eq!(data, [0.5; 8]);

        // Stop is final: a later resume must not restart the source
        tx.push(PlayerCommand::Stop).unwrap();
        tx.push(PlayerCommand::Resume).unwrap();
        state.render(&mut data, 1);
        assert_eq!(data, [0.0; 8]);
        assert!(shared.finished.load(Ordering::Acquire));
    }
}
