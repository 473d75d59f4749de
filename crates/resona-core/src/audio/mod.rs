//! Audio device layer
//!
//! CPAL-backed output and capture streams around the DSP core. The output
//! stream's callback owns an [`crate::effect::EffectChain`] and pulls it
//! directly; the capture stream's callback owns a
//! [`crate::spectrum::SpectrumAnalyzer`] and ships completed frames out
//! over a bounded channel. Control crosses into the callbacks only through
//! lock-free queues and atomics.

pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod output;

pub use capture::{start_capture, CaptureHandle};
pub use config::{BufferSize, CaptureConfig, PlaybackConfig};
pub use error::{AudioError, AudioResult};
pub use output::{start_playback, PlaybackHandle, PlayerCommand};
