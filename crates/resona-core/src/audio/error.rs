//! Audio device error types

use thiserror::Error;

/// Errors from setting up or running the audio device layer
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoOutputDevice,

    #[error("no audio input device available")]
    NoInputDevice,

    #[error("audio device '{0}' not found")]
    DeviceNotFound(String),

    #[error("audio configuration error: {0}")]
    ConfigError(String),

    #[error("capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("failed to build audio stream: {0}")]
    StreamBuildError(String),

    #[error("failed to start audio stream: {0}")]
    StreamPlayError(String),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
