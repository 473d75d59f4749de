//! Stream configuration

/// Maximum output buffer size in frames; callback scratch blocks are
/// preallocated to this
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Default output buffer size in frames
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Output buffer sizing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferSize {
    /// Let the backend pick a safe default
    #[default]
    Default,
    /// Request a specific size in frames (clamped to sane bounds)
    Fixed(u32),
    /// Prioritize responsiveness over underrun headroom
    LowLatency,
}

/// Playback stream configuration
///
/// Plain data with defaults; nothing here persists anywhere.
#[derive(Debug, Clone, Default)]
pub struct PlaybackConfig {
    /// Output device by name; `None` for the system default
    pub device: Option<String>,
    /// Preferred sample rate; `None` follows the source
    pub sample_rate: Option<u32>,
    pub buffer_size: BufferSize,
    /// Desired output latency; translated to a buffer size when
    /// `buffer_size` is `Default`
    pub latency_hint_ms: Option<f32>,
}

impl PlaybackConfig {
    pub fn with_device(mut self, name: impl Into<String>) -> Self {
        self.device = Some(name.into());
        self
    }

    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    pub fn with_buffer_size(mut self, size: BufferSize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_latency_hint_ms(mut self, ms: f32) -> Self {
        self.latency_hint_ms = Some(ms);
        self
    }
}

/// Capture stream configuration
#[derive(Debug, Clone, Default)]
pub struct CaptureConfig {
    /// Input device by name; `None` for the system default
    pub device: Option<String>,
}

impl CaptureConfig {
    pub fn with_device(mut self, name: impl Into<String>) -> Self {
        self.device = Some(name.into());
        self
    }
}

/// Output latency of a buffer size at a sample rate
pub fn latency_ms(buffer_frames: u32, sample_rate: u32) -> f32 {
    buffer_frames as f32 / sample_rate as f32 * 1000.0
}

/// Buffer size that realizes a latency hint, clamped to sane bounds
pub fn frames_for_latency(hint_ms: f32, sample_rate: u32) -> u32 {
    let frames = (hint_ms / 1000.0 * sample_rate as f32) as u32;
    frames.clamp(64, MAX_BUFFER_SIZE as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_math_round_trips() {
        assert_eq!(latency_ms(480, 48000), 10.0);
        assert_eq!(frames_for_latency(10.0, 48000), 480);
    }

    #[test]
    fn latency_hint_is_clamped() {
        assert_eq!(frames_for_latency(0.01, 48000), 64);
        assert_eq!(frames_for_latency(10_000.0, 48000), MAX_BUFFER_SIZE as u32);
    }

    #[test]
    fn config_builders_compose() {
        let config = PlaybackConfig::default()
            .with_device("pipewire")
            .with_sample_rate(44100)
            .with_buffer_size(BufferSize::Fixed(256))
            .with_latency_hint_ms(150.0);
        assert_eq!(config.device.as_deref(), Some("pipewire"));
        assert_eq!(config.sample_rate, Some(44100));
        assert_eq!(config.buffer_size, BufferSize::Fixed(256));
        assert_eq!(config.latency_hint_ms, Some(150.0));
    }
}
