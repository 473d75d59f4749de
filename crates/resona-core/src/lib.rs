//! Resona core library
//!
//! Streaming audio effect engine: a pull-based chain of real-time effect
//! stages over interleaved f32 blocks, a spectrum analyzer for live capture,
//! a symphonia-backed file source, and CPAL output/capture streams.
//!
//! The library splits along the real-time boundary. Everything inside
//! [`effect`] and [`spectrum`] is allocation-free and lock-free once
//! constructed and safe to run inside an audio callback; [`audio`] owns the
//! CPAL streams and the command plumbing that crosses the boundary.

pub mod audio;
pub mod decoder;
pub mod effect;
pub mod source;
pub mod spectrum;
pub mod types;

pub use effect::{ChainControls, EffectChain, EffectStage, StageControl, StageParams};
pub use source::{DecodeError, MemorySource, SampleSource};
pub use spectrum::{DisplayMode, SpectrumAnalyzer, SpectrumFrame};
pub use types::{AudioFormat, Sample, SampleBlock};
