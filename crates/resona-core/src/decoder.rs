//! File decoding via Symphonia
//!
//! [`FileSource`] wraps a probed container and decoder behind the
//! [`SampleSource`] pull interface. Decoding is incremental: each `read`
//! decodes just enough packets to satisfy the request, holding any surplus
//! interleaved samples for the next call. Corrupt packets are skipped with
//! a warning; I/O failures mid-stream are fatal, matching the source
//! contract.

use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::source::{DecodeError, SampleSource};
use crate::types::{AudioFormat, SampleBlock};

/// Streaming decoder for a single audio file
pub struct FileSource {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    format: AudioFormat,
    duration_frames: Option<u64>,
    sample_buf: Option<SampleBuffer<f32>>,
    /// Decoded interleaved samples not yet handed out
    pending: Vec<f32>,
    finished: bool,
    path: PathBuf,
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource")
            .field("path", &self.path)
            .field("track_id", &self.track_id)
            .field("format", &self.format)
            .field("duration_frames", &self.duration_frames)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl FileSource {
    /// Probe and open an audio file
    ///
    /// Unsupported or unreadable files fail here; a successfully opened
    /// source has a known, fixed format.
    pub fn open(path: &Path) -> Result<Self, DecodeError> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| DecodeError::Open { path: path.to_path_buf(), source: e })?;
        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DecodeError::NoAudioTrack { path: path.to_path_buf() })?;
        let track_id = track.id;

        let sample_rate = track.codec_params.sample_rate.ok_or(DecodeError::MissingParameters {
            path: path.to_path_buf(),
            missing: "sample rate",
        })?;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or(DecodeError::MissingParameters {
                path: path.to_path_buf(),
                missing: "channel layout",
            })?;
        let duration_frames = track.codec_params.n_frames;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::UnsupportedCodec { path: path.to_path_buf(), source: e })?;

        log::info!(
            "opened {}: {} Hz, {} channel(s)",
            path.display(),
            sample_rate,
            channels
        );

        Ok(Self {
            reader,
            decoder,
            track_id,
            format: AudioFormat::new(sample_rate, channels),
            duration_frames,
            sample_buf: None,
            pending: Vec::new(),
            finished: false,
            path: path.to_path_buf(),
        })
    }

    /// Total track length in frames, when the container declares it
    pub fn duration_frames(&self) -> Option<u64> {
        self.duration_frames
    }

    /// The file this source was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode packets until at least `needed` interleaved samples are
    /// pending or the stream ends
    fn decode_ahead(&mut self, needed: usize) -> Result<(), DecodeError> {
        while self.pending.len() < needed && !self.finished {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    self.finished = true;
                    return Err(DecodeError::Stream(e));
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // Recoverable per the codec contract: drop the packet
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("skipping corrupt packet in {}: {}", self.path.display(), e);
                    continue;
                }
                Err(e) => {
                    self.finished = true;
                    return Err(DecodeError::Stream(e));
                }
            };

            if self.sample_buf.is_none() {
                let spec = *decoded.spec();
                let duration = decoded.capacity() as u64;
                self.sample_buf = Some(SampleBuffer::new(duration, spec));
            }
            if let Some(ref mut buf) = self.sample_buf {
                buf.copy_interleaved_ref(decoded);
                self.pending.extend_from_slice(buf.samples());
            }
        }
        Ok(())
    }
}

impl SampleSource for FileSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, block: &mut SampleBlock, max_frames: usize) -> Result<usize, DecodeError> {
        let channels = self.format.channels as usize;
        let wanted = max_frames.min(block.capacity_frames()) * channels;

        self.decode_ahead(wanted)?;

        let take = wanted.min(self.pending.len());
        debug_assert_eq!(take % channels, 0, "decoder produced a partial frame");
        block.buffer_mut()[..take].copy_from_slice(&self.pending[..take]);
        self.pending.drain(..take);

        let frames = take / channels;
        block.set_frames(frames);
        Ok(frames)
    }
}
