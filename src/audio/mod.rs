// Audio playback module
// Uses Symphonia for decoding and cpal for output

pub mod decoder;
pub mod output;
pub mod worker;

pub use worker::{AudioOutcome, AudioWorker, StreamPosition};

use std::path::{Path, PathBuf};
use thiserror::Error;

use decoder::AudioDecoder;
use output::AudioOutput;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to open {path}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("cannot seek to frame {requested}: {reason}")]
    Seek { requested: u64, reason: String },
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("audio output failed: {0}")]
    Output(String),
}

/// Native format of a decoded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Interleaved samples plus the stream frame just past them
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub end_frame: u64,
}

/// Decoded PCM, read one buffer at a time
pub trait PcmSource {
    fn spec(&self) -> StreamSpec;

    /// Position the stream so the next buffer starts at `frame`; returns the frame reached
    fn seek(&mut self, frame: u64) -> Result<u64, AudioError>;

    /// `None` once the stream is exhausted
    fn next_buffer(&mut self) -> Result<Option<PcmBuffer>, AudioError>;
}

/// Output device; `write` returns once the whole buffer has been taken
pub trait PcmSink {
    fn write(&mut self, samples: &[f32]) -> Result<(), AudioError>;
}

/// Opens sources and sinks. Both are opened on the audio worker's thread
/// and dropped there when the worker exits.
pub trait AudioBackend: Send + Sync {
    fn open_source(&self, path: &Path) -> Result<Box<dyn PcmSource>, AudioError>;
    fn open_sink(&self, spec: StreamSpec) -> Result<Box<dyn PcmSink>, AudioError>;
}

/// Symphonia decoding into the default cpal output device
pub struct DeviceBackend;

impl AudioBackend for DeviceBackend {
    fn open_source(&self, path: &Path) -> Result<Box<dyn PcmSource>, AudioError> {
        Ok(Box::new(AudioDecoder::open(path)?))
    }

    fn open_sink(&self, spec: StreamSpec) -> Result<Box<dyn PcmSink>, AudioError> {
        Ok(Box::new(AudioOutput::open(spec)?))
    }
}
