// Audio worker: streams one song to the output device until it ends or is stopped

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{AudioBackend, AudioError, PcmSource};
use crate::playback::cancel::CancelToken;

/// A frame offset together with the rate needed to turn it into time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamPosition {
    pub frame: u64,
    pub sample_rate: u32,
}

impl StreamPosition {
    pub fn seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame as f64 / self.sample_rate as f64
    }
}

#[derive(Debug)]
pub enum AudioOutcome {
    /// The stream ran out of data
    Ended,
    /// Cancelled; the position is just past the last buffer handed to the device
    Stopped(StreamPosition),
    /// Playback broke; `position` is the last good one if the stream ever opened
    Failed {
        error: AudioError,
        position: Option<StreamPosition>,
    },
}

pub struct AudioWorker {
    backend: Arc<dyn AudioBackend>,
    path: PathBuf,
    start_frame: u64,
    cancel: CancelToken,
}

impl AudioWorker {
    pub fn new(backend: Arc<dyn AudioBackend>, path: PathBuf, start_frame: u64, cancel: CancelToken) -> Self {
        Self {
            backend,
            path,
            start_frame,
            cancel,
        }
    }

    /// Open the song and seek to the start frame, falling back to the top of the stream
    fn open(&self) -> Result<(Box<dyn PcmSource>, u64), AudioError> {
        let mut source = self.backend.open_source(&self.path)?;
        if self.start_frame == 0 {
            return Ok((source, 0));
        }

        match source.seek(self.start_frame) {
            Ok(frame) => Ok((source, frame)),
            Err(e) => {
                warn!("{}; playing from the beginning", e);
                // a failed seek can leave the reader mid-packet, start over cleanly
                Ok((self.backend.open_source(&self.path)?, 0))
            }
        }
    }

    pub fn run(self) -> AudioOutcome {
        let (mut source, start) = match self.open() {
            Ok(opened) => opened,
            Err(error) => {
                return AudioOutcome::Failed {
                    error,
                    position: None,
                }
            }
        };

        let spec = source.spec();
        let at = |frame| StreamPosition {
            frame,
            sample_rate: spec.sample_rate,
        };

        let mut sink = match self.backend.open_sink(spec) {
            Ok(sink) => sink,
            Err(error) => {
                return AudioOutcome::Failed {
                    error,
                    position: Some(at(start)),
                }
            }
        };

        info!(
            path = %self.path.display(),
            frame = start,
            seconds = at(start).seconds(),
            "playing"
        );

        let mut confirmed = start;
        loop {
            if self.cancel.is_cancelled() {
                debug!(frame = confirmed, "audio worker stopped");
                return AudioOutcome::Stopped(at(confirmed));
            }

            let buffer = match source.next_buffer() {
                Ok(Some(buffer)) => buffer,
                Ok(None) => {
                    info!(path = %self.path.display(), "song ended");
                    return AudioOutcome::Ended;
                }
                Err(error) => {
                    return AudioOutcome::Failed {
                        error,
                        position: Some(at(confirmed)),
                    }
                }
            };

            if let Err(error) = sink.write(&buffer.samples) {
                return AudioOutcome::Failed {
                    error,
                    position: Some(at(confirmed)),
                };
            }
            // Handed to the output ring, which can still hold up to ~250 ms unplayed
            confirmed = buffer.end_frame;
        }
    }
}
