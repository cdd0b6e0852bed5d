// Audio decoder using Symphonia
// Decodes audio files to interleaved f32 PCM and tracks the frame position

use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};

use super::{AudioError, PcmBuffer, PcmSource, StreamSpec};

pub struct AudioDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u16,
    time_base: Option<TimeBase>,
    n_frames: Option<u64>,
    /// Frames before this one are dropped after an accurate seek
    skip_until: Option<u64>,
}

impl AudioDecoder {
    /// Open an audio file and prepare for decoding
    pub fn open(path: &Path) -> Result<Self, AudioError> {
        let open_err = |reason: String| AudioError::Open {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| open_err(e.to_string()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint using the file extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| open_err(format!("unsupported format: {}", e)))?;

        let format = probed.format;

        // Find the first audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| open_err("no audio track found".to_string()))?;

        let track_id = track.id;
        let params = &track.codec_params;
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| open_err("unknown sample rate".to_string()))?;
        let channels = params.channels.map(|c| c.count() as u16).unwrap_or(2);
        let time_base = params.time_base;
        let n_frames = params.n_frames;

        let decoder = symphonia::default::get_codecs()
            .make(params, &DecoderOptions::default())
            .map_err(|e| open_err(format!("no decoder: {}", e)))?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
            time_base,
            n_frames,
            skip_until: None,
        })
    }

    fn ts_to_frame(&self, ts: u64) -> u64 {
        match self.time_base {
            Some(tb) => {
                let time = tb.calc_time(ts);
                time.seconds * self.sample_rate as u64
                    + (time.frac * self.sample_rate as f64).round() as u64
            }
            None => ts,
        }
    }

    fn frame_to_ts(&self, frame: u64) -> u64 {
        let rate = self.sample_rate as u64;
        match self.time_base {
            Some(tb) => tb.calc_timestamp(Time::new(frame / rate, (frame % rate) as f64 / rate as f64)),
            None => frame,
        }
    }
}

impl PcmSource for AudioDecoder {
    fn spec(&self) -> StreamSpec {
        StreamSpec {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    fn seek(&mut self, frame: u64) -> Result<u64, AudioError> {
        if let Some(total) = self.n_frames {
            if frame > total {
                return Err(AudioError::Seek {
                    requested: frame,
                    reason: format!("stream is only {} frames long", total),
                });
            }
        }

        let seeked = self
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: self.frame_to_ts(frame),
                    track_id: self.track_id,
                },
            )
            .map_err(|e| AudioError::Seek {
                requested: frame,
                reason: e.to_string(),
            })?;

        // Reset decoder state after seek
        self.decoder.reset();

        let landed = self.ts_to_frame(seeked.actual_ts);
        self.skip_until = (landed < frame).then_some(frame);
        Ok(frame.max(landed))
    }

    fn next_buffer(&mut self) -> Result<Option<PcmBuffer>, AudioError> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None); // End of stream
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(AudioError::Decode(format!("failed to read packet: {}", e))),
            };

            // Skip packets from other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            let start = self.ts_to_frame(packet.ts());

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!("decode error (skipping packet): {}", e);
                    continue;
                }
                Err(e) => return Err(AudioError::Decode(e.to_string())),
            };

            let frames = decoded.frames() as u64;
            let end_frame = start + frames;
            if frames == 0 {
                continue;
            }

            let channels = decoded.spec().channels.count();
            let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
            samples.copy_interleaved_ref(decoded);
            let mut samples = samples.samples().to_vec();

            if let Some(target) = self.skip_until {
                if end_frame <= target {
                    continue;
                }
                let skip = target.saturating_sub(start) as usize * channels;
                samples.drain(..skip.min(samples.len()));
                self.skip_until = None;
            }

            return Ok(Some(PcmBuffer { samples, end_frame }));
        }
    }
}
