// Audio output using cpal
// Opens the default device at the stream's own format and feeds it through a ring buffer

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::{HeapRb, traits::{Consumer, Producer, Split}};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{AudioError, PcmSink, StreamSpec};

/// A write that makes no progress for this long means the device is gone
const STALL_TIMEOUT: Duration = Duration::from_secs(2);

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

pub struct AudioOutput {
    // Dropping the stream stops the device callback
    _stream: Stream,
    producer: RingProducer,
}

impl AudioOutput {
    /// Open the default output device at the given format
    pub fn open(spec: StreamSpec) -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::Output("no output device available".to_string()))?;

        let sample_format = device
            .default_output_config()
            .map_err(|e| AudioError::Output(format!("failed to get default output config: {}", e)))?
            .sample_format();

        let config = StreamConfig {
            channels: spec.channels,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // ~250ms of audio between the worker and the device
        let capacity = (spec.sample_rate as usize * spec.channels as usize / 4).max(1024);
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        let consumer = Arc::new(Mutex::new(consumer));

        let stream = match sample_format {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, consumer)?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, consumer)?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, consumer)?,
            format => {
                return Err(AudioError::Output(format!("unsupported sample format: {:?}", format)))
            }
        };

        stream
            .play()
            .map_err(|e| AudioError::Output(format!("failed to start stream: {}", e)))?;

        Ok(Self {
            _stream: stream,
            producer,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        consumer: Arc<Mutex<RingConsumer>>,
    ) -> Result<Stream, AudioError> {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut consumer = consumer.lock();
                    for sample in data.iter_mut() {
                        let value = consumer.try_pop().unwrap_or(0.0);
                        *sample = T::from_sample(value);
                    }
                },
                move |err| {
                    tracing::error!("audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| {
                AudioError::Output(format!(
                    "failed to build {} Hz / {} ch output stream: {}",
                    config.sample_rate.0, config.channels, e
                ))
            })
    }
}

impl PcmSink for AudioOutput {
    /// Blocks until every sample is queued for the device
    fn write(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        let mut remaining = samples;
        let mut last_progress = Instant::now();

        while !remaining.is_empty() {
            let written = self.producer.push_slice(remaining);
            if written > 0 {
                remaining = &remaining[written..];
                last_progress = Instant::now();
            } else if last_progress.elapsed() > STALL_TIMEOUT {
                return Err(AudioError::Output("output device stopped consuming audio".to_string()));
            } else {
                // Buffer full, wait a bit
                std::thread::sleep(Duration::from_millis(1));
            }
        }

        Ok(())
    }
}
