//! Sample sources and playback sinks driven by the analysis session
//!
//! Capture runs on a device-owned thread that writes into a ring buffer.
//! The session only ever holds the reader end, and reads it after the
//! writer has been stopped.

use std::path::Path;
use tracing::{info, warn};

use super::buffer::{AudioConsumer, AudioRingBuffer};
use super::decode::decode_file;
use super::input::AudioInput;
use super::output::AudioOutput;
use crate::config::validate_capture;
use crate::error::AudioError;
use crate::sample::{BufferOrigin, SampleBuffer};

/// Something writing captured samples into a ring buffer producer
pub trait CaptureStream {
    /// Stop writing. Once this returns, no further samples reach the buffer.
    fn stop(self: Box<Self>) -> Result<(), AudioError>;
}

/// An in-progress capture: the writer plus the reader end of its buffer
pub struct CaptureHandle {
    stream: Box<dyn CaptureStream>,
    consumer: AudioConsumer,
    sample_rate: u32,
}

impl CaptureHandle {
    /// The expected capture length is the consumer's capacity
    pub fn new(stream: Box<dyn CaptureStream>, consumer: AudioConsumer, sample_rate: u32) -> Self {
        Self {
            stream,
            consumer,
            sample_rate,
        }
    }

    /// Stop the writer, then take the samples
    ///
    /// # Errors
    /// `CaptureIncomplete` carrying the partial buffer if fewer samples than
    /// requested were written
    pub fn finish(self) -> Result<SampleBuffer, AudioError> {
        let CaptureHandle {
            stream,
            mut consumer,
            sample_rate,
        } = self;
        let expected = consumer.capacity();

        if let Err(err) = stream.stop() {
            warn!("Capture stream did not stop cleanly: {}", err);
        }

        let samples = consumer.drain();
        if samples.len() < expected {
            return Err(AudioError::CaptureIncomplete {
                expected,
                captured: samples.len(),
                partial: SampleBuffer::new(samples, sample_rate, BufferOrigin::Captured).ok(),
            });
        }

        SampleBuffer::new(samples, sample_rate, BufferOrigin::Captured)
    }
}

/// Produces sample buffers from live capture or files
pub trait SampleSource {
    /// Start capturing `duration_secs * sample_rate` mono samples without blocking
    fn begin_capture(&mut self, duration_secs: f64, sample_rate: u32) -> Result<CaptureHandle, AudioError>;

    /// Stop the capture and hand over its buffer
    fn end_capture(&mut self, handle: CaptureHandle) -> Result<SampleBuffer, AudioError> {
        handle.finish()
    }

    /// Decode a file, dispatching on its extension
    fn decode_file(&self, path: &Path) -> Result<SampleBuffer, AudioError>;
}

/// Plays a buffer on an output device
pub trait Playback {
    /// Start playback from the beginning, replacing any playback in progress
    fn play(&mut self, buffer: &SampleBuffer) -> Result<(), AudioError>;

    /// Silence any playback in progress
    fn stop(&mut self);

    /// True until the last playback has been fully written to the device
    fn is_playing(&self) -> bool;
}

/// Source backed by the default cpal input device
pub struct DeviceSource {
    /// Rate used for placeholder buffers
    default_sample_rate: u32,
}

impl DeviceSource {
    pub fn new(default_sample_rate: u32) -> Self {
        Self { default_sample_rate }
    }
}

impl SampleSource for DeviceSource {
    fn begin_capture(&mut self, duration_secs: f64, sample_rate: u32) -> Result<CaptureHandle, AudioError> {
        let len = validate_capture(duration_secs, sample_rate)?;

        let (producer, consumer) = AudioRingBuffer::new(len).split();
        let input = AudioInput::from_default_device(sample_rate, producer)?;
        input.start()?;
        info!(
            device = %input.device_info().name,
            samples = len,
            sample_rate,
            "Capture started"
        );

        Ok(CaptureHandle::new(Box::new(input), consumer, sample_rate))
    }

    fn decode_file(&self, path: &Path) -> Result<SampleBuffer, AudioError> {
        decode_file(path, self.default_sample_rate)
    }
}

impl Playback for AudioOutput {
    fn play(&mut self, buffer: &SampleBuffer) -> Result<(), AudioError> {
        self.play_buffer(buffer)
    }

    fn stop(&mut self) {
        AudioOutput::stop(self)
    }

    fn is_playing(&self) -> bool {
        self.is_active()
    }
}
