//! Audio input capture using cpal
//!
//! Fixed-length mono capture from microphone or line-in

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use tracing::{debug, warn};

use super::buffer::AudioProducer;
use super::source::CaptureStream;
use crate::error::AudioError;

/// Audio device information
#[derive(Debug, Clone)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Audio input stream feeding a capture buffer
pub struct AudioInput {
    stream: Stream,
    device_info: AudioDeviceInfo,
}

impl AudioInput {
    /// Create audio input from default device
    ///
    /// # Arguments
    /// * `sample_rate` - Requested capture rate in Hz
    /// * `producer` - Capture buffer, sized to the requested sample count
    pub fn from_default_device(sample_rate: u32, producer: AudioProducer) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioError::NoDevice)?;

        Self::from_device(device, sample_rate, producer)
    }

    /// Create audio input from specific device
    pub fn from_device(device: Device, sample_rate: u32, producer: AudioProducer) -> Result<Self, AudioError> {
        let name = device
            .name()
            .map_err(|e| AudioError::DeviceName(e.to_string()))?;

        let (stream_config, sample_format) = resolve_input_config(&device, sample_rate)?;
        debug!(
            device = %name,
            sample_rate,
            channels = stream_config.channels,
            ?sample_format,
            "Opening input stream"
        );

        let device_info = AudioDeviceInfo {
            name,
            sample_rate,
            channels: stream_config.channels,
        };

        let stream = match sample_format {
            SampleFormat::F32 => build_capture_stream::<f32>(&device, &stream_config, producer),
            SampleFormat::I16 => build_capture_stream::<i16>(&device, &stream_config, producer),
            SampleFormat::U16 => build_capture_stream::<u16>(&device, &stream_config, producer),
            _ => Err(AudioError::UnsupportedStreamConfig {
                sample_rate,
                direction: "input",
            }),
        }?;

        Ok(Self {
            stream,
            device_info,
        })
    }

    /// Start capturing audio
    pub fn start(&self) -> Result<(), AudioError> {
        self.stream
            .play()
            .map_err(|e| AudioError::PlayStream(e.to_string()))
    }

    /// Pause audio capture
    pub fn pause(&self) -> Result<(), AudioError> {
        self.stream
            .pause()
            .map_err(|e| AudioError::PlayStream(e.to_string()))
    }

    /// Get device information
    pub fn device_info(&self) -> &AudioDeviceInfo {
        &self.device_info
    }
}

impl CaptureStream for AudioInput {
    fn stop(self: Box<Self>) -> Result<(), AudioError> {
        let paused = self.pause();
        // Dropping the stream joins the callback; no writes happen after this
        drop(self);
        paused
    }
}

/// Pick a supported config at exactly `sample_rate`, preferring fewer channels
fn resolve_input_config(device: &Device, sample_rate: u32) -> Result<(StreamConfig, SampleFormat), AudioError> {
    let ranges = device
        .supported_input_configs()
        .map_err(|e| AudioError::DefaultConfig(e.to_string()))?;

    let best = ranges
        .filter(|range| {
            range.min_sample_rate().0 <= sample_rate && sample_rate <= range.max_sample_rate().0
        })
        .filter(|range| format_rank(range.sample_format()).is_some())
        .min_by_key(|range| (range.channels(), format_rank(range.sample_format())))
        .ok_or(AudioError::UnsupportedStreamConfig {
            sample_rate,
            direction: "input",
        })?;

    let supported = best.with_sample_rate(cpal::SampleRate(sample_rate));
    let sample_format = supported.sample_format();
    Ok((supported.into(), sample_format))
}

fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::F32 => Some(0),
        SampleFormat::I16 => Some(1),
        SampleFormat::U16 => Some(2),
        _ => None,
    }
}

fn build_capture_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut producer: AudioProducer,
) -> Result<Stream, AudioError>
where
    T: SizedSample,
    f64: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // Keep channel 0 of each frame; the producer drops anything past capacity
                producer.write_iter(data.iter().step_by(channels).map(|&s| s.to_sample::<f64>()));
            },
            move |err| {
                warn!("Audio input error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::BuildStream(e.to_string()))
}

/// List available audio input devices
pub fn list_input_devices() -> Result<Vec<AudioDeviceInfo>, AudioError> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let device_iter = host
        .input_devices()
        .map_err(|e| AudioError::DeviceName(e.to_string()))?;

    for device in device_iter {
        if let Ok(name) = device.name() {
            if let Ok(config) = device.default_input_config() {
                devices.push(AudioDeviceInfo {
                    name,
                    sample_rate: config.sample_rate().0,
                    channels: config.channels(),
                });
            }
        }
    }

    Ok(devices)
}
