//! Audio output playback using cpal
//!
//! One-shot playback of a whole buffer to speakers or line-out

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ndarray::Axis;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::input::AudioDeviceInfo;
use super::resample::resample;
use crate::error::AudioError;
use crate::sample::SampleBuffer;

/// Audio output player
///
/// Holds at most one stream; starting playback drops the previous one.
#[derive(Default)]
pub struct AudioOutput {
    stream: Option<Stream>,
    device_info: Option<AudioDeviceInfo>,
    /// Set by the callback once the last rendered sample has been written
    finished: Arc<AtomicBool>,
}

impl AudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Play `buffer` from the start on the default output device
    pub fn play_buffer(&mut self, buffer: &SampleBuffer) -> Result<(), AudioError> {
        self.stop();

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoDevice)?;

        self.play_on_device(device, buffer)
    }

    /// Play `buffer` from the start on a specific device
    pub fn play_on_device(&mut self, device: Device, buffer: &SampleBuffer) -> Result<(), AudioError> {
        self.stop();

        let name = device
            .name()
            .map_err(|e| AudioError::DeviceName(e.to_string()))?;

        let (stream_config, sample_format) = resolve_output_config(&device, buffer.sample_rate())?;
        let rendered = render_frames(buffer, stream_config.sample_rate.0, stream_config.channels)?;
        debug!(
            device = %name,
            sample_rate = stream_config.sample_rate.0,
            channels = stream_config.channels,
            ?sample_format,
            "Opening output stream"
        );

        let finished = Arc::new(AtomicBool::new(false));
        let stream = match sample_format {
            SampleFormat::F32 => build_playback_stream::<f32>(&device, &stream_config, rendered, finished.clone()),
            SampleFormat::I16 => build_playback_stream::<i16>(&device, &stream_config, rendered, finished.clone()),
            SampleFormat::U16 => build_playback_stream::<u16>(&device, &stream_config, rendered, finished.clone()),
            _ => Err(AudioError::UnsupportedStreamConfig {
                sample_rate: stream_config.sample_rate.0,
                direction: "output",
            }),
        }?;

        stream
            .play()
            .map_err(|e| AudioError::PlayStream(e.to_string()))?;
        info!(device = %name, seconds = buffer.duration(), "Playback started");

        self.device_info = Some(AudioDeviceInfo {
            name,
            sample_rate: stream_config.sample_rate.0,
            channels: stream_config.channels,
        });
        self.stream = Some(stream);
        self.finished = finished;
        Ok(())
    }

    /// Drop the current stream, if any
    pub fn stop(&mut self) {
        self.stream = None;
    }

    /// True from a successful start until the clip has been fully written out
    pub fn is_active(&self) -> bool {
        self.stream.is_some() && !self.finished.load(Ordering::Acquire)
    }

    /// Device used by the last playback
    pub fn device_info(&self) -> Option<&AudioDeviceInfo> {
        self.device_info.as_ref()
    }
}

/// Prefer a config at the buffer's own rate, else the device default
fn resolve_output_config(device: &Device, sample_rate: u32) -> Result<(StreamConfig, SampleFormat), AudioError> {
    let exact = device
        .supported_output_configs()
        .map_err(|e| AudioError::DefaultConfig(e.to_string()))?
        .filter(|range| {
            range.min_sample_rate().0 <= sample_rate && sample_rate <= range.max_sample_rate().0
        })
        .filter(|range| is_playable(range.sample_format()))
        .min_by_key(|range| (range.sample_format() != SampleFormat::F32, range.channels()));

    let supported = match exact {
        Some(range) => range.with_sample_rate(cpal::SampleRate(sample_rate)),
        None => {
            let fallback = device
                .default_output_config()
                .map_err(|e| AudioError::DefaultConfig(e.to_string()))?;
            debug!(
                requested = sample_rate,
                device_rate = fallback.sample_rate().0,
                "Output device cannot run at buffer rate, resampling"
            );
            fallback
        }
    };

    let sample_format = supported.sample_format();
    Ok((supported.into(), sample_format))
}

fn is_playable(format: SampleFormat) -> bool {
    matches!(format, SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16)
}

/// Interleave `buffer` for a device running at `rate` with `channels` channels
///
/// Buffer channels map one-to-one; extra device channels repeat the last
/// buffer channel, so mono is copied to every speaker.
pub(crate) fn render_frames(buffer: &SampleBuffer, rate: u32, channels: u16) -> Result<Vec<f32>, AudioError> {
    let planar: Vec<Vec<f64>> = buffer
        .frames()
        .axis_iter(Axis(1))
        .map(|column| column.to_vec())
        .collect();
    let planar = resample(&planar, buffer.sample_rate(), rate)?;

    let device_channels = channels.max(1) as usize;
    let source_channels = planar.len();
    let frames = planar.first().map_or(0, Vec::len);

    let mut rendered = Vec::with_capacity(frames * device_channels);
    for frame in 0..frames {
        for channel in 0..device_channels {
            let source = channel.min(source_channels - 1);
            rendered.push(planar[source][frame] as f32);
        }
    }
    Ok(rendered)
}

/// Copy the next rendered samples into `out`, padding with silence
///
/// Returns true once every rendered sample has been written.
fn fill_playback<T>(out: &mut [T], rendered: &[f32], position: &mut usize) -> bool
where
    T: Sample + FromSample<f32>,
{
    for slot in out.iter_mut() {
        let sample = rendered.get(*position).copied().unwrap_or(0.0);
        *slot = T::from_sample(sample);
        *position = (*position + 1).min(rendered.len());
    }
    *position >= rendered.len()
}

fn build_playback_stream<T>(
    device: &Device,
    config: &StreamConfig,
    rendered: Vec<f32>,
    finished: Arc<AtomicBool>,
) -> Result<Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut position = 0;
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if fill_playback(data, &rendered, &mut position) {
                    finished.store(true, Ordering::Release);
                }
            },
            move |err| {
                warn!("Audio output error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::BuildStream(e.to_string()))
}

/// List available audio output devices
pub fn list_output_devices() -> Result<Vec<AudioDeviceInfo>, AudioError> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let device_iter = host
        .output_devices()
        .map_err(|e| AudioError::DeviceName(e.to_string()))?;

    for device in device_iter {
        if let Ok(name) = device.name() {
            if let Ok(config) = device.default_output_config() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::BufferOrigin;

    #[test]
    fn test_mono_is_copied_to_every_channel() {
        let buffer = SampleBuffer::new(vec![0.5, -0.5], 8000, BufferOrigin::Captured).unwrap();
        let rendered = render_frames(&buffer, 8000, 2).unwrap();
        assert_eq!(rendered, vec![0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn test_stereo_keeps_channel_order() {
        let buffer = SampleBuffer::interleaved(
            vec![0.1, 0.2, 0.3, 0.4],
            8000,
            2,
            BufferOrigin::Decoded,
        )
        .unwrap();

        let rendered = render_frames(&buffer, 8000, 2).unwrap();
        assert_eq!(rendered, vec![0.1, 0.2, 0.3, 0.4]);

        // Downmix to a mono device keeps channel 0
        assert_eq!(render_frames(&buffer, 8000, 1).unwrap(), vec![0.1, 0.3]);
    }

    #[test]
    fn test_rate_mismatch_is_resampled() {
        let buffer = SampleBuffer::new(vec![0.0; 8000], 8000, BufferOrigin::Captured).unwrap();
        let rendered = render_frames(&buffer, 16000, 2).unwrap();
        assert_eq!(rendered.len(), 16000 * 2);
    }

    #[test]
    fn test_fill_reports_end_of_clip() {
        let rendered = vec![0.5f32, -0.5, 0.25];
        let mut position = 0;
        let mut block = [1.0f32; 2];

        assert!(!fill_playback(&mut block, &rendered, &mut position));
        assert_eq!(block, [0.5, -0.5]);

        assert!(fill_playback(&mut block, &rendered, &mut position));
        assert_eq!(block, [0.25, 0.0]);

        // Past the end only silence is written
        assert!(fill_playback(&mut block, &rendered, &mut position));
        assert_eq!(block, [0.0, 0.0]);
    }

    #[test]
    fn test_fill_converts_to_integer_formats() {
        let mut position = 0;
        let mut block = [0i16; 2];
        fill_playback(&mut block, &[0.0f32, -1.0], &mut position);
        assert_eq!(block, [0, i16::MIN]);
    }

    #[test]
    fn test_stop_without_stream() {
        let mut output = AudioOutput::new();
        output.stop();
        assert!(!output.is_active());
        assert!(output.device_info().is_none());
    }
}
