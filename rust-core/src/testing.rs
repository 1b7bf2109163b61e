//! Test doubles for capture and playback

use std::path::Path;
use std::thread::JoinHandle;

use crate::audio::buffer::{AudioProducer, AudioRingBuffer};
use crate::audio::decode::decode_file;
use crate::audio::source::{CaptureHandle, CaptureStream, Playback, SampleSource};
use crate::config::capture_len;
use crate::error::AudioError;
use crate::sample::SampleBuffer;

/// Writer thread producing `available` samples of a ramp, then exiting
pub(crate) struct RampStream(JoinHandle<()>);

impl RampStream {
    pub(crate) fn spawn(mut producer: AudioProducer, available: usize) -> Self {
        Self(std::thread::spawn(move || {
            producer.write_iter((0..available).map(|i| (i % 100) as f64 / 100.0));
        }))
    }
}

impl CaptureStream for RampStream {
    fn stop(self: Box<Self>) -> Result<(), AudioError> {
        self.0
            .join()
            .map_err(|_| AudioError::PlayStream("writer panicked".into()))
    }
}

pub(crate) fn ramp_capture(len: usize, available: usize, sample_rate: u32) -> CaptureHandle {
    let (producer, consumer) = AudioRingBuffer::new(len).split();
    CaptureHandle::new(Box::new(RampStream::spawn(producer, available)), consumer, sample_rate)
}

/// Source whose device writes at most `available` samples per capture
pub(crate) struct FakeSource {
    pub(crate) available: Option<usize>,
    pub(crate) no_device: bool,
    pub(crate) captures: usize,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self {
            available: None,
            no_device: false,
            captures: 0,
        }
    }
}

impl SampleSource for FakeSource {
    fn begin_capture(&mut self, duration_secs: f64, sample_rate: u32) -> Result<CaptureHandle, AudioError> {
        if self.no_device {
            return Err(AudioError::NoDevice);
        }
        self.captures += 1;
        let len = capture_len(duration_secs, sample_rate);
        Ok(ramp_capture(len, self.available.unwrap_or(len), sample_rate))
    }

    fn decode_file(&self, path: &Path) -> Result<SampleBuffer, AudioError> {
        decode_file(path, 8000)
    }
}

/// Playback sink counting calls; clear `active` to simulate the clip ending
#[derive(Default)]
pub(crate) struct FakePlayback {
    pub(crate) plays: usize,
    pub(crate) stops: usize,
    pub(crate) last_len: Option<usize>,
    pub(crate) active: bool,
}

impl Playback for FakePlayback {
    fn play(&mut self, buffer: &SampleBuffer) -> Result<(), AudioError> {
        self.plays += 1;
        self.last_len = Some(buffer.len());
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.stops += 1;
        self.active = false;
    }

    fn is_playing(&self) -> bool {
        self.active
    }
}
