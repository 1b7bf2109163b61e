//! Mono-flattened sample buffer shared by capture, decode, playback and analysis

use ndarray::{Array2, ArrayView2};

use crate::error::AudioError;

/// Where a buffer's samples came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BufferOrigin {
    /// Recorded from an input device
    Captured,

    /// Exact PCM decoded from an uncompressed file
    Decoded,

    /// Synthetic silence standing in for audio that was not decoded.
    /// Analysing it yields a flat zero spectrum.
    Placeholder {
        /// Rate reported by the container, if any
        nominal_sample_rate: Option<u32>,
    },
}

/// Ordered amplitude samples, roughly normalized to [-1, 1]
///
/// Multi-channel data is stored flattened (frames interleaved), so `len()`
/// counts samples, not frames. The channel count is kept for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f64>,
    sample_rate: u32,
    channels: u16,
    origin: BufferOrigin,
}

impl SampleBuffer {
    /// Create a mono buffer
    ///
    /// # Errors
    /// `EmptyBuffer` if `samples` is empty, `InvalidCapture` if `sample_rate` is 0
    pub fn new(samples: Vec<f64>, sample_rate: u32, origin: BufferOrigin) -> Result<Self, AudioError> {
        Self::interleaved(samples, sample_rate, 1, origin)
    }

    /// Create a buffer from interleaved multi-channel samples
    pub fn interleaved(
        samples: Vec<f64>,
        sample_rate: u32,
        channels: u16,
        origin: BufferOrigin,
    ) -> Result<Self, AudioError> {
        if samples.is_empty() {
            return Err(AudioError::EmptyBuffer);
        }
        if sample_rate == 0 {
            return Err(AudioError::InvalidCapture("sample rate must be positive".into()));
        }

        Ok(Self {
            samples,
            sample_rate,
            channels: channels.max(1),
            origin,
        })
    }

    /// Flatten a (frames x channels) matrix row by row
    pub fn from_frames(frames: Array2<f64>, sample_rate: u32, origin: BufferOrigin) -> Result<Self, AudioError> {
        let channels = frames.ncols() as u16;
        // Row-major iteration interleaves channels rather than averaging them
        let samples: Vec<f64> = frames.iter().copied().collect();
        Self::interleaved(samples, sample_rate, channels, origin)
    }

    /// Silent buffer of `len` zero samples
    pub fn silent(len: usize, sample_rate: u32, nominal_sample_rate: Option<u32>) -> Result<Self, AudioError> {
        Self::new(
            vec![0.0; len],
            sample_rate,
            BufferOrigin::Placeholder { nominal_sample_rate },
        )
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn origin(&self) -> BufferOrigin {
        self.origin
    }

    /// True for placeholder buffers that do not hold real audio
    pub fn is_synthetic(&self) -> bool {
        matches!(self.origin, BufferOrigin::Placeholder { .. })
    }

    /// Number of frames; equals `len()` for mono
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds: frames / sample rate
    pub fn duration(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// View as (frames x channels); a trailing partial frame is dropped
    pub fn frames(&self) -> ArrayView2<'_, f64> {
        let channels = self.channels as usize;
        let frames = self.frame_count();
        ArrayView2::from_shape((frames, channels), &self.samples[..frames * channels])
            .expect("frame shape matches sample count")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rejects_empty_and_zero_rate() {
        assert!(matches!(
            SampleBuffer::new(vec![], 44100, BufferOrigin::Captured),
            Err(AudioError::EmptyBuffer)
        ));
        assert!(SampleBuffer::new(vec![0.1], 0, BufferOrigin::Captured).is_err());
    }

    #[test]
    fn test_duration() {
        let buffer = SampleBuffer::new(vec![0.0; 16000], 8000, BufferOrigin::Captured).unwrap();
        assert_eq!(buffer.duration(), 2.0);
        assert!(!buffer.is_synthetic());
    }

    #[test]
    fn test_stereo_flattens_by_interleaving() {
        let frames = array![[1.0, -1.0], [2.0, -2.0], [3.0, -3.0]];
        let buffer = SampleBuffer::from_frames(frames, 48000, BufferOrigin::Decoded).unwrap();

        assert_eq!(buffer.samples(), &[1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.frames().column(1).to_vec(), vec![-1.0, -2.0, -3.0]);
    }

    #[test]
    fn test_stereo_duration_counts_frames() {
        let buffer = SampleBuffer::interleaved(vec![0.0; 16000], 8000, 2, BufferOrigin::Decoded).unwrap();
        assert_eq!(buffer.len(), 16000);
        assert_eq!(buffer.frame_count(), 8000);
        assert_eq!(buffer.duration(), 1.0);
    }

    #[test]
    fn test_placeholder_is_flagged() {
        let buffer = SampleBuffer::silent(10, 44100, Some(22050)).unwrap();
        assert!(buffer.is_synthetic());
        assert!(buffer.samples().iter().all(|&s| s == 0.0));
    }
}
