//! Error taxonomy for capture, decode, analysis and session transitions

use std::path::PathBuf;
use thiserror::Error;

use crate::sample::SampleBuffer;

/// Boxed decoder failure (hound, symphonia or shape errors)
pub type DecodeSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio device found")]
    NoDevice,

    #[error("Failed to get device name: {0}")]
    DeviceName(String),

    #[error("Failed to get device config: {0}")]
    DefaultConfig(String),

    #[error("Failed to build stream: {0}")]
    BuildStream(String),

    #[error("Failed to play stream: {0}")]
    PlayStream(String),

    #[error("Device does not support {sample_rate} Hz {direction}")]
    UnsupportedStreamConfig {
        sample_rate: u32,
        direction: &'static str,
    },

    #[error("Invalid capture request: {0}")]
    InvalidCapture(String),

    /// Capture stopped before the requested length was reached.
    /// `partial` holds whatever was written until a session takes it over.
    #[error("Capture incomplete: got {captured} of {expected} samples")]
    CaptureIncomplete {
        expected: usize,
        captured: usize,
        partial: Option<SampleBuffer>,
    },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeSource,
    },

    #[error("Sample buffer is empty")]
    EmptyBuffer,

    #[error("Cannot {command} while {state}")]
    InvalidTransition {
        command: &'static str,
        state: &'static str,
    },

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("FFT processing failed: {0}")]
    Fft(#[from] realfft::FftError),
}

/// Coarse error category surfaced to the presenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Device,
    CaptureIncomplete,
    UnsupportedFormat,
    Decode,
    InvalidState,
    Internal,
}

impl AudioError {
    pub(crate) fn decode(path: impl Into<PathBuf>, source: impl Into<DecodeSource>) -> Self {
        AudioError::Decode {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AudioError::NoDevice
            | AudioError::DeviceName(_)
            | AudioError::DefaultConfig(_)
            | AudioError::BuildStream(_)
            | AudioError::PlayStream(_)
            | AudioError::UnsupportedStreamConfig { .. }
            | AudioError::InvalidCapture(_) => ErrorKind::Device,
            AudioError::CaptureIncomplete { .. } => ErrorKind::CaptureIncomplete,
            AudioError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            AudioError::Decode { .. } | AudioError::EmptyBuffer => ErrorKind::Decode,
            AudioError::InvalidTransition { .. } => ErrorKind::InvalidState,
            AudioError::Resample(_) | AudioError::Fft(_) => ErrorKind::Internal,
        }
    }

    /// Only a short capture is recoverable; everything else aborts the operation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AudioError::CaptureIncomplete { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(AudioError::NoDevice.kind(), ErrorKind::Device);
        assert_eq!(
            AudioError::UnsupportedFormat("ogg".into()).kind(),
            ErrorKind::UnsupportedFormat
        );
        let decode = AudioError::decode("x.wav", "truncated header");
        assert_eq!(decode.kind(), ErrorKind::Decode);
        assert!(decode.to_string().contains("x.wav"));
    }

    #[test]
    fn test_only_incomplete_capture_is_recoverable() {
        let short = AudioError::CaptureIncomplete {
            expected: 10,
            captured: 0,
            partial: None,
        };
        assert!(!short.is_fatal());
        assert_eq!(short.to_string(), "Capture incomplete: got 0 of 10 samples");
        assert!(AudioError::EmptyBuffer.is_fatal());
    }
}
