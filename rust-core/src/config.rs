//! Session configuration

use crate::error::AudioError;
use crate::session::EngineLabel;

/// Default capture sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default capture duration in seconds
pub const DEFAULT_CAPTURE_SECONDS: f64 = 5.0;

/// Longest capture accepted, in seconds
pub const MAX_CAPTURE_SECONDS: f64 = 600.0;

/// Highest capture rate accepted, in Hz
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Capture and labelling settings for an analysis session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Capture rate in Hz; also the rate of placeholder buffers
    pub sample_rate: u32,

    /// Capture length in seconds
    pub capture_seconds: f64,

    /// Engine category attached to plot titles
    pub engine: EngineLabel,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            capture_seconds: DEFAULT_CAPTURE_SECONDS,
            engine: EngineLabel::Gasoline,
        }
    }
}

impl SessionConfig {
    /// Number of samples a full capture yields
    pub fn capture_len(&self) -> usize {
        capture_len(self.capture_seconds, self.sample_rate)
    }

    pub fn validate(&self) -> Result<(), AudioError> {
        validate_capture(self.capture_seconds, self.sample_rate).map(|_| ())
    }
}

/// Check a capture request and return its length in samples
///
/// # Errors
/// `InvalidCapture` unless 0 < `sample_rate` <= `MAX_SAMPLE_RATE` and
/// 0 < `seconds` <= `MAX_CAPTURE_SECONDS`, or if the capture would be empty
pub fn validate_capture(seconds: f64, sample_rate: u32) -> Result<usize, AudioError> {
    if sample_rate == 0 || sample_rate > MAX_SAMPLE_RATE {
        return Err(AudioError::InvalidCapture(format!(
            "sample rate must be between 1 and {MAX_SAMPLE_RATE} Hz, got {sample_rate}"
        )));
    }
    if !seconds.is_finite() || seconds <= 0.0 || seconds > MAX_CAPTURE_SECONDS {
        return Err(AudioError::InvalidCapture(format!(
            "capture duration must be in (0, {MAX_CAPTURE_SECONDS}] s, got {seconds}"
        )));
    }
    match capture_len(seconds, sample_rate) {
        0 => Err(AudioError::InvalidCapture("capture would hold no samples".into())),
        len => Ok(len),
    }
}

/// Samples in `seconds` of audio at `sample_rate`
pub fn capture_len(seconds: f64, sample_rate: u32) -> usize {
    (seconds * sample_rate as f64).round().max(0.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.capture_len(), 220500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_durations() {
        for seconds in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e20, MAX_CAPTURE_SECONDS + 1.0] {
            let config = SessionConfig {
                capture_seconds: seconds,
                ..SessionConfig::default()
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_capture_length_is_bounded() {
        assert_eq!(validate_capture(2.0, 8000).unwrap(), 16000);
        assert_eq!(
            validate_capture(MAX_CAPTURE_SECONDS, MAX_SAMPLE_RATE).unwrap(),
            230_400_000
        );
        assert!(validate_capture(1.0, MAX_SAMPLE_RATE + 1).is_err());
        assert!(validate_capture(1.0, 0).is_err());
        // Rounds to zero samples
        assert!(validate_capture(1e-6, 8000).is_err());
    }
}
