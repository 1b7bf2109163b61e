//! Batch waveform and magnitude-spectrum analysis of a whole sample buffer

use realfft::RealFftPlanner;

use super::fft::FftEngine;
use crate::error::AudioError;
use crate::sample::SampleBuffer;

/// Amplitude against time in seconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    pub time: Vec<f64>,
    pub amplitude: Vec<f64>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Last time point (0 for an empty series)
    pub fn duration(&self) -> f64 {
        self.time.last().copied().unwrap_or(0.0)
    }
}

/// Raw DFT magnitude against frequency in Hz, non-negative bins only
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencySpectrum {
    pub frequency: Vec<f64>,
    pub magnitude: Vec<f64>,
}

impl FrequencySpectrum {
    pub fn len(&self) -> usize {
        self.frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequency.is_empty()
    }

    /// Spacing between adjacent bins in Hz
    pub fn bin_width(&self) -> Option<f64> {
        match self.frequency.as_slice() {
            [first, second, ..] => Some(second - first),
            _ => None,
        }
    }

    /// (frequency, magnitude) of the strongest bin
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.magnitude
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(k, &mag)| (self.frequency[k], mag))
    }
}

/// Both plottable series derived from one buffer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisResult {
    pub waveform: TimeSeries,
    pub spectrum: FrequencySpectrum,
}

/// `n` evenly spaced points from `start` to `stop`, both endpoints included
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut points: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            points[n - 1] = stop;
            points
        }
    }
}

/// Bin centre frequencies of a real-input DFT: k * rate / n for k = 0..=n/2
pub fn rfft_frequencies(n: usize, sample_rate: f64) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    (0..=n / 2)
        .map(|k| k as f64 * sample_rate / n as f64)
        .collect()
}

/// Stateless transform from a sample buffer to its two plottable series
///
/// The planner only caches FFT plans; results depend on the input alone.
pub struct SpectralAnalyzer {
    planner: RealFftPlanner<f64>,
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectralAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: RealFftPlanner::new(),
        }
    }

    /// Time axis over [0, duration] with one point per sample, amplitudes unchanged
    ///
    /// Duration counts frames, so interleaved channels share the clip's real span.
    pub fn compute_waveform(&self, buffer: &SampleBuffer) -> TimeSeries {
        let samples = buffer.samples();
        if samples.is_empty() {
            return TimeSeries::default();
        }

        TimeSeries {
            time: linspace(0.0, buffer.duration(), samples.len()),
            amplitude: samples.to_vec(),
        }
    }

    /// Magnitude of every non-negative frequency bin of the flattened buffer
    pub fn compute_spectrum(&mut self, buffer: &SampleBuffer) -> Result<FrequencySpectrum, AudioError> {
        let signal = buffer.samples();
        if signal.is_empty() {
            return Ok(FrequencySpectrum::default());
        }

        let mut engine = FftEngine::new(&mut self.planner, signal.len());
        let magnitude = engine.compute_magnitude(signal)?;
        let frequency = rfft_frequencies(signal.len(), buffer.sample_rate() as f64);

        Ok(FrequencySpectrum { frequency, magnitude })
    }

    /// Both series, or nothing to plot when no buffer is present
    pub fn analyze(&mut self, buffer: Option<&SampleBuffer>) -> Result<Option<AnalysisResult>, AudioError> {
        let Some(buffer) = buffer else {
            return Ok(None);
        };

        Ok(Some(AnalysisResult {
            waveform: self.compute_waveform(buffer),
            spectrum: self.compute_spectrum(buffer)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::BufferOrigin;
    use std::f64::consts::PI;

    fn sine(freq_hz: f64, sample_rate: u32, len: usize) -> SampleBuffer {
        let samples = (0..len)
            .map(|n| (2.0 * PI * freq_hz * n as f64 / sample_rate as f64).sin())
            .collect();
        SampleBuffer::new(samples, sample_rate, BufferOrigin::Captured).unwrap()
    }

    #[test]
    fn test_linspace_includes_endpoint() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(0.0, 3.0, 1), vec![0.0]);
        assert!(linspace(0.0, 3.0, 0).is_empty());
    }

    #[test]
    fn test_rfft_frequencies() {
        assert_eq!(rfft_frequencies(8, 8.0), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(rfft_frequencies(7, 7.0), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_spectrum_bin_count_and_nyquist() {
        let mut analyzer = SpectralAnalyzer::new();
        for (len, rate) in [(1000, 8000), (1001, 8000), (4410, 44100)] {
            let spectrum = analyzer.compute_spectrum(&sine(440.0, rate, len)).unwrap();

            assert_eq!(spectrum.len(), len / 2 + 1);
            assert_eq!(spectrum.magnitude.len(), len / 2 + 1);
            assert_eq!(spectrum.frequency[0], 0.0);
            let nyquist = rate as f64 / 2.0;
            let last = *spectrum.frequency.last().unwrap();
            assert!(nyquist - last <= spectrum.bin_width().unwrap() + 1e-9);
        }
    }

    #[test]
    fn test_sine_peak_within_one_bin() {
        let mut analyzer = SpectralAnalyzer::new();
        let f0 = 1234.0;
        let spectrum = analyzer.compute_spectrum(&sine(f0, 44100, 10000)).unwrap();

        let (peak_freq, peak_mag) = spectrum.peak().unwrap();
        assert!((peak_freq - f0).abs() <= spectrum.bin_width().unwrap());
        // No normalization: a unit sine peaks near N/2
        assert!(peak_mag > 2500.0);
    }

    #[test]
    fn test_waveform_matches_samples() {
        let analyzer = SpectralAnalyzer::new();
        let buffer = sine(100.0, 8000, 800);
        let waveform = analyzer.compute_waveform(&buffer);

        assert_eq!(waveform.len(), 800);
        assert_eq!(waveform.amplitude, buffer.samples());
        assert_eq!(waveform.time[0], 0.0);
        assert_eq!(waveform.duration(), buffer.duration());
    }

    #[test]
    fn test_stereo_waveform_spans_clip_duration() {
        let buffer = SampleBuffer::interleaved(
            (0..16000).map(|i| (i % 2) as f64 * 0.5).collect(),
            8000,
            2,
            BufferOrigin::Decoded,
        )
        .unwrap();
        let mut analyzer = SpectralAnalyzer::new();
        let result = analyzer.analyze(Some(&buffer)).unwrap().unwrap();

        assert_eq!(result.waveform.len(), 16000);
        assert_eq!(result.waveform.amplitude, buffer.samples());
        assert_eq!(result.waveform.duration(), 1.0);
        // Spectrum still runs over the flattened sample count
        assert_eq!(result.spectrum.len(), 8001);
    }

    #[test]
    fn test_repeat_calls_are_identical() {
        let mut analyzer = SpectralAnalyzer::new();
        let buffer = sine(300.0, 8000, 999);
        let first = analyzer.analyze(Some(&buffer)).unwrap();
        let second = analyzer.analyze(Some(&buffer)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_absent_buffer_is_a_no_op() {
        let mut analyzer = SpectralAnalyzer::new();
        assert!(analyzer.analyze(None).unwrap().is_none());
    }

    #[test]
    fn test_placeholder_spectrum_is_flat_zero() {
        let mut analyzer = SpectralAnalyzer::new();
        let buffer = SampleBuffer::silent(441, 44100, None).unwrap();
        let spectrum = analyzer.compute_spectrum(&buffer).unwrap();
        assert!(spectrum.magnitude.iter().all(|&m| m == 0.0));
    }
}
