//! FFT engine using realfft for real-valued signals
//!
//! Transforms a whole buffer in one pass: no windowing, no zero-padding,
//! no 1/N normalization.

use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

use crate::error::AudioError;

/// FFT engine for real-valued signals of one fixed length
pub struct FftEngine {
    /// FFT size (number of samples)
    fft_size: usize,

    /// Real FFT processor
    r2c: Arc<dyn RealToComplex<f64>>,

    /// Reusable input buffer (realfft overwrites it)
    input_buffer: Vec<f64>,

    /// Reusable output buffer (non-negative frequency bins)
    output_buffer: Vec<Complex<f64>>,
}

impl FftEngine {
    /// Create new FFT engine
    ///
    /// # Arguments
    /// * `planner` - Shared planner, caches twiddles between sizes
    /// * `fft_size` - Transform length, any size > 0
    pub fn new(planner: &mut RealFftPlanner<f64>, fft_size: usize) -> Self {
        let r2c = planner.plan_fft_forward(fft_size);
        let input_buffer = r2c.make_input_vec();
        let output_buffer = r2c.make_output_vec();

        Self {
            fft_size,
            r2c,
            input_buffer,
            output_buffer,
        }
    }

    /// Compute |X[k]| for k = 0..=fft_size/2
    ///
    /// `signal` must be exactly `fft_size` samples long.
    pub fn compute_magnitude(&mut self, signal: &[f64]) -> Result<Vec<f64>, AudioError> {
        if signal.len() != self.fft_size {
            return Err(realfft::FftError::InputBuffer(self.fft_size, signal.len()).into());
        }
        self.input_buffer.copy_from_slice(signal);

        self.r2c
            .process(&mut self.input_buffer, &mut self.output_buffer)?;

        Ok(self.output_buffer.iter().map(|c| c.norm()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::FftPlanner;
    use std::f64::consts::PI;

    #[test]
    fn test_fft_dc_signal() {
        let mut planner = RealFftPlanner::new();
        let mut fft = FftEngine::new(&mut planner, 100);

        let spectrum = fft.compute_magnitude(&vec![1.0; 100]).unwrap();

        // Unnormalized: DC bin equals the sample sum
        assert!((spectrum[0] - 100.0).abs() < 1e-9);
        assert!(spectrum[10] < 1e-9);
    }

    #[test]
    fn test_bin_count_odd_and_even() {
        let mut planner = RealFftPlanner::new();
        for (n, bins) in [(8, 5), (9, 5), (2, 2)] {
            let mut fft = FftEngine::new(&mut planner, n);
            assert_eq!(fft.compute_magnitude(&vec![0.5; n]).unwrap().len(), bins);
        }
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        let mut planner = RealFftPlanner::new();
        let mut fft = FftEngine::new(&mut planner, 16);
        assert!(matches!(
            fft.compute_magnitude(&[0.0; 8]),
            Err(AudioError::Fft(_))
        ));
    }

    #[test]
    fn test_matches_complex_fft_half_spectrum() {
        let n = 257;
        let signal: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * 13.0 * i as f64 / n as f64).sin() + 0.25 * (i % 7) as f64)
            .collect();

        let mut planner = RealFftPlanner::new();
        let real = FftEngine::new(&mut planner, n).compute_magnitude(&signal).unwrap();

        let mut full: Vec<rustfft::num_complex::Complex<f64>> = signal
            .iter()
            .map(|&x| rustfft::num_complex::Complex::new(x, 0.0))
            .collect();
        FftPlanner::new().plan_fft_forward(n).process(&mut full);

        for (k, mag) in real.iter().enumerate() {
            assert!((mag - full[k].norm()).abs() < 1e-6, "bin {k}");
            // Conjugate symmetry: negative frequencies add nothing
            assert!((full[k].norm() - full[(n - k) % n].norm()).abs() < 1e-6);
        }
    }
}
