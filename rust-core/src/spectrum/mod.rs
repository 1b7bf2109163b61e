//! Spectral analysis with FFT

pub mod fft;
pub mod analysis;

pub use fft::FftEngine;
pub use analysis::{AnalysisResult, FrequencySpectrum, SpectralAnalyzer, TimeSeries};
