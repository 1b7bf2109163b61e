//! Engine Noise - Audio Capture and Spectral Analysis Core
//!
//! Records or loads a short engine clip and derives its waveform and
//! DFT magnitude spectrum, labelled by engine type.

pub mod audio;
pub mod config;
pub mod error;
pub mod sample;
pub mod session;
pub mod spectrum;

#[cfg(test)]
mod testing;

pub use config::SessionConfig;
pub use error::{AudioError, ErrorKind};
pub use sample::{BufferOrigin, SampleBuffer};
pub use session::{AnalysisSession, Command, EngineLabel, Presenter, SessionState};
pub use spectrum::{AnalysisResult, FrequencySpectrum, SpectralAnalyzer, TimeSeries};
