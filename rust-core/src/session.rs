//! Analysis session: capture/upload/playback state machine
//!
//! The session owns the current buffer and both derived series. Every
//! transition that replaces the buffer computes the new series first and
//! swaps them in together, so a presenter never sees a stale spectrum.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::audio::source::{CaptureHandle, DeviceSource, Playback, SampleSource};
use crate::audio::output::AudioOutput;
use crate::config::SessionConfig;
use crate::error::{AudioError, ErrorKind};
use crate::sample::SampleBuffer;
use crate::spectrum::{AnalysisResult, FrequencySpectrum, SpectralAnalyzer, TimeSeries};

pub const TIME_AXIS_LABEL: &str = "Time (s)";
pub const AMPLITUDE_AXIS_LABEL: &str = "Amplitude";
pub const FREQUENCY_AXIS_LABEL: &str = "Frequency (Hz)";
pub const MAGNITUDE_AXIS_LABEL: &str = "Magnitude";

/// Engine category shown in plot titles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineLabel {
    #[default]
    Gasoline,
    Diesel,
}

impl EngineLabel {
    pub fn name(self) -> &'static str {
        match self {
            EngineLabel::Gasoline => "Gasoline",
            EngineLabel::Diesel => "Diesel",
        }
    }

    pub fn waveform_title(self) -> String {
        format!("Real-Time Recording - {} Engine", self.name())
    }

    pub fn spectrum_title(self) -> String {
        format!("Discrete Fourier Transform (DFT) - {} Engine", self.name())
    }
}

impl fmt::Display for EngineLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown engine type '{0}' (expected gasoline or diesel)")]
pub struct UnknownEngine(pub String);

impl FromStr for EngineLabel {
    type Err = UnknownEngine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gasoline" | "petrol" | "bensin" => Ok(EngineLabel::Gasoline),
            "diesel" => Ok(EngineLabel::Diesel),
            _ => Err(UnknownEngine(s.to_string())),
        }
    }
}

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No buffer
    Idle,
    /// Capture in progress; the buffer is not readable yet
    Capturing,
    /// Buffer analysed, not playing
    Captured,
    /// Buffer analysed and playback running; falls back to `Captured` once
    /// the clip has played out
    Playing,
}

impl SessionState {
    pub fn name(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Capturing => "capturing",
            SessionState::Captured => "captured",
            SessionState::Playing => "playing",
        }
    }

    /// Whether `command` is a legal transition from this state
    pub fn allows(self, command: &Command) -> bool {
        match command {
            Command::Start => self == SessionState::Idle,
            Command::Stop => self == SessionState::Capturing,
            Command::Play => matches!(self, SessionState::Captured | SessionState::Playing),
            Command::Reset => self != SessionState::Idle,
            Command::Upload(_) | Command::SelectEngine(_) => true,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// User actions, dispatched through the session
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Play,
    Reset,
    Upload(PathBuf),
    SelectEngine(EngineLabel),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Play => "play",
            Command::Reset => "reset",
            Command::Upload(_) => "upload",
            Command::SelectEngine(_) => "select engine",
        }
    }
}

/// Renders session output; implemented by the UI
pub trait Presenter {
    /// A new buffer (or a new label for the current one) is ready to plot
    fn on_buffer_ready(&mut self, waveform: &TimeSeries, spectrum: &FrequencySpectrum, engine: EngineLabel);

    /// An operation failed or completed with a warning
    fn on_error(&mut self, kind: ErrorKind, message: &str);

    /// The buffer was discarded; plots should be cleared
    fn on_cleared(&mut self) {}
}

/// Buffer and its series, always replaced together
struct Analysed {
    buffer: SampleBuffer,
    result: AnalysisResult,
}

/// Owns the current buffer and drives capture, upload and playback
pub struct AnalysisSession<S = DeviceSource, P = AudioOutput> {
    config: SessionConfig,
    source: S,
    playback: P,
    analyzer: SpectralAnalyzer,
    state: SessionState,
    capture: Option<CaptureHandle>,
    current: Option<Analysed>,
    /// Bumped whenever what a presenter should show changes
    revision: u64,
}

impl AnalysisSession<DeviceSource, AudioOutput> {
    /// Session on the default input and output devices
    pub fn with_devices(config: SessionConfig) -> Self {
        let source = DeviceSource::new(config.sample_rate);
        Self::new(config, source, AudioOutput::new())
    }
}

impl<S: SampleSource, P: Playback> AnalysisSession<S, P> {
    pub fn new(config: SessionConfig, source: S, playback: P) -> Self {
        Self {
            config,
            source,
            playback,
            analyzer: SpectralAnalyzer::new(),
            state: SessionState::Idle,
            capture: None,
            current: None,
            revision: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> EngineLabel {
        self.config.engine
    }

    pub fn buffer(&self) -> Option<&SampleBuffer> {
        self.current.as_ref().map(|a| &a.buffer)
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.current.as_ref().map(|a| &a.result)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn playback(&self) -> &P {
        &self.playback
    }

    /// Whether `command` would be accepted right now
    pub fn can(&self, command: &Command) -> bool {
        self.state.allows(command) && (*command != Command::Play || self.current.is_some())
    }

    fn guard(&self, command: &Command) -> Result<(), AudioError> {
        if self.can(command) {
            Ok(())
        } else {
            Err(AudioError::InvalidTransition {
                command: command.name(),
                state: self.state.name(),
            })
        }
    }

    fn transition(&mut self, next: SessionState) {
        if next != self.state {
            info!(from = %self.state, to = %next, "Session transition");
            self.state = next;
        }
    }

    /// Derive both series for `buffer` without touching the current state
    fn analyse(&mut self, buffer: SampleBuffer) -> Result<Analysed, AudioError> {
        let waveform = self.analyzer.compute_waveform(&buffer);
        let spectrum = self.analyzer.compute_spectrum(&buffer)?;
        Ok(Analysed {
            buffer,
            result: AnalysisResult { waveform, spectrum },
        })
    }

    fn install(&mut self, analysed: Analysed) {
        self.current = Some(analysed);
        self.revision += 1;
    }

    fn discard(&mut self) {
        self.playback.stop();
        self.capture = None;
        if self.current.take().is_some() {
            self.revision += 1;
        }
    }

    /// Begin a capture of the configured length
    pub fn start(&mut self) -> Result<SessionState, AudioError> {
        if self.state == SessionState::Capturing {
            warn!("Capture already running; ignoring start");
        }
        self.guard(&Command::Start)?;
        self.config.validate()?;

        let handle = self
            .source
            .begin_capture(self.config.capture_seconds, self.config.sample_rate)?;
        self.capture = Some(handle);
        self.transition(SessionState::Capturing);
        Ok(self.state)
    }

    /// End the capture, analyse what was recorded and make it current
    ///
    /// A short capture is kept and analysed; the returned `CaptureIncomplete`
    /// is then only a warning and the session is already `Captured`.
    pub fn stop(&mut self) -> Result<SessionState, AudioError> {
        self.guard(&Command::Stop)?;
        let handle = self.capture.take().ok_or(AudioError::InvalidTransition {
            command: "stop",
            state: self.state.name(),
        })?;

        match self.source.end_capture(handle) {
            Ok(buffer) => {
                self.install_or_idle(buffer)?;
                self.transition(SessionState::Captured);
                Ok(self.state)
            }
            Err(AudioError::CaptureIncomplete {
                expected,
                captured,
                partial: Some(buffer),
            }) => {
                self.install_or_idle(buffer)?;
                self.transition(SessionState::Captured);
                Err(AudioError::CaptureIncomplete {
                    expected,
                    captured,
                    partial: None,
                })
            }
            Err(err) => {
                self.transition(SessionState::Idle);
                Err(err)
            }
        }
    }

    fn install_or_idle(&mut self, buffer: SampleBuffer) -> Result<(), AudioError> {
        match self.analyse(buffer) {
            Ok(analysed) => {
                self.discard();
                self.install(analysed);
                Ok(())
            }
            Err(err) => {
                self.discard();
                self.transition(SessionState::Idle);
                Err(err)
            }
        }
    }

    /// Restart playback of the current buffer at its own sample rate
    pub fn play(&mut self) -> Result<SessionState, AudioError> {
        self.guard(&Command::Play)?;
        if let Some(current) = &self.current {
            self.playback.play(&current.buffer)?;
        }
        self.transition(SessionState::Playing);
        Ok(self.state)
    }

    /// Return to `Captured` if playback has run to the end
    pub fn refresh(&mut self) -> SessionState {
        if self.state == SessionState::Playing && !self.playback.is_playing() {
            self.transition(SessionState::Captured);
        }
        self.state
    }

    /// Drop the buffer and both series
    pub fn reset(&mut self) -> Result<SessionState, AudioError> {
        self.guard(&Command::Reset)?;
        self.discard();
        self.transition(SessionState::Idle);
        Ok(self.state)
    }

    /// Replace the buffer with a decoded file
    ///
    /// On failure nothing changes, including a capture in progress.
    pub fn upload(&mut self, path: &Path) -> Result<SessionState, AudioError> {
        let buffer = self.source.decode_file(path)?;
        if buffer.is_synthetic() {
            warn!(path = %path.display(), "Uploaded audio is a silent placeholder");
        }

        let analysed = self.analyse(buffer)?;

        // Abandon any capture and stale playback only once the new buffer is ready
        self.discard();
        self.install(analysed);
        self.transition(SessionState::Captured);
        Ok(self.state)
    }

    /// Change the engine label; the current plots are re-titled
    pub fn select_engine(&mut self, engine: EngineLabel) -> Result<SessionState, AudioError> {
        if engine != self.config.engine {
            self.config.engine = engine;
            if self.current.is_some() {
                self.revision += 1;
            }
        }
        Ok(self.state)
    }

    /// Run `command`, then report results and failures to `presenter`
    pub fn dispatch(&mut self, command: Command, presenter: &mut dyn Presenter) -> SessionState {
        self.refresh();
        let revision = self.revision;
        let outcome = match &command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Play => self.play(),
            Command::Reset => self.reset(),
            Command::Upload(path) => self.upload(path),
            Command::SelectEngine(engine) => self.select_engine(*engine),
        };

        if self.revision != revision {
            match &self.current {
                Some(current) => presenter.on_buffer_ready(
                    &current.result.waveform,
                    &current.result.spectrum,
                    self.config.engine,
                ),
                None => presenter.on_cleared(),
            }
        }

        if let Err(err) = outcome {
            if err.is_fatal() {
                error!(command = command.name(), "{}", err);
            } else {
                warn!(command = command.name(), "{}", err);
            }
            presenter.on_error(err.kind(), &err.to_string());
        }

        self.state
    }
}
