//! Terminal front end: record or load one clip and print its analysis

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use engine_noise::audio::input::list_input_devices;
use engine_noise::audio::output::list_output_devices;
use engine_noise::config::{DEFAULT_CAPTURE_SECONDS, DEFAULT_SAMPLE_RATE};
use engine_noise::session::{
    AMPLITUDE_AXIS_LABEL, FREQUENCY_AXIS_LABEL, MAGNITUDE_AXIS_LABEL, TIME_AXIS_LABEL,
};
use engine_noise::{
    AnalysisSession, Command, EngineLabel, ErrorKind, FrequencySpectrum, Presenter, SessionConfig,
    SessionState, TimeSeries,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "engine-noise")]
#[command(about = "Engine noise waveform and DFT spectrum analyzer", long_about = None)]
struct Args {
    /// Engine type used in plot titles: gasoline or diesel
    #[arg(long, value_name = "TYPE", default_value = "gasoline")]
    engine: EngineLabel,

    /// Analyse a .wav or .mp3 file instead of recording
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Capture sample rate in Hz
    #[arg(long, value_name = "HZ", default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Capture duration in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_CAPTURE_SECONDS)]
    seconds: f64,

    /// Play the clip back after analysis
    #[arg(long)]
    play: bool,

    /// List audio devices and exit
    #[arg(long)]
    list_devices: bool,
}

/// Prints what a plotting UI would draw
#[derive(Default)]
struct TerminalPresenter {
    failed: bool,
}

impl Presenter for TerminalPresenter {
    fn on_buffer_ready(&mut self, waveform: &TimeSeries, spectrum: &FrequencySpectrum, engine: EngineLabel) {
        println!("{}", engine.waveform_title());
        println!(
            "  {} points, {} vs {}, 0 .. {:.3} s",
            waveform.len(),
            AMPLITUDE_AXIS_LABEL,
            TIME_AXIS_LABEL,
            waveform.duration()
        );
        let peak_amplitude = waveform.amplitude.iter().fold(0.0f64, |acc, &a| acc.max(a.abs()));
        println!("  peak |amplitude| {:.4}", peak_amplitude);

        println!("{}", engine.spectrum_title());
        println!(
            "  {} bins, {} vs {}, bin width {:.3} Hz",
            spectrum.len(),
            MAGNITUDE_AXIS_LABEL,
            FREQUENCY_AXIS_LABEL,
            spectrum.bin_width().unwrap_or(0.0)
        );
        if let Some((freq, mag)) = spectrum.peak() {
            println!("  peak {:.1} Hz (magnitude {:.2})", freq, mag);
        }
    }

    fn on_error(&mut self, kind: ErrorKind, message: &str) {
        if kind != ErrorKind::CaptureIncomplete {
            self.failed = true;
        }
        eprintln!("Error ({:?}): {}", kind, message);
    }

    fn on_cleared(&mut self) {
        println!("Cleared");
    }
}

fn print_devices() {
    for (direction, devices) in [("Input", list_input_devices()), ("Output", list_output_devices())] {
        match devices {
            Ok(devices) => {
                for device in devices {
                    println!(
                        "{direction}: {} ({} Hz, {} ch)",
                        device.name, device.sample_rate, device.channels
                    );
                }
            }
            Err(e) => eprintln!("{direction} devices unavailable: {e}"),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if args.list_devices {
        print_devices();
        return ExitCode::SUCCESS;
    }

    let config = SessionConfig {
        sample_rate: args.sample_rate,
        capture_seconds: args.seconds,
        engine: args.engine,
    };
    if let Err(e) = config.validate() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let mut session = AnalysisSession::with_devices(config.clone());
    let mut presenter = TerminalPresenter::default();

    match args.file {
        Some(path) => {
            session.dispatch(Command::Upload(path), &mut presenter);
        }
        None => {
            if session.dispatch(Command::Start, &mut presenter) == SessionState::Capturing {
                println!("Recording {:.1} s at {} Hz...", config.capture_seconds, config.sample_rate);
                thread::sleep(Duration::from_secs_f64(config.capture_seconds + 0.25));
                session.dispatch(Command::Stop, &mut presenter);
            }
        }
    }

    if args.play
        && session.can(&Command::Play)
        && session.dispatch(Command::Play, &mut presenter) == SessionState::Playing
    {
        let seconds = session.buffer().map_or(0.0, |b| b.duration());
        let deadline = Instant::now() + Duration::from_secs_f64(seconds + 2.0);
        while session.refresh() == SessionState::Playing && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(50));
        }
    }

    if presenter.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
