//! Audio file decoding
//!
//! WAV files are decoded exactly. MP3 files are only probed for their
//! duration and yield a silent placeholder buffer flagged as synthetic.

use std::fs::File;
use std::path::Path;

use ndarray::Array2;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{info, warn};

use crate::config::capture_len;
use crate::error::AudioError;
use crate::sample::{BufferOrigin, SampleBuffer};

/// File formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// Uncompressed PCM, decoded exactly
    Wav,
    /// Compressed, decoded to a placeholder
    Mp3,
}

impl AudioFormat {
    /// Match on the file extension, ignoring case
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "wav" => Some(AudioFormat::Wav),
            "mp3" => Some(AudioFormat::Mp3),
            _ => None,
        }
    }
}

/// Decode `path` into a sample buffer
///
/// # Arguments
/// * `path` - `.wav` or `.mp3` file
/// * `default_sample_rate` - Rate of the placeholder produced for MP3 files
///
/// # Errors
/// `UnsupportedFormat` for other extensions, `Decode` for unreadable files
pub fn decode_file(path: &Path, default_sample_rate: u32) -> Result<SampleBuffer, AudioError> {
    match AudioFormat::from_path(path) {
        Some(AudioFormat::Wav) => decode_wav(path),
        Some(AudioFormat::Mp3) => mp3_placeholder(path, default_sample_rate),
        None => Err(AudioError::UnsupportedFormat(
            path.extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_else(|| path.display().to_string()),
        )),
    }
}

/// Exact PCM decode at the file's native rate
///
/// Integer samples are scaled by 2^(bits-1); channels are interleaved.
pub fn decode_wav(path: &Path) -> Result<SampleBuffer, AudioError> {
    let reader = hound::WavReader::open(path).map_err(|e| AudioError::decode(path, e))?;
    let spec = reader.spec();

    let samples: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>(),
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample.max(1) - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / scale))
                .collect::<Result<_, _>>()
        }
    }
    .map_err(|e| AudioError::decode(path, e))?;

    if samples.is_empty() {
        return Err(AudioError::decode(path, "file holds no audio frames"));
    }

    let channels = spec.channels.max(1) as usize;
    let frames = Array2::from_shape_vec((samples.len() / channels, channels), samples)
        .map_err(|e| AudioError::decode(path, e))?;

    let buffer = SampleBuffer::from_frames(frames, spec.sample_rate, BufferOrigin::Decoded)
        .map_err(|e| AudioError::decode(path, e))?;
    info!(
        path = %path.display(),
        samples = buffer.len(),
        sample_rate = buffer.sample_rate(),
        channels = buffer.channels(),
        "Decoded WAV"
    );
    Ok(buffer)
}

/// Silent stand-in for an MP3 file: `duration * default_sample_rate` zeros
///
/// Only container metadata is read; no PCM is decoded.
pub fn mp3_placeholder(path: &Path, default_sample_rate: u32) -> Result<SampleBuffer, AudioError> {
    let file = File::open(path).map_err(|e| AudioError::decode(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::decode(path, e))?;
    let mut format = probed.format;

    let (track_id, nominal_rate, n_frames) = {
        let track = format
            .default_track()
            .ok_or_else(|| AudioError::decode(path, "no audio track"))?;
        (track.id, track.codec_params.sample_rate, track.codec_params.n_frames)
    };
    let nominal_rate = nominal_rate.ok_or_else(|| AudioError::decode(path, "missing sample rate"))?;

    let frames = match n_frames {
        Some(frames) => frames,
        None => count_frames(format.as_mut(), track_id).map_err(|e| AudioError::decode(path, e))?,
    };
    let duration = frames as f64 / nominal_rate as f64;

    let buffer = SampleBuffer::silent(
        capture_len(duration, default_sample_rate),
        default_sample_rate,
        Some(nominal_rate),
    )
    .map_err(|e| AudioError::decode(path, e))?;
    warn!(
        path = %path.display(),
        seconds = duration,
        "MP3 audio is not decoded; using a silent placeholder"
    );
    Ok(buffer)
}

/// Sum packet durations when the container carries no frame count
fn count_frames(format: &mut dyn FormatReader, track_id: u32) -> Result<u64, SymphoniaError> {
    let mut frames = 0;
    loop {
        match format.next_packet() {
            Ok(packet) if packet.track_id() == track_id => frames += packet.dur,
            Ok(_) => {}
            Err(SymphoniaError::IoError(_)) => break,
            Err(err) => return Err(err),
        }
    }
    Ok(frames)
}
