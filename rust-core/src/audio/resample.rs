//! Sample-rate conversion for playback on devices that cannot run at the
//! buffer's native rate

use rubato::{FftFixedIn, Resampler};

use crate::error::AudioError;

/// Input frames per resampler chunk
const RESAMPLE_CHUNK: usize = 1024;

/// Convert planar channels from `from_rate` to `to_rate`
///
/// All channels must have the same length. Returns the input unchanged when
/// the rates already match.
pub fn resample(channels: &[Vec<f64>], from_rate: u32, to_rate: u32) -> Result<Vec<Vec<f64>>, AudioError> {
    if from_rate == to_rate || channels.is_empty() {
        return Ok(channels.to_vec());
    }

    let mut resampler = FftFixedIn::<f64>::new(
        from_rate as usize,
        to_rate as usize,
        RESAMPLE_CHUNK,
        2,
        channels.len(),
    )
    .map_err(|e| AudioError::Resample(e.to_string()))?;

    let total = channels[0].len();
    let expected = (total as f64 * to_rate as f64 / from_rate as f64).ceil() as usize;
    // The filter shifts its output late by this many frames
    let delay = resampler.output_delay();
    let mut output: Vec<Vec<f64>> = vec![Vec::with_capacity(expected + delay); channels.len()];

    let mut pos = 0;
    while pos < total {
        let end = (pos + resampler.input_frames_next()).min(total);
        let chunk: Vec<&[f64]> = channels.iter().map(|ch| &ch[pos..end]).collect();

        let processed = if end - pos == resampler.input_frames_next() {
            resampler.process(chunk.as_slice(), None)
        } else {
            // Final short chunk is zero-padded by the resampler
            resampler.process_partial(Some(chunk.as_slice()), None)
        }
        .map_err(|e| AudioError::Resample(e.to_string()))?;

        for (out, block) in output.iter_mut().zip(processed) {
            out.extend(block);
        }
        pos = end;
    }

    // Flush frames still held back by the delay
    while output[0].len() < delay + expected {
        let processed = resampler
            .process_partial(None::<&[&[f64]]>, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        for (out, block) in output.iter_mut().zip(processed) {
            out.extend(block);
        }
    }

    for out in output.iter_mut() {
        out.drain(..delay);
        out.truncate(expected);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_identity() {
        let channels = vec![vec![0.1, 0.2, 0.3]];
        assert_eq!(resample(&channels, 8000, 8000).unwrap(), channels);
    }

    #[test]
    fn test_upsample_doubles_length() {
        let channels = vec![vec![0.0; 8000], vec![0.5; 8000]];
        let out = resample(&channels, 8000, 16000).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), out[1].len());
        assert_eq!(out[0].len(), 16000);
    }

    #[test]
    fn test_step_stays_aligned_after_upsampling() {
        // Silence for the first half second, then a constant level
        let mut signal = vec![0.0; 4000];
        signal.extend(vec![0.5; 4000]);

        let out = resample(&[signal], 8000, 16000).unwrap();
        let rise = out[0].iter().position(|&s| s > 0.25).unwrap();

        assert!((rise as i64 - 8000).abs() < 50, "step moved to {rise}");
        assert!((out[0][15800] - 0.5).abs() < 0.05, "tail {}", out[0][15800]);
    }

    #[test]
    fn test_downsample_to_device_rate() {
        let channels = vec![vec![0.25; 48000]];
        let out = resample(&channels, 48000, 44100).unwrap();
        assert_eq!(out[0].len(), 44100);
    }
}
