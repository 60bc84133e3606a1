//! Loading a recorded track: WAV decode, mono mixdown, resample to the
//! output rate. Blocking; run it on a blocking thread.

use rubato::{FftFixedIn, Resampler};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::TrackError;

const RESAMPLE_CHUNK: usize = 1024;

pub struct DecodedTrack {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Reads a WAV file and averages its channels down to mono.
pub fn decode_wav(path: &Path) -> Result<DecodedTrack, TrackError> {
    let mut reader = hound::WavReader::open(path).map_err(|e| TrackError::Open(format!("{}: {}", path.display(), e)))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| TrackError::Decode(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| TrackError::Decode(e.to_string()))?
        }
    };

    if interleaved.is_empty() {
        return Err(TrackError::Empty);
    }

    let samples = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok(DecodedTrack {
        samples,
        sample_rate: spec.sample_rate,
    })
}

pub fn resample(input: Vec<f32>, from: u32, to: u32) -> Result<Vec<f32>, TrackError> {
    if from == to || input.is_empty() {
        return Ok(input);
    }

    let err = |e: &dyn std::fmt::Display| TrackError::Resample(e.to_string());
    let mut resampler =
        FftFixedIn::<f32>::new(from as usize, to as usize, RESAMPLE_CHUNK, 2, 1).map_err(|e| err(&e))?;

    let expected = (input.len() as f64 * to as f64 / from as f64).round() as usize;
    let delay = resampler.output_delay();
    let mut out = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

    let mut pos = 0;
    while input.len() - pos >= resampler.input_frames_next() {
        let n = resampler.input_frames_next();
        let block = resampler.process(&[&input[pos..pos + n]], None).map_err(|e| err(&e))?;
        out.extend_from_slice(&block[0]);
        pos += n;
    }
    if pos < input.len() {
        let block = resampler
            .process_partial(Some(&[&input[pos..]]), None)
            .map_err(|e| err(&e))?;
        out.extend_from_slice(&block[0]);
    }
    // Flush what the filter still holds.
    while out.len() < expected + delay {
        let block = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| err(&e))?;
        if block[0].is_empty() {
            break;
        }
        out.extend_from_slice(&block[0]);
    }

    Ok(out.into_iter().skip(delay).take(expected).collect())
}

/// Decode and resample in one go, ready for `SynthEngine::play_track`.
pub fn load_track(path: &Path, target_rate: u32) -> Result<Arc<[f32]>, TrackError> {
    let decoded = decode_wav(path)?;
    debug!(
        "Decoded {} ({} frames @ {}Hz)",
        path.display(),
        decoded.samples.len(),
        decoded.sample_rate
    );
    let samples = resample(decoded.samples, decoded.sample_rate, target_rate)?;
    if samples.is_empty() {
        return Err(TrackError::Empty);
    }
    Ok(samples.into())
}
