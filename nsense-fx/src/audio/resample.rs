//! Band-limited mono resampling
//!
//! Uses rubato's windowed-sinc `SincFixedIn` (BlackmanHarris2 window,
//! 256-tap filter, 0.95 cutoff). The whole signal is processed as one chunk,
//! which rubato already delay-compensates; the tail is flushed so the result
//! is time-aligned and exactly `round(len × ratio)` samples long.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use thiserror::Error;

/// Resampling errors
#[derive(Debug, Error)]
pub enum ResampleError {
    /// Ratio is zero, negative or not finite
    #[error("Invalid resample ratio: {0}")]
    InvalidRatio(f64),

    /// Resampler could not be constructed for these parameters
    #[error("Resampler construction failed: {0}")]
    Construction(#[from] rubato::ResamplerConstructionError),

    /// Resampler failed while processing
    #[error("Resampling failed: {0}")]
    Process(#[from] rubato::ResampleError),
}

/// Upper bound on zero-input flush calls after the main chunk
const MAX_FLUSHES: usize = 16;

/// Resample mono samples from `source_rate` to `target_rate`
pub fn resample_mono(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, ResampleError> {
    if source_rate == 0 {
        return Err(ResampleError::InvalidRatio(f64::INFINITY));
    }
    resample_by_ratio(samples, target_rate as f64 / source_rate as f64)
}

/// Resample mono samples by `ratio` (output rate / input rate)
pub fn resample_by_ratio(samples: &[f32], ratio: f64) -> Result<Vec<f32>, ResampleError> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(ResampleError::InvalidRatio(ratio));
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    if (ratio - 1.0).abs() <= f64::EPSILON {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let chunk_size = samples.len();
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)?;

    let expected = (samples.len() as f64 * ratio).round() as usize;

    let input = vec![samples.to_vec()];
    let mut output = resampler
        .process(&input, None)?
        .into_iter()
        .next()
        .unwrap_or_default();

    // Flush the filter tail with zero-padded partial chunks
    let mut flushes = 0;
    while output.len() < expected && flushes < MAX_FLUSHES {
        let tail = resampler.process_partial(None::<&[Vec<f32>]>, None)?;
        if let Some(channel) = tail.into_iter().next() {
            output.extend_from_slice(&channel);
        }
        flushes += 1;
    }

    let mut resampled: Vec<f32> = output.into_iter().take(expected).collect();
    resampled.resize(expected, 0.0);

    tracing::trace!(
        input_frames = samples.len(),
        output_frames = resampled.len(),
        ratio,
        "Resampled mono signal"
    );

    Ok(resampled)
}
