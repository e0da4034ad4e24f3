//! Pitch shifting by whole semitones
//!
//! Stretch by `2^(-k/12)` then resample by the same ratio, which restores
//! the original duration while scaling every frequency by `2^(k/12)`.

use super::stretch::time_stretch;
use crate::audio::{fix_length, resample_by_ratio, ResampleError};

/// Shift `samples` by `semitones`; output has the input's length
pub fn pitch_shift(samples: &[f32], semitones: i32) -> Result<Vec<f32>, ResampleError> {
    if semitones == 0 || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let rate = 2.0f64.powf(-(semitones as f64) / 12.0);
    let stretched = time_stretch(samples, rate as f32);
    let shifted = resample_by_ratio(&stretched, rate)?;

    Ok(fix_length(&shifted, samples.len()))
}
