//! Min-max rescaling of spectrograms to [0, 1]

use tracing::warn;

use super::tensor::Spectrogram;

/// Added to the denominator so a flat input never divides by zero
pub const NORMALIZE_EPSILON: f32 = 1e-8;

/// Result of normalizing one spectrogram
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationOutcome {
    pub spectrogram: Spectrogram,
    /// Input had no dynamic range (max == min); output is all zeros
    pub degenerate: bool,
}

/// Rescales each spectrogram by its own min and max
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureNormalizer;

impl FeatureNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// `(x - min) / (max - min + 1e-8)`, clamped to [0, 1]
    pub fn normalize(&self, mut spectrogram: Spectrogram) -> NormalizationOutcome {
        let (min, max) = spectrogram.min_max();
        let degenerate = max <= min;

        if degenerate {
            warn!(
                value = min,
                shape = ?spectrogram.shape(),
                "Degenerate spectrogram with no dynamic range"
            );
            spectrogram.as_mut_slice().iter_mut().for_each(|v| *v = 0.0);
        } else {
            let scale = 1.0 / (max - min + NORMALIZE_EPSILON);
            for v in spectrogram.as_mut_slice() {
                let scaled = (*v - min) * scale;
                // NaN inputs become 0
                *v = if scaled.is_nan() { 0.0 } else { scaled.clamp(0.0, 1.0) };
            }
        }

        NormalizationOutcome {
            spectrogram,
            degenerate,
        }
    }
}
