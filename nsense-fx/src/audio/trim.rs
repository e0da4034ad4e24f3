//! Leading/trailing silence removal
//!
//! Frames the signal (2048 samples, hop 512, centered with zero padding),
//! computes per-frame mean power and keeps the span from the first to the
//! last frame whose power is within `threshold_db` of the loudest frame.
//! The threshold is relative to the clip's own peak, so quiet recordings
//! are trimmed the same way as loud ones.

use tracing::warn;

/// Analysis frame length in samples
pub const TRIM_FRAME_LENGTH: usize = 2048;

/// Hop between analysis frames in samples
pub const TRIM_HOP_LENGTH: usize = 512;

/// Power floor used before taking logarithms
const POWER_FLOOR: f64 = 1e-10;

/// Removes leading and trailing low-energy regions
#[derive(Debug, Clone, Copy)]
pub struct SilenceTrimmer {
    /// dB below the clip peak that counts as silence
    threshold_db: f32,
    frame_length: usize,
    hop_length: usize,
}

impl SilenceTrimmer {
    pub fn new(threshold_db: f32) -> Self {
        Self {
            threshold_db,
            frame_length: TRIM_FRAME_LENGTH,
            hop_length: TRIM_HOP_LENGTH,
        }
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    /// Sample span `[start, end)` of non-silent content
    ///
    /// Returns `None` when no frame rises above the floor (digital silence).
    pub fn non_silent_span(&self, samples: &[f32]) -> Option<(usize, usize)> {
        if samples.is_empty() {
            return None;
        }

        let powers = self.frame_powers(samples);
        let max_power = powers.iter().copied().fold(0.0f64, f64::max);
        if max_power < POWER_FLOOR {
            return None;
        }

        let ref_db = 10.0 * max_power.max(POWER_FLOOR).log10();
        let threshold = -(self.threshold_db as f64);
        let is_loud = |p: &f64| 10.0 * p.max(POWER_FLOOR).log10() - ref_db > threshold;

        let first = powers.iter().position(is_loud)?;
        let last = powers.iter().rposition(is_loud)?;

        let start = first * self.hop_length;
        let end = ((last + 1) * self.hop_length).min(samples.len());
        if start >= end {
            return None;
        }
        Some((start, end))
    }

    /// Trim leading and trailing silence
    ///
    /// A fully silent clip trims to an empty vector.
    pub fn trim(&self, samples: &[f32]) -> Vec<f32> {
        match self.non_silent_span(samples) {
            Some((start, end)) => samples[start..end].to_vec(),
            None => {
                if !samples.is_empty() {
                    warn!(samples = samples.len(), "Clip is entirely silent");
                }
                Vec::new()
            }
        }
    }

    /// Mean power of each centered frame
    fn frame_powers(&self, samples: &[f32]) -> Vec<f64> {
        let pad = self.frame_length / 2;
        let n_frames = 1 + samples.len() / self.hop_length;

        (0..n_frames)
            .map(|frame| {
                // Frame covers padded[frame*hop .. frame*hop + frame_length]
                let padded_start = frame * self.hop_length;
                let start = padded_start.saturating_sub(pad);
                let end = (padded_start + self.frame_length)
                    .saturating_sub(pad)
                    .min(samples.len());
                let sum_squares: f64 = if start < end {
                    samples[start..end].iter().map(|&s| (s as f64).powi(2)).sum()
                } else {
                    0.0
                };
                sum_squares / self.frame_length as f64
            })
            .collect()
    }
}

impl Default for SilenceTrimmer {
    fn default() -> Self {
        Self::new(20.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 22050.0).sin() * amplitude)
            .collect()
    }

    #[test]
    fn test_trims_leading_and_trailing_silence() {
        let mut samples = vec![0.0f32; 11025];
        samples.extend(tone(22050, 0.5));
        samples.extend(vec![0.0f32; 11025]);

        let trimmed = SilenceTrimmer::new(20.0).trim(&samples);

        // Frame granularity: within a couple of frames of the tone length
        let slack = 2 * TRIM_FRAME_LENGTH;
        assert!(trimmed.len() >= 22050);
        assert!(trimmed.len() <= 22050 + slack, "len {}", trimmed.len());
    }

    #[test]
    fn test_span_keeps_tone_region() {
        let mut samples = vec![0.0f32; 8192];
        samples.extend(tone(8192, 0.8));
        samples.extend(vec![0.0f32; 8192]);

        let (start, end) = SilenceTrimmer::new(20.0).non_silent_span(&samples).unwrap();
        assert!(start <= 8192 && start >= 8192 - TRIM_FRAME_LENGTH);
        assert!(end >= 16384 && end <= 16384 + TRIM_FRAME_LENGTH);
    }

    #[test]
    fn test_quiet_clip_trimmed_relative_to_own_peak() {
        let mut samples = vec![0.0f32; 8192];
        samples.extend(tone(8192, 0.01));
        samples.extend(vec![0.0f32; 8192]);

        let trimmed = SilenceTrimmer::new(20.0).trim(&samples);
        assert!(trimmed.len() < samples.len());
        assert!(trimmed.len() >= 8192);
    }

    #[test]
    fn test_all_silent_returns_empty() {
        let trimmed = SilenceTrimmer::new(20.0).trim(&vec![0.0f32; 4096]);
        assert!(trimmed.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(SilenceTrimmer::default().trim(&[]).is_empty());
    }

    #[test]
    fn test_continuous_tone_untouched() {
        let samples = tone(22050, 0.5);
        let trimmed = SilenceTrimmer::new(20.0).trim(&samples);
        assert_eq!(trimmed.len(), samples.len());
    }

    #[test]
    fn test_frame_count_matches_centered_framing() {
        let trimmer = SilenceTrimmer::new(20.0);
        assert_eq!(trimmer.frame_powers(&vec![0.1; 44100]).len(), 87);
    }
}
