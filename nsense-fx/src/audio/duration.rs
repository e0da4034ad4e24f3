//! Fixed-length framing

/// Pads or truncates signals to an exact sample count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationNormalizer {
    target_samples: usize,
}

impl DurationNormalizer {
    pub fn new(target_samples: usize) -> Self {
        Self { target_samples }
    }

    /// Build from a duration in seconds at `sample_rate`
    pub fn from_seconds(duration_seconds: f64, sample_rate: u32) -> Self {
        Self::new((duration_seconds * sample_rate as f64).round() as usize)
    }

    pub fn target_samples(&self) -> usize {
        self.target_samples
    }

    /// Zero-pad at the end or keep the first `target_samples` samples
    pub fn normalize(&self, samples: &[f32]) -> Vec<f32> {
        fix_length(samples, self.target_samples)
    }
}

/// Zero-pad at the end or truncate to exactly `target` samples
pub fn fix_length(samples: &[f32], target: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(target);
    out.extend_from_slice(&samples[..samples.len().min(target)]);
    out.resize(target, 0.0);
    out
}
