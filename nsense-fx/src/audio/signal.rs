//! Mono PCM signal container

/// Mono PCM samples at a known sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    /// Mono samples (f32, nominal range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioSignal {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Peak absolute amplitude (0.0 for an empty signal)
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, &s| peak.max(s.abs()))
    }

    /// Mean squared amplitude (0.0 for an empty signal)
    pub fn mean_power(&self) -> f64 {
        mean_power(&self.samples)
    }
}

/// Mean squared amplitude, accumulated in f64
pub fn mean_power(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| (s as f64).powi(2)).sum();
    sum_squares / samples.len() as f64
}
