//! Log-power mel spectrogram
//!
//! Matches librosa's mel spectrogram defaults with peak-referenced dB conversion:
//! periodic Hann window, centered frames with `n_fft / 2` zero padding,
//! power spectrum, Slaney mel scale with Slaney area normalization, then
//! dB relative to the spectrogram's own peak floored at `-top_db`.

use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::tensor::Spectrogram;
use crate::error::{FeatureError, FeatureResult};

/// Power floor for the dB conversion
pub const AMIN: f32 = 1e-10;

/// Mel spectrogram parameters
#[derive(Debug, Clone, PartialEq)]
pub struct MelConfig {
    /// Sample rate of input audio
    pub sample_rate: u32,
    /// FFT window size
    pub n_fft: usize,
    /// Hop length between frames
    pub hop_length: usize,
    /// Number of mel bands
    pub n_mels: usize,
    /// Lowest filterbank frequency in Hz
    pub fmin: f32,
    /// Highest filterbank frequency in Hz
    pub fmax: f32,
    /// Dynamic range kept below the peak, in dB
    pub top_db: f32,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            fmin: 0.0,
            fmax: 8000.0,
            top_db: 80.0,
        }
    }
}

impl MelConfig {
    /// Check the parameters against the signal sample rate
    pub fn validate(&self, sample_rate: u32) -> FeatureResult<()> {
        let invalid = |msg: String| Err(FeatureError::Configuration(msg));

        if self.sample_rate != sample_rate {
            return invalid(format!(
                "mel sample_rate {} differs from audio sample_rate {}",
                self.sample_rate, sample_rate
            ));
        }
        if self.n_fft < 16 {
            return invalid(format!("n_fft must be at least 16, got {}", self.n_fft));
        }
        if self.hop_length == 0 || self.hop_length > self.n_fft {
            return invalid(format!(
                "hop_length must be 1..=n_fft ({}), got {}",
                self.n_fft, self.hop_length
            ));
        }
        if self.n_mels == 0 {
            return invalid("n_mels must be at least 1".to_string());
        }
        let nyquist = sample_rate as f32 / 2.0;
        if !self.fmax.is_finite() || self.fmax <= self.fmin || self.fmax > nyquist {
            return invalid(format!(
                "fmax must lie in ({}, {}] Hz, got {}",
                self.fmin, nyquist, self.fmax
            ));
        }
        if !self.fmin.is_finite() || self.fmin < 0.0 {
            return invalid(format!("fmin must be non-negative, got {}", self.fmin));
        }
        if !self.top_db.is_finite() || self.top_db <= 0.0 {
            return invalid(format!("top_db must be positive, got {}", self.top_db));
        }
        Ok(())
    }

    /// STFT frame count for a signal of `n_samples`
    pub fn frame_count(&self, n_samples: usize) -> usize {
        1 + n_samples / self.hop_length
    }
}

/// Mel spectrogram extractor with precomputed window, filterbank and FFT plan
pub struct SpectralExtractor {
    config: MelConfig,
    /// `n_mels` filters over `n_fft / 2 + 1` bins
    mel_basis: Vec<Vec<f32>>,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl fmt::Debug for SpectralExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectralExtractor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SpectralExtractor {
    pub fn new(config: MelConfig) -> FeatureResult<Self> {
        config.validate(config.sample_rate)?;

        let mel_basis = create_mel_filterbank(
            config.sample_rate,
            config.n_fft,
            config.n_mels,
            config.fmin,
            config.fmax,
        );
        let window = hann_window(config.n_fft);
        let fft = FftPlanner::new().plan_fft_forward(config.n_fft);

        Ok(Self {
            config,
            mel_basis,
            window,
            fft,
        })
    }

    pub fn config(&self) -> &MelConfig {
        &self.config
    }

    /// Mel power spectrogram (linear power, not dB)
    pub fn mel_power(&self, samples: &[f32]) -> Spectrogram {
        let power = self.power_spectrum(samples);
        let frames = power.len();
        let n_mels = self.config.n_mels;

        let mut data = vec![0.0f32; n_mels * frames];
        for (t, frame) in power.iter().enumerate() {
            for (m, filter) in self.mel_basis.iter().enumerate() {
                data[m * frames + t] = filter.iter().zip(frame).map(|(w, p)| w * p).sum();
            }
        }

        Spectrogram::from_row_major(n_mels, frames, data)
            .unwrap_or_else(|| Spectrogram::zeros(n_mels, frames))
    }

    /// Log-power mel spectrogram in dB relative to its own peak
    ///
    /// Values lie in `[-top_db, 0]`.
    pub fn extract(&self, samples: &[f32]) -> Spectrogram {
        let mut spectrogram = self.mel_power(samples);
        power_to_db(spectrogram.as_mut_slice(), self.config.top_db);
        spectrogram
    }

    /// Power spectrum per centered frame, `n_fft / 2 + 1` bins each
    fn power_spectrum(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let pad = n_fft / 2;

        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let n_frames = self.config.frame_count(samples.len());
        let n_bins = n_fft / 2 + 1;

        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        (0..n_frames)
            .map(|i| {
                let frame = &padded[i * hop..i * hop + n_fft];
                for ((slot, &s), &w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                    *slot = Complex::new(s * w, 0.0);
                }
                self.fft.process_with_scratch(&mut buffer, &mut scratch);
                buffer[..n_bins].iter().map(|c| c.norm_sqr()).collect()
            })
            .collect()
    }
}

/// In-place `10·log10(S / peak)` with `AMIN` floor, clipped at `-top_db`
pub fn power_to_db(values: &mut [f32], top_db: f32) {
    let peak = values.iter().copied().fold(0.0f32, f32::max);
    let ref_db = 10.0 * peak.max(AMIN).log10();

    let mut max_db = f32::NEG_INFINITY;
    for v in values.iter_mut() {
        *v = 10.0 * v.max(AMIN).log10() - ref_db;
        max_db = max_db.max(*v);
    }

    let floor = max_db - top_db;
    values.iter_mut().for_each(|v| *v = v.max(floor));
}

/// Slaney mel scale: linear below 1 kHz, logarithmic above
pub fn hz_to_mel(f: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    const LOGSTEP: f32 = 0.068_751_74; // ln(6.4) / 27

    if f < MIN_LOG_HZ {
        f / F_SP
    } else {
        MIN_LOG_MEL + (f / MIN_LOG_HZ).ln() / LOGSTEP
    }
}

pub fn mel_to_hz(m: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    const LOGSTEP: f32 = 0.068_751_74;

    if m < MIN_LOG_MEL {
        m * F_SP
    } else {
        MIN_LOG_HZ * ((m - MIN_LOG_MEL) * LOGSTEP).exp()
    }
}

/// Triangular Slaney-normalized filterbank (`librosa.filters.mel` defaults)
fn create_mel_filterbank(
    sample_rate: u32,
    n_fft: usize,
    n_mels: usize,
    fmin: f32,
    fmax: f32,
) -> Vec<Vec<f32>> {
    let n_freqs = n_fft / 2 + 1;

    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    let hz_points: Vec<f32> = (0..=n_mels + 1)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();

    let fft_freqs: Vec<f32> = (0..n_freqs)
        .map(|i| i as f32 * sample_rate as f32 / n_fft as f32)
        .collect();

    let mut filterbank = vec![vec![0.0f32; n_freqs]; n_mels];

    for (i, filter) in filterbank.iter_mut().enumerate() {
        let f_lower = hz_points[i];
        let f_center = hz_points[i + 1];
        let f_upper = hz_points[i + 2];

        for (weight, &freq) in filter.iter_mut().zip(&fft_freqs) {
            let lower = if f_center > f_lower {
                (freq - f_lower) / (f_center - f_lower)
            } else {
                0.0
            };
            let upper = if f_upper > f_center {
                (f_upper - freq) / (f_upper - f_center)
            } else {
                0.0
            };
            *weight = lower.min(upper).max(0.0);
        }

        let band_width = f_upper - f_lower;
        if band_width > 0.0 {
            let enorm = 2.0 / band_width;
            filter.iter_mut().for_each(|w| *w *= enorm);
        }
    }

    filterbank
}

/// Periodic Hann window
fn hann_window(length: usize) -> Vec<f32> {
    (0..length)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / length as f32).cos()))
        .collect()
}
