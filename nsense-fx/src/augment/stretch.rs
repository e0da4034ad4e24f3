//! Phase-vocoder time stretching
//!
//! Changes duration without changing pitch. The signal is analysed with a
//! centered STFT (2048 / 512, periodic Hann), frames are resampled along the
//! time axis at `rate` with linear magnitude interpolation and accumulated
//! phase advance, and the result is resynthesised by weighted overlap-add.
//! Output length is `round(len / rate)`.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Analysis window length
pub const STRETCH_N_FFT: usize = 2048;

/// Analysis hop
pub const STRETCH_HOP: usize = 512;

/// Stretch `samples` by `rate` (> 1 shortens, < 1 lengthens)
///
/// Returns a copy of the input when `rate` is 1.0 or not a positive finite
/// number.
pub fn time_stretch(samples: &[f32], rate: f32) -> Vec<f32> {
    if samples.is_empty() || !rate.is_finite() || rate <= 0.0 || (rate - 1.0).abs() < 1e-6 {
        return samples.to_vec();
    }

    let vocoder = PhaseVocoder::new(STRETCH_N_FFT, STRETCH_HOP);
    let target_len = (samples.len() as f64 / rate as f64).round() as usize;

    let spectrum = vocoder.stft(samples);
    let stretched = vocoder.stretch_frames(&spectrum, rate as f64);
    vocoder.istft(&stretched, target_len)
}

struct PhaseVocoder {
    n_fft: usize,
    hop: usize,
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl PhaseVocoder {
    fn new(n_fft: usize, hop: usize) -> Self {
        let window = (0..n_fft)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n_fft as f32).cos()))
            .collect();
        let mut planner = FftPlanner::new();
        Self {
            n_fft,
            hop,
            window,
            forward: planner.plan_fft_forward(n_fft),
            inverse: planner.plan_fft_inverse(n_fft),
        }
    }

    fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Centered, zero-padded STFT; one `Vec` of positive bins per frame
    fn stft(&self, samples: &[f32]) -> Vec<Vec<Complex<f32>>> {
        let pad = self.n_fft / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let n_frames = 1 + samples.len() / self.hop;
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];

        (0..n_frames)
            .map(|t| {
                let frame = &padded[t * self.hop..t * self.hop + self.n_fft];
                for ((slot, &s), &w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                    *slot = Complex::new(s * w, 0.0);
                }
                self.forward.process(&mut buffer);
                buffer[..self.n_bins()].to_vec()
            })
            .collect()
    }

    /// Resample STFT frames along time at `rate`
    fn stretch_frames(&self, frames: &[Vec<Complex<f32>>], rate: f64) -> Vec<Vec<Complex<f32>>> {
        let n_bins = self.n_bins();
        let n_frames = frames.len();
        if n_frames == 0 {
            return Vec::new();
        }

        // Expected phase advance per hop for each bin
        let phi_advance: Vec<f32> = (0..n_bins)
            .map(|k| PI * self.hop as f32 * k as f32 / (n_bins - 1) as f32)
            .collect();

        let zeros = vec![Complex::new(0.0f32, 0.0); n_bins];
        let column = |i: usize| frames.get(i).unwrap_or(&zeros);

        let mut phase_acc: Vec<f32> = frames[0].iter().map(|c| c.arg()).collect();
        let n_steps = (n_frames as f64 / rate).ceil() as usize;
        let mut output = Vec::with_capacity(n_steps);

        for step in (0..n_steps).map(|t| t as f64 * rate).take_while(|&s| s < n_frames as f64) {
            let idx = step.floor() as usize;
            let alpha = (step - idx as f64) as f32;
            let left = column(idx);
            let right = column(idx + 1);

            let mut frame = Vec::with_capacity(n_bins);
            for k in 0..n_bins {
                let mag = (1.0 - alpha) * left[k].norm() + alpha * right[k].norm();
                frame.push(Complex::from_polar(mag, phase_acc[k]));

                let mut dphase = right[k].arg() - left[k].arg() - phi_advance[k];
                dphase -= 2.0 * PI * (dphase / (2.0 * PI)).round();
                phase_acc[k] += phi_advance[k] + dphase;
            }
            output.push(frame);
        }

        output
    }

    /// Weighted overlap-add resynthesis trimmed/padded to `length`
    fn istft(&self, frames: &[Vec<Complex<f32>>], length: usize) -> Vec<f32> {
        let n_fft = self.n_fft;
        let pad = n_fft / 2;
        let total = n_fft + self.hop * frames.len().saturating_sub(1);

        let mut signal = vec![0.0f32; total];
        let mut window_sum = vec![0.0f32; total];
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
        let scale = 1.0 / n_fft as f32;

        for (t, bins) in frames.iter().enumerate() {
            // Rebuild the full conjugate-symmetric spectrum
            for (k, slot) in buffer.iter_mut().enumerate() {
                *slot = if k < bins.len() {
                    bins[k]
                } else {
                    bins[n_fft - k].conj()
                };
            }
            self.inverse.process(&mut buffer);

            let offset = t * self.hop;
            for (i, (c, &w)) in buffer.iter().zip(&self.window).enumerate() {
                signal[offset + i] += c.re * scale * w;
                window_sum[offset + i] += w * w;
            }
        }

        for (s, &ws) in signal.iter_mut().zip(&window_sum) {
            if ws > f32::MIN_POSITIVE.sqrt() {
                *s /= ws;
            }
        }

        let mut out: Vec<f32> = signal.into_iter().skip(pad).take(length).collect();
        out.resize(length, 0.0);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / 22050.0).sin() * 0.5)
            .collect()
    }

    fn zero_crossings(samples: &[f32]) -> usize {
        samples
            .windows(2)
            .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
            .count()
    }

    #[test]
    fn test_unit_rate_is_identity() {
        let input = sine(440.0, 44100);
        assert_eq!(time_stretch(&input, 1.0), input);
    }

    #[test]
    fn test_speedup_length() {
        let input = sine(440.0, 44100);
        let output = time_stretch(&input, 1.1);
        assert_eq!(output.len(), (44100.0f64 / 1.1).round() as usize);
    }

    #[test]
    fn test_slowdown_length() {
        let input = sine(440.0, 22050);
        let output = time_stretch(&input, 0.9);
        assert_eq!(output.len(), (22050.0f64 / 0.9).round() as usize);
    }

    #[test]
    fn test_pitch_preserved() {
        let input = sine(440.0, 44100);
        let output = time_stretch(&input, 0.8);

        // Crossings per sample in the steady middle section
        let rate_in = zero_crossings(&input[4096..40000]) as f32 / (40000 - 4096) as f32;
        let mid = &output[4096..output.len() - 4096];
        let rate_out = zero_crossings(mid) as f32 / mid.len() as f32;

        assert!(
            (rate_out - rate_in).abs() / rate_in < 0.05,
            "crossing rate {} vs {}",
            rate_out,
            rate_in
        );
    }

    #[test]
    fn test_reconstruction_keeps_level() {
        let input = sine(440.0, 22050);
        let output = time_stretch(&input, 1.05);
        let mid = &output[4096..output.len() - 4096];
        let rms = (mid.iter().map(|s| s * s).sum::<f32>() / mid.len() as f32).sqrt();
        let expected = 0.5 / std::f32::consts::SQRT_2;
        assert!((rms - expected).abs() / expected < 0.2, "rms {}", rms);
    }
}
