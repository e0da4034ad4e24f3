//! Additive noise and gain

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::audio::signal::mean_power;

/// Add zero-mean Gaussian noise at `snr_db` relative to the signal power
///
/// Noise variance is `mean(x²) / 10^(snr_db / 10)`. A silent input is
/// returned unchanged.
pub fn add_noise<R: Rng + ?Sized>(samples: &[f32], snr_db: f32, rng: &mut R) -> Vec<f32> {
    let signal_power = mean_power(samples);
    let noise_power = signal_power / 10f64.powf(snr_db as f64 / 10.0);
    let std_dev = noise_power.sqrt();

    let normal = match Normal::new(0.0, std_dev) {
        Ok(normal) if std_dev > 0.0 => normal,
        _ => return samples.to_vec(),
    };

    samples
        .iter()
        .map(|&s| s + normal.sample(rng) as f32)
        .collect()
}

/// Scale by `10^(gain_db / 20)`
pub fn apply_gain(samples: &[f32], gain_db: f32) -> Vec<f32> {
    let gain = 10f32.powf(gain_db / 20.0);
    samples.iter().map(|&s| s * gain).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_noise_hits_requested_snr() {
        let input: Vec<f32> = (0..22050)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 22050.0).sin() * 0.5)
            .collect();
        let mut rng = StdRng::seed_from_u64(7);
        let noisy = add_noise(&input, 20.0, &mut rng);

        let noise: Vec<f32> = noisy.iter().zip(&input).map(|(n, s)| n - s).collect();
        let snr = 10.0 * (mean_power(&input) / mean_power(&noise)).log10();
        assert!((snr - 20.0).abs() <= 1.0, "measured SNR {}", snr);
    }

    #[test]
    fn test_noise_on_silence_is_noop() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(add_noise(&[0.0; 64], 30.0, &mut rng), vec![0.0; 64]);
    }

    #[test]
    fn test_gain_db() {
        let out = apply_gain(&[0.5, -0.25], 20.0);
        assert!((out[0] - 5.0).abs() < 1e-5);
        assert!((out[1] + 2.5).abs() < 1e-5);

        let out = apply_gain(&[1.0], -6.0);
        assert!((out[0] - 0.501).abs() < 1e-3);
    }
}
