//! Label-preserving signal augmentation
//!
//! Transforms run in a fixed order: time stretch, pitch shift, noise, gain.
//! Each enabled transform is applied with its configured probability; all
//! randomness comes from the caller's RNG, via [`AugmentationDraws`], so a
//! seeded RNG makes augmentation reproducible. Inputs are never mutated.

pub mod level;
pub mod pitch;
pub mod stretch;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::audio::fix_length;
use crate::error::{FeatureError, FeatureResult};
use nsense_common::config::AugmentationSection;

pub use level::{add_noise, apply_gain};
pub use pitch::pitch_shift;
pub use stretch::time_stretch;

/// Largest pitch shift accepted in either direction, in semitones
pub const MAX_PITCH_SHIFT: i32 = 12;

/// Enable flags, value ranges and probabilities for every transform
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentationParameters {
    pub time_stretch: bool,
    /// Inclusive stretch rate range
    pub stretch_range: (f32, f32),
    pub stretch_probability: f64,

    pub pitch_shift: bool,
    /// Inclusive semitone range
    pub pitch_range: (i32, i32),
    pub pitch_probability: f64,

    pub noise: bool,
    pub snr_db_range: (f32, f32),
    pub noise_probability: f64,

    pub gain: bool,
    pub gain_db_range: (f32, f32),
    pub gain_probability: f64,
}

impl AugmentationParameters {
    /// Every transform switched off
    pub fn disabled() -> Self {
        Self {
            time_stretch: false,
            pitch_shift: false,
            noise: false,
            gain: false,
            ..Self::default()
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.time_stretch || self.pitch_shift || self.noise || self.gain
    }

    pub fn validate(&self) -> FeatureResult<()> {
        check_range("time_stretch_range", self.stretch_range)?;
        if self.stretch_range.0 <= 0.0 {
            return Err(FeatureError::Configuration(format!(
                "time_stretch_range must be positive, got {:?}",
                self.stretch_range
            )));
        }

        let (lo, hi) = self.pitch_range;
        if lo > hi || lo < -MAX_PITCH_SHIFT || hi > MAX_PITCH_SHIFT {
            return Err(FeatureError::Configuration(format!(
                "pitch_shift_range must be ordered and within ±{} semitones, got {:?}",
                MAX_PITCH_SHIFT, self.pitch_range
            )));
        }

        check_range("noise_snr_db_range", self.snr_db_range)?;
        if self.snr_db_range.0 < 0.0 {
            return Err(FeatureError::Configuration(format!(
                "noise_snr_db_range must be non-negative, got {:?}",
                self.snr_db_range
            )));
        }

        check_range("gain_db_range", self.gain_db_range)?;

        for (name, p) in [
            ("time_stretch_probability", self.stretch_probability),
            ("pitch_shift_probability", self.pitch_probability),
            ("noise_probability", self.noise_probability),
            ("gain_probability", self.gain_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(FeatureError::Configuration(format!(
                    "{} must be within [0, 1], got {}",
                    name, p
                )));
            }
        }

        Ok(())
    }
}

fn check_range(name: &str, (lo, hi): (f32, f32)) -> FeatureResult<()> {
    if !lo.is_finite() || !hi.is_finite() || lo > hi {
        return Err(FeatureError::Configuration(format!(
            "{} must be a finite [min, max] pair, got [{}, {}]",
            name, lo, hi
        )));
    }
    Ok(())
}

impl Default for AugmentationParameters {
    fn default() -> Self {
        Self::from(&AugmentationSection::default())
    }
}

impl From<&AugmentationSection> for AugmentationParameters {
    fn from(section: &AugmentationSection) -> Self {
        let pair = |r: [f32; 2]| (r[0], r[1]);
        Self {
            time_stretch: section.time_stretch,
            stretch_range: pair(section.time_stretch_range),
            stretch_probability: section.time_stretch_probability,
            pitch_shift: section.pitch_shift,
            pitch_range: (section.pitch_shift_range[0], section.pitch_shift_range[1]),
            pitch_probability: section.pitch_shift_probability,
            noise: section.noise,
            snr_db_range: pair(section.noise_snr_db_range),
            noise_probability: section.noise_probability,
            gain: section.gain,
            gain_db_range: pair(section.gain_db_range),
            gain_probability: section.gain_probability,
        }
    }
}

/// Concrete values for one augmentation pass; `None` skips the transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AugmentationDraws {
    pub stretch_rate: Option<f32>,
    pub pitch_semitones: Option<i32>,
    pub snr_db: Option<f32>,
    pub gain_db: Option<f32>,
}

impl AugmentationDraws {
    /// Draw gates and values from `rng`
    ///
    /// Consumes the RNG in a fixed order (stretch, pitch, noise, gain) so the
    /// same seed always yields the same draws for the same parameters.
    /// Parameters are validated first; nothing is drawn if they are invalid.
    pub fn draw<R: Rng + ?Sized>(
        params: &AugmentationParameters,
        rng: &mut R,
    ) -> FeatureResult<Self> {
        params.validate()?;
        Ok(Self::draw_validated(params, rng))
    }

    /// `params` must already have passed [`AugmentationParameters::validate`]
    fn draw_validated<R: Rng + ?Sized>(params: &AugmentationParameters, rng: &mut R) -> Self {
        let mut draws = Self::default();

        if params.time_stretch && rng.gen_bool(params.stretch_probability) {
            let (lo, hi) = params.stretch_range;
            draws.stretch_rate = Some(rng.gen_range(lo..=hi));
        }
        if params.pitch_shift && rng.gen_bool(params.pitch_probability) {
            let (lo, hi) = params.pitch_range;
            draws.pitch_semitones = Some(rng.gen_range(lo..=hi));
        }
        if params.noise && rng.gen_bool(params.noise_probability) {
            let (lo, hi) = params.snr_db_range;
            draws.snr_db = Some(rng.gen_range(lo..=hi));
        }
        if params.gain && rng.gen_bool(params.gain_probability) {
            let (lo, hi) = params.gain_db_range;
            draws.gain_db = Some(rng.gen_range(lo..=hi));
        }

        draws
    }

    pub fn is_identity(&self) -> bool {
        self.stretch_rate.is_none()
            && self.pitch_semitones.is_none()
            && self.snr_db.is_none()
            && self.gain_db.is_none()
    }
}

/// Applies augmentation to fixed-length signals
#[derive(Debug, Clone)]
pub struct AugmentationEngine {
    params: AugmentationParameters,
    target_samples: usize,
}

impl AugmentationEngine {
    pub fn new(params: AugmentationParameters, target_samples: usize) -> FeatureResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            target_samples,
        })
    }

    pub fn parameters(&self) -> &AugmentationParameters {
        &self.params
    }

    /// Draw fresh values from `rng` and apply them
    pub fn apply<R: Rng + ?Sized>(&self, samples: &[f32], rng: &mut R) -> FeatureResult<Vec<f32>> {
        let draws = AugmentationDraws::draw_validated(&self.params, rng);
        self.apply_draws(samples, &draws, rng)
    }

    /// Apply explicit draws; `rng` only feeds the noise generator
    pub fn apply_draws<R: Rng + ?Sized>(
        &self,
        samples: &[f32],
        draws: &AugmentationDraws,
        rng: &mut R,
    ) -> FeatureResult<Vec<f32>> {
        trace!(?draws, "Applying augmentation");

        let mut signal = match draws.stretch_rate {
            Some(rate) => fix_length(&time_stretch(samples, rate), self.target_samples),
            None => samples.to_vec(),
        };

        if let Some(semitones) = draws.pitch_semitones {
            signal = pitch_shift(&signal, semitones)?;
        }
        if let Some(snr_db) = draws.snr_db {
            signal = add_noise(&signal, snr_db, rng);
        }
        if let Some(gain_db) = draws.gain_db {
            signal = apply_gain(&signal, gain_db);
        }

        Ok(signal)
    }
}
