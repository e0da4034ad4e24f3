//! Validated pipeline configuration for nsense-fx
//!
//! Converts the TOML schema from `nsense_common::config` into the parameter
//! structs each stage consumes. Validation happens once, at construction;
//! nothing downstream re-checks these values per sample.

use crate::augment::AugmentationParameters;
use crate::error::{FeatureError, FeatureResult};
use crate::features::mel::MelConfig;
use nsense_common::config::TomlConfig;

/// Signal loading and framing parameters
#[derive(Debug, Clone, PartialEq)]
pub struct AudioConfig {
    /// Canonical sample rate in Hz
    pub sample_rate: u32,
    /// Exact sample count every clip is padded/truncated to
    pub target_samples: usize,
    pub trim_silence: bool,
    /// Silence threshold in dB below the clip peak
    pub silence_threshold_db: f32,
}

/// Dataset indexing and batching parameters
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    pub batch_size: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
    /// Lowercase allowed extensions
    pub extensions: Vec<String>,
}

/// Complete, validated configuration for one pipeline instance
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub audio: AudioConfig,
    pub mel: MelConfig,
    pub augmentation: AugmentationParameters,
    pub dataset: DatasetConfig,
}

impl PipelineConfig {
    /// Convert and validate a TOML configuration
    pub fn from_toml(toml: &TomlConfig) -> FeatureResult<Self> {
        let config = Self::from(toml);
        config.validate()?;
        Ok(config)
    }

    /// Check every stage's parameters
    pub fn validate(&self) -> FeatureResult<()> {
        let audio = &self.audio;
        if !(1_000..=384_000).contains(&audio.sample_rate) {
            return Err(config_error(format!(
                "sample_rate must be 1000-384000 Hz, got {}",
                audio.sample_rate
            )));
        }
        if audio.target_samples == 0 {
            return Err(config_error("duration must yield at least one sample"));
        }
        if !audio.silence_threshold_db.is_finite() || audio.silence_threshold_db <= 0.0 {
            return Err(config_error(format!(
                "silence_threshold_db must be positive dB below peak, got {}",
                audio.silence_threshold_db
            )));
        }

        self.mel.validate(audio.sample_rate)?;
        self.augmentation.validate()?;

        let dataset = &self.dataset;
        if dataset.batch_size == 0 {
            return Err(config_error("batch_size must be at least 1"));
        }
        if dataset.extensions.is_empty() {
            return Err(config_error("extension allow-list is empty"));
        }

        Ok(())
    }
}

impl From<&TomlConfig> for PipelineConfig {
    fn from(toml: &TomlConfig) -> Self {
        let seconds = toml.audio.duration_seconds;
        let target_samples = if seconds.is_finite() && seconds > 0.0 {
            (seconds * toml.audio.sample_rate as f64).round() as usize
        } else {
            0
        };

        Self {
            audio: AudioConfig {
                sample_rate: toml.audio.sample_rate,
                target_samples,
                trim_silence: toml.audio.trim_silence,
                silence_threshold_db: toml.audio.silence_threshold_db,
            },
            mel: MelConfig {
                sample_rate: toml.audio.sample_rate,
                n_fft: toml.spectrogram.n_fft,
                hop_length: toml.spectrogram.hop_length,
                n_mels: toml.spectrogram.n_mels,
                fmin: 0.0,
                fmax: toml.spectrogram.fmax_hz,
                top_db: toml.spectrogram.top_db,
            },
            augmentation: AugmentationParameters::from(&toml.augmentation),
            dataset: DatasetConfig {
                batch_size: toml.dataset.batch_size,
                shuffle: toml.dataset.shuffle,
                seed: toml.dataset.seed,
                extensions: toml
                    .dataset
                    .extensions
                    .iter()
                    .map(|ext| ext.trim_start_matches('.').to_lowercase())
                    .collect(),
            },
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&TomlConfig::default())
    }
}

fn config_error(message: impl Into<String>) -> FeatureError {
    FeatureError::Configuration(message.into())
}
