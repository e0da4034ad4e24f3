//! End-to-end feature pipeline
//!
//! file → load (mono, canonical rate) → trim silence → fix duration →
//! [augment] → log-mel spectrogram → min-max normalize → `(n_mels, frames, 1)`
//!
//! Training and inference share this one type; the only difference is
//! whether an RNG is passed for augmentation.

use std::path::Path;

use rand::Rng;
use tracing::debug;

use crate::audio::{resample_mono, AudioSignal, DurationNormalizer, SignalLoader, SilenceTrimmer};
use crate::augment::AugmentationEngine;
use crate::config::PipelineConfig;
use crate::error::FeatureResult;
use crate::features::{FeatureNormalizer, FeatureTensor, NormalizationOutcome, SpectralExtractor};

/// Features for one clip plus the data-quality flag
#[derive(Debug, Clone)]
pub struct ExtractedFeatures {
    pub tensor: FeatureTensor,
    /// Spectrogram had no dynamic range (e.g. an all-silent clip)
    pub degenerate: bool,
}

/// Immutable, thread-safe feature pipeline
#[derive(Debug)]
pub struct FeaturePipeline {
    config: PipelineConfig,
    loader: SignalLoader,
    trimmer: Option<SilenceTrimmer>,
    duration: DurationNormalizer,
    augmentation: AugmentationEngine,
    extractor: SpectralExtractor,
    normalizer: FeatureNormalizer,
}

impl FeaturePipeline {
    /// Validate `config` and precompute every stage
    pub fn new(config: PipelineConfig) -> FeatureResult<Self> {
        config.validate()?;

        let audio = &config.audio;
        let trimmer = audio
            .trim_silence
            .then(|| SilenceTrimmer::new(audio.silence_threshold_db));

        Ok(Self {
            loader: SignalLoader::new(audio.sample_rate),
            trimmer,
            duration: DurationNormalizer::new(audio.target_samples),
            augmentation: AugmentationEngine::new(
                config.augmentation.clone(),
                audio.target_samples,
            )?,
            extractor: SpectralExtractor::new(config.mel.clone())?,
            normalizer: FeatureNormalizer::new(),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// `(n_mels, frames, 1)` of every tensor this pipeline produces
    pub fn output_shape(&self) -> [usize; 3] {
        let mel = &self.config.mel;
        [mel.n_mels, mel.frame_count(self.config.audio.target_samples), 1]
    }

    /// Load, trim and fix the duration of one file
    pub fn load_signal(&self, path: &Path) -> FeatureResult<AudioSignal> {
        let signal = self.loader.load(path)?;
        Ok(self.condition(signal))
    }

    /// Trim and fix the duration of an already decoded signal
    ///
    /// Signals at another rate are resampled first.
    pub fn prepare_signal(&self, signal: &AudioSignal) -> FeatureResult<AudioSignal> {
        let rate = self.config.audio.sample_rate;
        let resampled = if signal.sample_rate == rate {
            signal.clone()
        } else {
            AudioSignal::new(resample_mono(&signal.samples, signal.sample_rate, rate)?, rate)
        };
        Ok(self.condition(resampled))
    }

    fn condition(&self, signal: AudioSignal) -> AudioSignal {
        let trimmed = match &self.trimmer {
            Some(trimmer) => trimmer.trim(&signal.samples),
            None => signal.samples,
        };
        AudioSignal::new(self.duration.normalize(&trimmed), signal.sample_rate)
    }

    /// Spectrogram features of a prepared, fixed-length signal
    pub fn features(&self, samples: &[f32]) -> ExtractedFeatures {
        let spectrogram = self.extractor.extract(samples);
        let NormalizationOutcome {
            spectrogram,
            degenerate,
        } = self.normalizer.normalize(spectrogram);

        ExtractedFeatures {
            tensor: FeatureTensor::new(spectrogram),
            degenerate,
        }
    }

    /// Inference path: no augmentation
    pub fn process_file(&self, path: &Path) -> FeatureResult<ExtractedFeatures> {
        let signal = self.load_signal(path)?;
        debug!(path = %path.display(), samples = signal.len(), "Extracting features");
        Ok(self.features(&signal.samples))
    }

    /// Training path: augmentation draws come from `rng`
    pub fn process_file_augmented<R: Rng + ?Sized>(
        &self,
        path: &Path,
        rng: &mut R,
    ) -> FeatureResult<ExtractedFeatures> {
        let signal = self.load_signal(path)?;
        let augmented = self.augmentation.apply(&signal.samples, rng)?;
        Ok(self.features(&augmented))
    }

    /// Run the pipeline on an in-memory signal, optionally augmented
    pub fn process_signal<R: Rng + ?Sized>(
        &self,
        signal: &AudioSignal,
        rng: Option<&mut R>,
    ) -> FeatureResult<ExtractedFeatures> {
        let prepared = self.prepare_signal(signal)?;
        let samples = match rng {
            Some(rng) => self.augmentation.apply(&prepared.samples, rng)?,
            None => prepared.samples,
        };
        Ok(self.features(&samples))
    }
}
