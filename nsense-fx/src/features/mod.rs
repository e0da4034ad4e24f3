//! Spectral feature extraction and normalization

pub mod mel;
pub mod normalize;
pub mod tensor;

pub use mel::{MelConfig, SpectralExtractor};
pub use normalize::{FeatureNormalizer, NormalizationOutcome};
pub use tensor::{FeatureBatch, FeatureTensor, Spectrogram};
