//! Error types for nsense-fx
//!
//! Per-sample errors (`AudioDecode`, `LabelParse`) are recoverable at the
//! batch and index level: the sample is skipped and the caller continues.
//! `Configuration` errors only occur while constructing a pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Feature pipeline error type
#[derive(Debug, Error)]
pub enum FeatureError {
    /// File unreadable, corrupt, empty or using an unsupported codec
    #[error("Audio decode failed for {path}: {reason}")]
    AudioDecode { path: PathBuf, reason: String },

    /// Filename note token or instrument directory not in the label space
    #[error("Label parse failed for {path}: {reason}")]
    LabelParse { path: PathBuf, reason: String },

    /// Invalid pipeline or augmentation configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Classifier collaborator failed or returned malformed output
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Batch index outside `0..len()`
    #[error("Batch index {index} out of range (batch count {count})")]
    BatchOutOfRange { index: usize, count: usize },

    /// Band-limited resampling failed
    #[error("Resample error: {0}")]
    Resample(#[from] crate::audio::resample::ResampleError),

    /// WAV encoding failed
    #[error("WAV write error: {0}")]
    Wav(#[from] hound::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// nsense-common error
    #[error("Common error: {0}")]
    Common(#[from] nsense_common::Error),
}

impl FeatureError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        FeatureError::AudioDecode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn label(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        FeatureError::LabelParse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for feature pipeline operations
pub type FeatureResult<T> = Result<T, FeatureError>;
