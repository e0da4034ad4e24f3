//! nsense-fx: single-note audio feature pipeline
//!
//! Turns recordings of single musical notes into fixed-shape log-mel feature
//! tensors `(n_mels, frames, 1)` in [0, 1], with seeded label-preserving
//! augmentation and reproducible batching for training.

pub mod audio;
pub mod augment;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod inference;
pub mod pipeline;
pub mod synth;

pub use crate::config::PipelineConfig;
pub use crate::error::{FeatureError, FeatureResult};
pub use crate::inference::{Classifier, ClassifierOutput, InferenceContext, Prediction};
pub use crate::pipeline::{ExtractedFeatures, FeaturePipeline};
