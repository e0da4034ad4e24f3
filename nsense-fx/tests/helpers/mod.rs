//! Test Helper Utilities
//!
//! Shared utilities for nsense-fx integration tests

#![allow(dead_code)]

pub mod audio_generator;

use nsense_fx::PipelineConfig;

/// Default pipeline configuration with a fixed seed and small batches
pub fn test_config(batch_size: usize, seed: u64) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.dataset.batch_size = batch_size;
    config.dataset.seed = Some(seed);
    config
}
