//! Reproducible epoch batching
//!
//! The generator owns a sample permutation that only changes in
//! [`BatchGenerator::reshuffle`], which takes `&mut self`. Batch retrieval
//! takes `&self`, so any number of workers can share one generator between
//! epoch boundaries.
//!
//! Augmentation randomness is keyed by `(seed, epoch, sample index)`, so a
//! sample's features do not depend on which batch or thread produced them.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::index::{DatasetIndex, LabeledSample};
use crate::config::DatasetConfig;
use crate::error::{FeatureError, FeatureResult};
use crate::features::{FeatureBatch, FeatureTensor};
use crate::pipeline::FeaturePipeline;
use nsense_common::LabelSpace;

/// Stream key for the permutation RNG, distinct from any sample index
const PERMUTATION_STREAM: u64 = u64::MAX;

/// Whether batches are augmented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorMode {
    Training,
    Evaluation,
}

/// Batches of `(features, instrument one-hot, note one-hot)`
#[derive(Debug)]
pub struct BatchGenerator {
    index: DatasetIndex,
    pipeline: Arc<FeaturePipeline>,
    mode: GeneratorMode,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
    epoch: u64,
    order: Vec<usize>,
}

impl BatchGenerator {
    /// Build a generator and draw the first epoch's permutation
    ///
    /// Without a configured seed, one is drawn from OS entropy and logged.
    pub fn new(
        index: DatasetIndex,
        pipeline: Arc<FeaturePipeline>,
        config: &DatasetConfig,
        mode: GeneratorMode,
    ) -> FeatureResult<Self> {
        if config.batch_size == 0 {
            return Err(FeatureError::Configuration(
                "batch_size must be at least 1".to_string(),
            ));
        }

        let seed = config.seed.unwrap_or_else(rand::random);
        info!(
            samples = index.len(),
            batch_size = config.batch_size,
            shuffle = config.shuffle,
            seed,
            ?mode,
            "Batch generator created"
        );

        let mut generator = Self {
            order: (0..index.len()).collect(),
            index,
            pipeline,
            mode,
            batch_size: config.batch_size,
            shuffle: config.shuffle,
            seed,
            epoch: 0,
        };
        generator.permute();
        Ok(generator)
    }

    /// Number of batches per epoch: `ceil(samples / batch_size)`
    pub fn len(&self) -> usize {
        self.index.len().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.index.len()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn mode(&self) -> GeneratorMode {
        self.mode
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Current epoch's sample order (indices into the dataset index)
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn index(&self) -> &DatasetIndex {
        &self.index
    }

    /// Advance to the next epoch and draw a new permutation
    pub fn reshuffle(&mut self) {
        self.epoch += 1;
        self.permute();
        debug!(epoch = self.epoch, "Reshuffled");
    }

    fn permute(&mut self) {
        self.order = (0..self.index.len()).collect();
        if self.shuffle {
            let seed = stream_seed(self.seed, self.epoch, PERMUTATION_STREAM);
            let mut rng = StdRng::seed_from_u64(seed);
            self.order.shuffle(&mut rng);
        }
    }

    /// Dataset indices making up batch `batch`
    pub fn batch_indices(&self, batch: usize) -> FeatureResult<&[usize]> {
        let count = self.len();
        if batch >= count {
            return Err(FeatureError::BatchOutOfRange { index: batch, count });
        }
        let start = batch * self.batch_size;
        let end = (start + self.batch_size).min(self.order.len());
        Ok(&self.order[start..end])
    }

    /// Build batch `batch` sequentially
    pub fn get(&self, batch: usize) -> FeatureResult<FeatureBatch> {
        let indices = self.batch_indices(batch)?;
        let results: Vec<_> = indices.iter().map(|&i| self.sample_features(i)).collect();
        Ok(self.assemble(batch, indices, results))
    }

    /// Build batch `batch` with samples processed on the rayon pool
    pub fn get_parallel(&self, batch: usize) -> FeatureResult<FeatureBatch> {
        let indices = self.batch_indices(batch)?;
        let results: Vec<_> = indices.par_iter().map(|&i| self.sample_features(i)).collect();
        Ok(self.assemble(batch, indices, results))
    }

    /// Iterate every batch of the current epoch
    pub fn iter(&self) -> impl Iterator<Item = FeatureBatch> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i).ok())
    }

    fn sample_features(&self, sample_index: usize) -> FeatureResult<FeatureTensor> {
        let sample = self.sample(sample_index)?;
        let extracted = match self.mode {
            GeneratorMode::Training => {
                let mut rng = StdRng::seed_from_u64(stream_seed(
                    self.seed,
                    self.epoch,
                    sample_index as u64,
                ));
                self.pipeline.process_file_augmented(&sample.path, &mut rng)?
            }
            GeneratorMode::Evaluation => self.pipeline.process_file(&sample.path)?,
        };
        if extracted.degenerate {
            warn!(path = %sample.path.display(), "Degenerate sample kept in batch");
        }
        Ok(extracted.tensor)
    }

    fn sample(&self, sample_index: usize) -> FeatureResult<&LabeledSample> {
        self.index.get(sample_index).ok_or(FeatureError::BatchOutOfRange {
            index: sample_index,
            count: self.index.len(),
        })
    }

    fn assemble(
        &self,
        batch: usize,
        indices: &[usize],
        results: Vec<FeatureResult<FeatureTensor>>,
    ) -> FeatureBatch {
        let mut out = FeatureBatch::default();
        for (&i, result) in indices.iter().zip(results) {
            match (result, self.index.get(i)) {
                (Ok(tensor), Some(sample)) => {
                    out.push(tensor, sample.instrument.one_hot(), sample.note.one_hot())
                }
                (Err(e), _) => {
                    warn!(batch, sample = i, error = %e, "Skipping sample");
                    out.skipped += 1;
                }
                (Ok(_), None) => out.skipped += 1,
            }
        }
        out
    }
}

/// SplitMix64 finalizer
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Independent RNG seed for one `(seed, epoch, stream)` triple
pub fn stream_seed(seed: u64, epoch: u64, stream: u64) -> u64 {
    splitmix64(splitmix64(splitmix64(seed) ^ epoch) ^ stream)
}
