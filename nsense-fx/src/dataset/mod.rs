//! Labeled dataset discovery, batching and tooling

pub mod generator;
pub mod import;
pub mod index;
pub mod manifest;
pub mod scanner;
pub mod split;

pub use generator::{BatchGenerator, GeneratorMode};
pub use import::{import_nsynth, ImportSummary};
pub use index::{parse_sample_path, DatasetIndex, LabeledSample, SkippedFile};
pub use manifest::{build_manifest, write_manifest, ManifestEntry};
pub use scanner::AudioFileScanner;
pub use split::{split_dataset, SplitRatios, SplitSummary};
