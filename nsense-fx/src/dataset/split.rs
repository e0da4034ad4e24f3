//! Seeded train / validation / test split
//!
//! Each instrument's files are shuffled independently with the same seed and
//! cut by ratio, so every split keeps the instrument balance of the source.
//! Files are copied, never moved.

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{info, warn};

use super::scanner::AudioFileScanner;
use crate::error::{FeatureError, FeatureResult};
use nsense_common::{Instrument, LabelSpace};

/// Split destination directory names
pub const SPLIT_NAMES: [&str; 3] = ["train", "validation", "test"];

/// Train / validation / test fractions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    pub train: f64,
    pub validation: f64,
    pub test: f64,
}

impl SplitRatios {
    /// Test fraction is whatever remains after train and validation
    pub fn new(train: f64, validation: f64) -> FeatureResult<Self> {
        let ratios = Self {
            train,
            validation,
            test: 1.0 - train - validation,
        };
        ratios.validate()?;
        Ok(ratios)
    }

    pub fn validate(&self) -> FeatureResult<()> {
        let parts = [self.train, self.validation, self.test];
        if parts.iter().any(|r| !r.is_finite() || *r < -1e-9 || *r > 1.0 + 1e-9) {
            return Err(FeatureError::Configuration(format!(
                "split ratios must each lie in [0, 1], got {:?}",
                self
            )));
        }
        if (parts.iter().sum::<f64>() - 1.0).abs() > 1e-6 {
            return Err(FeatureError::Configuration(format!(
                "split ratios must sum to 1, got {:?}",
                self
            )));
        }
        Ok(())
    }

    /// Counts for `n` items; rounding remainder goes to test
    pub fn partition(&self, n: usize) -> (usize, usize, usize) {
        let train = ((n as f64) * self.train).round() as usize;
        let train = train.min(n);
        let validation = (((n as f64) * self.validation).round() as usize).min(n - train);
        (train, validation, n - train - validation)
    }
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.70,
            validation: 0.15,
            test: 0.15,
        }
    }
}

/// Files copied per split
#[derive(Debug, Clone, Default, Serialize)]
pub struct SplitSummary {
    pub train: usize,
    pub validation: usize,
    pub test: usize,
}

/// Shuffle each instrument's files with `seed` and copy them into
/// `dest/{train,validation,test}/<instrument>/`
pub fn split_dataset(
    source: &Path,
    dest: &Path,
    ratios: SplitRatios,
    seed: u64,
    scanner: &AudioFileScanner,
) -> FeatureResult<SplitSummary> {
    ratios.validate()?;
    let mut summary = SplitSummary::default();

    for instrument in Instrument::all() {
        let dir = source.join(instrument.as_str());
        if !dir.is_dir() {
            warn!(instrument = %instrument, dir = %dir.display(), "Instrument directory missing");
            continue;
        }

        let mut files = scanner.scan_dir(&dir)?;
        let mut rng = StdRng::seed_from_u64(seed);
        files.shuffle(&mut rng);

        let (n_train, n_val, _) = ratios.partition(files.len());
        let (train, rest) = files.split_at(n_train);
        let (validation, test) = rest.split_at(n_val);

        for (split, group) in SPLIT_NAMES.iter().zip([train, validation, test]) {
            copy_group(group, &dest.join(split).join(instrument.as_str()))?;
        }

        info!(
            instrument = %instrument,
            train = train.len(),
            validation = validation.len(),
            test = test.len(),
            "Split instrument"
        );
        summary.train += train.len();
        summary.validation += validation.len();
        summary.test += test.len();
    }

    Ok(summary)
}

fn copy_group(files: &[PathBuf], dir: &Path) -> FeatureResult<()> {
    fs::create_dir_all(dir)?;
    for file in files {
        if let Some(name) = file.file_name() {
            fs::copy(file, dir.join(name))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[test]
    fn test_ratios_validation() {
        assert!(SplitRatios::new(0.7, 0.15).is_ok());
        assert!(SplitRatios::new(0.9, 0.2).is_err());
        assert!(SplitRatios::new(-0.1, 0.5).is_err());
    }

    #[test]
    fn test_partition_counts() {
        let ratios = SplitRatios::default();
        assert_eq!(ratios.partition(20), (14, 3, 3));
        assert_eq!(ratios.partition(0), (0, 0, 0));
        let (a, b, c) = ratios.partition(7);
        assert_eq!(a + b + c, 7);
    }

    #[test]
    fn test_split_is_seeded_and_complete() {
        let source = TempDir::new().unwrap();
        let piano = source.path().join("piano");
        fs::create_dir_all(&piano).unwrap();
        for i in 0..20 {
            fs::write(piano.join(format!("C4_{:03}.wav", i)), b"x").unwrap();
        }

        let scanner = AudioFileScanner::default();
        let dest_a = TempDir::new().unwrap();
        let dest_b = TempDir::new().unwrap();
        let ratios = SplitRatios::default();
        let summary = split_dataset(source.path(), dest_a.path(), ratios, 42, &scanner).unwrap();
        split_dataset(source.path(), dest_b.path(), SplitRatios::default(), 42, &scanner).unwrap();

        assert_eq!((summary.train, summary.validation, summary.test), (14, 3, 3));
        for split in SPLIT_NAMES {
            let a = names(&dest_a.path().join(split).join("piano"));
            let b = names(&dest_b.path().join(split).join("piano"));
            assert_eq!(a, b);
        }

        let mut all: Vec<String> = SPLIT_NAMES
            .iter()
            .flat_map(|split| names(&dest_a.path().join(split).join("piano")))
            .collect();
        all.sort();
        assert_eq!(all, names(&piano));
    }
}
