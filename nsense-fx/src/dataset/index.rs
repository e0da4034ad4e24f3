//! Labeled sample discovery
//!
//! Layout: `root/<instrument>/<note>_<ordinal>[_<suffix>].<ext>`. The note is
//! the file name's text before the first underscore. Files whose labels do
//! not parse are logged once and left out of the index.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::scanner::AudioFileScanner;
use crate::error::{FeatureError, FeatureResult};
use nsense_common::{Instrument, LabelSpace, Note};

/// One labeled audio file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledSample {
    pub path: PathBuf,
    pub instrument: Instrument,
    pub note: Note,
}

/// A file left out of the index, with the reason
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Note token of a file name: text before the first underscore of the stem
pub fn note_token(path: &Path) -> Option<&str> {
    let stem = path.file_stem()?.to_str()?;
    stem.split('_').next().filter(|token| !token.is_empty())
}

/// Build a sample from a file path and its instrument
pub fn parse_sample_path(path: &Path, instrument: Instrument) -> FeatureResult<LabeledSample> {
    let token =
        note_token(path).ok_or_else(|| FeatureError::label(path, "file name has no note token"))?;
    let note: Note = token
        .parse()
        .map_err(|e: nsense_common::Error| FeatureError::label(path, e))?;

    Ok(LabeledSample {
        path: path.to_path_buf(),
        instrument,
        note,
    })
}

/// Ordered collection of labeled samples
#[derive(Debug, Clone, Default)]
pub struct DatasetIndex {
    samples: Vec<LabeledSample>,
    skipped: Vec<SkippedFile>,
}

impl DatasetIndex {
    /// Scan `root` for `<instrument>/<note>_*.<ext>` files
    ///
    /// Order: instrument declaration order, then file name. Missing
    /// instrument directories and unknown directories are warned about and
    /// skipped. Fails only when `root` itself cannot be read.
    pub fn build(root: &Path, scanner: &AudioFileScanner) -> FeatureResult<Self> {
        if !root.is_dir() {
            return Err(FeatureError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("dataset root not found: {}", root.display()),
            )));
        }

        let mut index = Self::default();

        for dir in scanner.subdirectories(root)? {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if name.parse::<Instrument>().is_err() {
                let err =
                    FeatureError::label(&dir, format!("unknown instrument directory '{}'", name));
                warn!(error = %err, "Skipping directory");
                index.skipped.push(SkippedFile {
                    path: dir,
                    reason: err.to_string(),
                });
            }
        }

        for instrument in Instrument::all() {
            let dir = root.join(instrument.as_str());
            if !dir.is_dir() {
                warn!(
                    instrument = %instrument,
                    dir = %dir.display(),
                    "Instrument directory missing"
                );
                continue;
            }

            let files = scanner.scan_dir(&dir)?;
            debug!(instrument = %instrument, files = files.len(), "Scanned instrument directory");

            for path in files {
                match parse_sample_path(&path, instrument) {
                    Ok(sample) => index.samples.push(sample),
                    Err(e) => {
                        warn!(error = %e, "Skipping unlabeled file");
                        index.skipped.push(SkippedFile {
                            path,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            root = %root.display(),
            samples = index.samples.len(),
            skipped = index.skipped.len(),
            "Dataset index built"
        );

        Ok(index)
    }

    pub fn from_samples(samples: Vec<LabeledSample>) -> Self {
        Self {
            samples,
            skipped: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    pub fn get(&self, index: usize) -> Option<&LabeledSample> {
        self.samples.get(index)
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    pub fn counts_by_instrument(&self) -> BTreeMap<Instrument, usize> {
        let mut counts = BTreeMap::new();
        for sample in &self.samples {
            *counts.entry(sample.instrument).or_insert(0) += 1;
        }
        counts
    }

    /// Sample counts per note, in note order
    pub fn counts_by_note(&self) -> BTreeMap<Note, usize> {
        let mut counts = BTreeMap::new();
        for sample in &self.samples {
            *counts.entry(sample.note).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_dated_file_name() {
        let sample =
            parse_sample_path(Path::new("data/piano/C4_003_20240101.wav"), Instrument::Piano)
                .unwrap();
        assert_eq!(sample.instrument, Instrument::Piano);
        assert_eq!(sample.note.name(), "C4");
    }

    #[test]
    fn test_parse_sharp_and_bare_names() {
        let sample = parse_sample_path(Path::new("F#5_010.flac"), Instrument::Violin).unwrap();
        assert_eq!(sample.note.name(), "F#5");

        let sample = parse_sample_path(Path::new("A3.wav"), Instrument::Violin).unwrap();
        assert_eq!(sample.note.name(), "A3");
    }

    #[test]
    fn test_unknown_note_rejected() {
        let result = parse_sample_path(Path::new("H9_001.wav"), Instrument::Piano);
        assert!(matches!(result, Err(FeatureError::LabelParse { .. })));

        let result = parse_sample_path(Path::new("_001.wav"), Instrument::Piano);
        assert!(matches!(result, Err(FeatureError::LabelParse { .. })));
    }

    #[test]
    fn test_build_orders_and_skips() {
        let root = TempDir::new().unwrap();
        let violin = root.path().join("violin");
        let piano = root.path().join("piano");
        let drums = root.path().join("drums");
        fs::create_dir_all(&violin).unwrap();
        fs::create_dir_all(&piano).unwrap();
        fs::create_dir_all(&drums).unwrap();

        fs::write(violin.join("A4_001.wav"), b"x").unwrap();
        fs::write(piano.join("D4_001.wav"), b"x").unwrap();
        fs::write(piano.join("C4_001.wav"), b"x").unwrap();
        fs::write(piano.join("H9_001.wav"), b"x").unwrap();
        fs::write(piano.join("readme.md"), b"x").unwrap();
        fs::write(drums.join("C4_001.wav"), b"x").unwrap();

        let index = DatasetIndex::build(root.path(), &AudioFileScanner::default()).unwrap();

        let labels: Vec<(Instrument, &str)> = index
            .samples()
            .iter()
            .map(|s| (s.instrument, s.note.name()))
            .collect();
        assert_eq!(
            labels,
            vec![
                (Instrument::Piano, "C4"),
                (Instrument::Piano, "D4"),
                (Instrument::Violin, "A4"),
            ]
        );
        // H9 file and the drums directory
        assert_eq!(index.skipped().len(), 2);
        assert_eq!(index.counts_by_instrument()[&Instrument::Piano], 2);
    }

    #[test]
    fn test_build_missing_root_errors() {
        let result =
            DatasetIndex::build(Path::new("/nonexistent/root"), &AudioFileScanner::default());
        assert!(result.is_err());
    }
}
