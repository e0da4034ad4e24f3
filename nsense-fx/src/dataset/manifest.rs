//! JSON metadata for a dataset split

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::index::DatasetIndex;
use crate::error::FeatureResult;

/// One manifest row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub path: PathBuf,
    pub instrument: String,
    pub note: String,
    pub midi: u8,
}

/// Rows for every sample in `index`, in index order
pub fn build_manifest(index: &DatasetIndex) -> Vec<ManifestEntry> {
    index
        .samples()
        .iter()
        .map(|sample| ManifestEntry {
            filename: sample
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: sample.path.clone(),
            instrument: sample.instrument.to_string(),
            note: sample.note.to_string(),
            midi: sample.note.midi(),
        })
        .collect()
}

/// Write `index` as a pretty-printed JSON array
pub fn write_manifest(index: &DatasetIndex, out: &Path) -> FeatureResult<usize> {
    let entries = build_manifest(index);
    let json = serde_json::to_string_pretty(&entries)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(out, json)?;
    Ok(entries.len())
}
