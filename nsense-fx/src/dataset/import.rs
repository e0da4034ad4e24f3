//! NSynth import
//!
//! Reads `examples.json` from an extracted NSynth split and copies the
//! keyboard and string notes whose MIDI pitch falls inside the note label
//! range into `dest/<instrument>/<note>_<nnn>.wav`. Examples are visited in
//! id order, so numbering is stable across runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FeatureError, FeatureResult};
use nsense_common::{Instrument, Note};

/// Metadata file at the root of an NSynth split
pub const NSYNTH_METADATA: &str = "examples.json";

#[derive(Debug, Deserialize)]
struct NsynthExample {
    #[serde(default)]
    instrument_family_str: String,
    #[serde(default)]
    pitch: u8,
}

/// Outcome of one import run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub copied: BTreeMap<Instrument, usize>,
    /// Pitch outside C3..B5
    pub out_of_range: usize,
    /// Instrument family with no label
    pub other_family: usize,
    /// Listed in the metadata but no `audio/<id>.wav`
    pub missing_audio: usize,
}

impl ImportSummary {
    pub fn total_copied(&self) -> usize {
        self.copied.values().sum()
    }
}

/// Label for an NSynth instrument family, if it has one
pub fn nsynth_instrument(family: &str) -> Option<Instrument> {
    match family {
        "keyboard" => Some(Instrument::Piano),
        "string" => Some(Instrument::Violin),
        _ => None,
    }
}

/// Copy labeled NSynth notes from `nsynth_dir` into a dataset root at `dest`
pub fn import_nsynth(nsynth_dir: &Path, dest: &Path) -> FeatureResult<ImportSummary> {
    let metadata_path = nsynth_dir.join(NSYNTH_METADATA);
    let raw = fs::read_to_string(&metadata_path)?;
    let examples: BTreeMap<String, NsynthExample> = serde_json::from_str(&raw)
        .map_err(|e| FeatureError::label(&metadata_path, format!("invalid metadata: {}", e)))?;

    let mut summary = ImportSummary::default();
    let mut per_note: BTreeMap<(Instrument, Note), usize> = BTreeMap::new();

    for (id, example) in &examples {
        let Some(instrument) = nsynth_instrument(&example.instrument_family_str) else {
            summary.other_family += 1;
            continue;
        };
        let Some(note) = Note::from_midi(example.pitch) else {
            summary.out_of_range += 1;
            continue;
        };

        let source = nsynth_dir.join("audio").join(format!("{}.wav", id));
        if !source.is_file() {
            debug!(id = %id, "Audio file missing");
            summary.missing_audio += 1;
            continue;
        }

        let ordinal = per_note.entry((instrument, note)).or_insert(0);
        *ordinal += 1;

        let dir = dest.join(instrument.as_str());
        fs::create_dir_all(&dir)?;
        fs::copy(&source, dir.join(format!("{}_{:03}.wav", note, ordinal)))?;
        *summary.copied.entry(instrument).or_insert(0) += 1;
    }

    info!(
        source = %nsynth_dir.display(),
        dest = %dest.display(),
        copied = summary.total_copied(),
        out_of_range = summary.out_of_range,
        other_family = summary.other_family,
        missing_audio = summary.missing_audio,
        "NSynth import finished"
    );

    Ok(summary)
}
