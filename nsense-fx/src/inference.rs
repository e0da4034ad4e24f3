//! Single-file inference
//!
//! [`InferenceContext`] is built once at startup and shared read-only. It
//! runs the pipeline without augmentation, hands the `(1, n_mels, frames, 1)`
//! tensor to a [`Classifier`] and ranks the two output distributions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{FeatureError, FeatureResult};
use crate::features::FeatureTensor;
use crate::pipeline::FeaturePipeline;
use nsense_common::{Instrument, LabelSpace, Note};

/// Raw classifier output: one probability per label, in label order
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierOutput {
    pub instrument: Vec<f32>,
    pub note: Vec<f32>,
}

/// Dual-head classification model
pub trait Classifier: Send + Sync {
    /// Classify one feature tensor (batch dimension of 1 implied)
    fn classify(&self, features: &FeatureTensor) -> FeatureResult<ClassifierOutput>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentScore {
    pub instrument: Instrument,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteScore {
    pub note: Note,
    pub midi: u8,
    pub confidence: f32,
}

/// Ranked prediction for one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub instrument: InstrumentScore,
    pub note: NoteScore,
    pub top_instruments: Vec<InstrumentScore>,
    pub top_notes: Vec<NoteScore>,
    /// Input had no dynamic range; scores are unreliable
    pub degenerate_input: bool,
}

/// Immutable pipeline + classifier pair
#[derive(Clone)]
pub struct InferenceContext {
    pipeline: Arc<FeaturePipeline>,
    classifier: Arc<dyn Classifier>,
}

impl InferenceContext {
    pub fn new(pipeline: Arc<FeaturePipeline>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            pipeline,
            classifier,
        }
    }

    pub fn pipeline(&self) -> &FeaturePipeline {
        &self.pipeline
    }

    /// Extract features for `path` and rank the top `top_k` labels per head
    pub fn predict(&self, path: &Path, top_k: usize) -> FeatureResult<Prediction> {
        let extracted = self.pipeline.process_file(path)?;
        let output = self.classifier.classify(&extracted.tensor)?;

        check_len("instrument", &output.instrument, Instrument::COUNT)?;
        check_len("note", &output.note, Note::COUNT)?;

        let k = top_k.max(1);
        let top_instruments: Vec<InstrumentScore> = rank(&output.instrument, k)
            .into_iter()
            .filter_map(|(i, confidence)| {
                Instrument::from_index(i).map(|instrument| InstrumentScore {
                    instrument,
                    confidence,
                })
            })
            .collect();
        let top_notes: Vec<NoteScore> = rank(&output.note, k)
            .into_iter()
            .filter_map(|(i, confidence)| {
                Note::from_index(i).map(|note| NoteScore {
                    note,
                    midi: note.midi(),
                    confidence,
                })
            })
            .collect();

        let (instrument, note) = match (top_instruments.first(), top_notes.first()) {
            (Some(i), Some(n)) => (i.clone(), n.clone()),
            _ => return Err(FeatureError::Classifier("empty classifier output".to_string())),
        };

        debug!(
            path = %path.display(),
            instrument = %instrument.instrument,
            note = %note.note,
            "Prediction"
        );

        Ok(Prediction {
            instrument,
            note,
            top_instruments,
            top_notes,
            degenerate_input: extracted.degenerate,
        })
    }

    /// Predict every file in `paths`, in order
    ///
    /// A failing file is logged and returned as its `Err` entry; the rest of
    /// the batch still runs.
    pub fn predict_batch(
        &self,
        paths: &[PathBuf],
        top_k: usize,
    ) -> Vec<(PathBuf, FeatureResult<Prediction>)> {
        let results: Vec<_> = paths
            .iter()
            .map(|path| {
                let result = self.predict(path, top_k);
                if let Err(e) = &result {
                    warn!(path = %path.display(), error = %e, "Prediction failed");
                }
                (path.clone(), result)
            })
            .collect();

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        info!(files = paths.len(), failed, "Batch prediction finished");
        results
    }
}

fn check_len(head: &str, probs: &[f32], expected: usize) -> FeatureResult<()> {
    if probs.len() != expected {
        return Err(FeatureError::Classifier(format!(
            "{} head returned {} values, expected {}",
            head,
            probs.len(),
            expected
        )));
    }
    if probs.iter().any(|p| !p.is_finite()) {
        return Err(FeatureError::Classifier(format!(
            "{} head returned non-finite values",
            head
        )));
    }
    Ok(())
}

/// Indices of the `k` largest values, descending; ties keep label order
fn rank(probs: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);
    ranked
}
