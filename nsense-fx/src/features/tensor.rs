//! Spectrogram and feature tensor containers

use serde::Serialize;

/// Mel-band × time-frame matrix, row-major (one row per band)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrogram {
    n_mels: usize,
    frames: usize,
    data: Vec<f32>,
}

impl Spectrogram {
    /// Build from row-major data; `None` if `data.len() != n_mels * frames`
    pub fn from_row_major(n_mels: usize, frames: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == n_mels * frames).then_some(Self {
            n_mels,
            frames,
            data,
        })
    }

    pub fn zeros(n_mels: usize, frames: usize) -> Self {
        Self {
            n_mels,
            frames,
            data: vec![0.0; n_mels * frames],
        }
    }

    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// `(n_mels, frames)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_mels, self.frames)
    }

    pub fn get(&self, band: usize, frame: usize) -> Option<f32> {
        if band < self.n_mels && frame < self.frames {
            Some(self.data[band * self.frames + frame])
        } else {
            None
        }
    }

    /// One mel band across all frames
    pub fn band(&self, band: usize) -> &[f32] {
        &self.data[band * self.frames..(band + 1) * self.frames]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// `(min, max)` over all values; `(0.0, 0.0)` when empty
    pub fn min_max(&self) -> (f32, f32) {
        if self.data.is_empty() {
            return (0.0, 0.0);
        }
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Nested `[band][frame]` view, for JSON output
    pub fn to_nested(&self) -> Vec<Vec<f32>> {
        self.data.chunks(self.frames.max(1)).map(|row| row.to_vec()).collect()
    }
}

/// Normalized spectrogram with a trailing channel dimension
///
/// Shape `(n_mels, frames, 1)`, values in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureTensor {
    spectrogram: Spectrogram,
}

impl FeatureTensor {
    pub fn new(spectrogram: Spectrogram) -> Self {
        Self { spectrogram }
    }

    /// `(n_mels, frames, 1)`
    pub fn shape(&self) -> [usize; 3] {
        [self.spectrogram.n_mels(), self.spectrogram.frames(), 1]
    }

    pub fn spectrogram(&self) -> &Spectrogram {
        &self.spectrogram
    }

    /// Contiguous values; the singleton channel adds no stride
    pub fn as_slice(&self) -> &[f32] {
        self.spectrogram.as_slice()
    }

    pub fn len(&self) -> usize {
        self.spectrogram.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add the leading batch dimension: `(1, n_mels, frames, 1)`
    pub fn batched_shape(&self) -> [usize; 4] {
        let [m, f, c] = self.shape();
        [1, m, f, c]
    }
}

/// One batch of features with their one-hot labels
#[derive(Debug, Clone, Default)]
pub struct FeatureBatch {
    pub features: Vec<FeatureTensor>,
    pub instrument_labels: Vec<Vec<f32>>,
    pub note_labels: Vec<Vec<f32>>,
    /// Samples in this batch's slice that failed and were skipped
    pub skipped: usize,
}

impl FeatureBatch {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn push(&mut self, feature: FeatureTensor, instrument: Vec<f32>, note: Vec<f32>) {
        self.features.push(feature);
        self.instrument_labels.push(instrument);
        self.note_labels.push(note);
    }

    /// Contiguous `(n, n_mels, frames, 1)` buffer plus its shape
    ///
    /// Returns `None` for an empty batch or if feature shapes disagree.
    pub fn features_flat(&self) -> Option<(Vec<f32>, [usize; 4])> {
        let first = self.features.first()?;
        let [m, f, c] = first.shape();
        if self.features.iter().any(|t| t.shape() != [m, f, c]) {
            return None;
        }

        let mut flat = Vec::with_capacity(self.features.len() * m * f * c);
        for tensor in &self.features {
            flat.extend_from_slice(tensor.as_slice());
        }
        Some((flat, [self.features.len(), m, f, c]))
    }
}
