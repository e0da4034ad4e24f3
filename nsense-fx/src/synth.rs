//! Synthetic harmonic notes for smoke-testing the pipeline
//!
//! Each note is a fundamental plus two harmonics (0.5, 0.3, 0.2 amplitude)
//! under a linear 0.1 s attack / 0.2 s release envelope, written as 16-bit
//! mono WAV.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::FeatureResult;
use nsense_common::{Instrument, LabelSpace, Note};

/// Partial amplitudes: fundamental, 2nd and 3rd harmonic
const PARTIALS: [(f32, f32); 3] = [(1.0, 0.5), (2.0, 0.3), (3.0, 0.2)];

const ATTACK_SECONDS: f32 = 0.1;
const RELEASE_SECONDS: f32 = 0.2;

/// Synthetic note parameters
#[derive(Debug, Clone, Copy)]
pub struct SynthSpec {
    pub sample_rate: u32,
    pub duration_seconds: f32,
}

impl Default for SynthSpec {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            duration_seconds: 2.0,
        }
    }
}

/// Harmonic tone at `frequency_hz`, peak-bounded to [-1, 1]
pub fn harmonic_tone(frequency_hz: f32, spec: &SynthSpec) -> Vec<f32> {
    let rate = spec.sample_rate as f32;
    let n = (spec.duration_seconds * rate) as usize;
    let attack = ((ATTACK_SECONDS * rate) as usize).min(n);
    let release = ((RELEASE_SECONDS * rate) as usize).min(n - attack);

    (0..n)
        .map(|i| {
            let t = i as f32 / rate;
            let tone: f32 = PARTIALS
                .iter()
                .map(|&(mult, amp)| {
                    amp * (2.0 * std::f32::consts::PI * frequency_hz * mult * t).sin()
                })
                .sum();

            let envelope = if i < attack {
                i as f32 / attack as f32
            } else if i >= n - release {
                (n - 1 - i) as f32 / release.max(1) as f32
            } else {
                1.0
            };
            (tone * envelope).clamp(-1.0, 1.0)
        })
        .collect()
}

/// Write `samples` as 16-bit mono PCM
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> FeatureResult<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Write `<dest>/<instrument>/<note>_001.wav` for every instrument and note
pub fn write_note_set(
    dest: &Path,
    notes: &[Note],
    spec: &SynthSpec,
) -> FeatureResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    for instrument in Instrument::all() {
        let dir = dest.join(instrument.as_str());
        fs::create_dir_all(&dir)?;
        for note in notes {
            let path = dir.join(format!("{}_001.wav", note));
            write_wav(&path, &harmonic_tone(note.frequency_hz(), spec), spec.sample_rate)?;
            written.push(path);
        }
    }
    info!(dest = %dest.display(), files = written.len(), "Synthetic notes written");
    Ok(written)
}
