//! Audio Test Fixture Generator
//!
//! Writes labeled single-note WAV files into `root/<instrument>/` layouts

use std::path::{Path, PathBuf};

/// Configuration for generated notes
#[derive(Debug, Clone)]
pub struct NoteConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub amplitude: f32,
    /// Silence before the tone starts
    pub leading_silence: f64,
    /// Silence after the tone ends
    pub trailing_silence: f64,
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 1.5,
            sample_rate: 22050,
            channels: 1,
            amplitude: 0.4,
            leading_silence: 0.0,
            trailing_silence: 0.0,
        }
    }
}

/// Write a sine tone at `frequency_hz` as 16-bit PCM WAV
pub fn generate_note_wav(
    path: &Path,
    frequency_hz: f32,
    config: &NoteConfig,
) -> anyhow::Result<PathBuf> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = hound::WavWriter::create(path, spec)?;

    let rate = config.sample_rate as f64;
    let lead = (config.leading_silence * rate) as usize;
    let tone = (config.duration_seconds * rate) as usize;
    let tail = (config.trailing_silence * rate) as usize;

    for i in 0..lead + tone + tail {
        let sample = if i >= lead && i < lead + tone {
            let t = (i - lead) as f32 / config.sample_rate as f32;
            let value = config.amplitude * (2.0 * std::f32::consts::PI * frequency_hz * t).sin();
            (value * i16::MAX as f32) as i16
        } else {
            0
        };
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(path.to_path_buf())
}

/// Write a file that claims to be WAV but is not decodable
pub fn write_corrupt_wav(path: &Path) -> anyhow::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, b"RIFF\x10\x00\x00\x00WAVEjunkjunkjunk")?;
    Ok(path.to_path_buf())
}

/// Generate `root/<instrument>/<note>_<nnn>.wav` for each `(instrument, note)` pair
pub fn generate_dataset(
    root: &Path,
    entries: &[(&str, &str, f32)],
    config: &NoteConfig,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for (i, (instrument, note, freq)) in entries.iter().enumerate() {
        let path = root
            .join(instrument)
            .join(format!("{}_{:03}_20240101.wav", note, i + 1));
        files.push(generate_note_wav(&path, *freq, config)?);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generate_note_wav() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("piano").join("C4_001.wav");

        generate_note_wav(&path, 261.63, &NoteConfig::default()).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.len(), (1.5 * 22050.0) as u32);
    }
}
