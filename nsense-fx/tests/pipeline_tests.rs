//! Feature pipeline integration tests against generated WAV files

mod helpers;

use std::path::PathBuf;

use helpers::audio_generator::{generate_note_wav, write_corrupt_wav, NoteConfig};
use nsense_fx::{FeatureError, FeaturePipeline, PipelineConfig};
use tempfile::TempDir;

fn note_file(dir: &TempDir, name: &str, frequency_hz: f32) -> PathBuf {
    generate_note_wav(&dir.path().join(name), frequency_hz, &NoteConfig::default()).unwrap()
}

#[test]
fn test_tensor_shape_and_range() {
    let dir = TempDir::new().unwrap();
    let path = note_file(&dir, "C4_001.wav", 261.63);

    let pipeline = FeaturePipeline::new(PipelineConfig::default()).unwrap();
    let out = pipeline.process_file(&path).unwrap();

    assert_eq!(out.tensor.shape(), [128, 87, 1]);
    assert_eq!(out.tensor.batched_shape(), [1, 128, 87, 1]);
    assert!(!out.degenerate);
    assert!(out.tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn test_stereo_44k_matches_canonical_shape() {
    let dir = TempDir::new().unwrap();
    let config = NoteConfig {
        sample_rate: 44100,
        channels: 2,
        duration_seconds: 3.0,
        ..NoteConfig::default()
    };
    let path = generate_note_wav(&dir.path().join("A4_001.wav"), 440.0, &config).unwrap();

    let pipeline = FeaturePipeline::new(PipelineConfig::default()).unwrap();
    let signal = pipeline.load_signal(&path).unwrap();
    assert_eq!(signal.sample_rate, 22050);
    assert_eq!(signal.len(), 44100);

    let out = pipeline.process_file(&path).unwrap();
    assert_eq!(out.tensor.shape(), [128, 87, 1]);
}

#[test]
fn test_inference_path_deterministic() {
    let dir = TempDir::new().unwrap();
    let path = note_file(&dir, "E4_001.wav", 329.63);

    let pipeline = FeaturePipeline::new(PipelineConfig::default()).unwrap();
    let a = pipeline.process_file(&path).unwrap();
    let b = pipeline.process_file(&path).unwrap();
    assert_eq!(a.tensor, b.tensor);
}

#[test]
fn test_silence_trimmed_before_framing() {
    let dir = TempDir::new().unwrap();
    let padded = NoteConfig {
        duration_seconds: 0.5,
        leading_silence: 1.0,
        trailing_silence: 1.0,
        ..NoteConfig::default()
    };
    let path = generate_note_wav(&dir.path().join("G4_001.wav"), 392.0, &padded).unwrap();

    let pipeline = FeaturePipeline::new(PipelineConfig::default()).unwrap();
    let signal = pipeline.load_signal(&path).unwrap();

    // Tone now starts within a couple of trim frames of sample 0
    let first_loud = signal.samples.iter().position(|s| s.abs() > 0.05).unwrap();
    assert!(first_loud < 4096, "tone starts at {}", first_loud);
    assert_eq!(signal.len(), 44100);

    let mut config = PipelineConfig::default();
    config.audio.trim_silence = false;
    let untrimmed = FeaturePipeline::new(config).unwrap().load_signal(&path).unwrap();
    let first_loud = untrimmed.samples.iter().position(|s| s.abs() > 0.05).unwrap();
    assert!(first_loud >= 22000);
}

#[test]
fn test_silent_file_is_degenerate() {
    let dir = TempDir::new().unwrap();
    let silent = NoteConfig {
        amplitude: 0.0,
        ..NoteConfig::default()
    };
    let path = generate_note_wav(&dir.path().join("C3_001.wav"), 130.81, &silent).unwrap();

    let pipeline = FeaturePipeline::new(PipelineConfig::default()).unwrap();
    let out = pipeline.process_file(&path).unwrap();
    assert!(out.degenerate);
    assert!(out.tensor.as_slice().iter().all(|&v| v == 0.0));
}

#[test]
fn test_corrupt_file_is_decode_error() {
    let dir = TempDir::new().unwrap();
    let path = write_corrupt_wav(&dir.path().join("D4_001.wav")).unwrap();

    let pipeline = FeaturePipeline::new(PipelineConfig::default()).unwrap();
    assert!(matches!(
        pipeline.process_file(&path),
        Err(FeatureError::AudioDecode { .. })
    ));
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let mut config = PipelineConfig::default();
    config.mel.n_mels = 0;
    assert!(matches!(
        FeaturePipeline::new(config),
        Err(FeatureError::Configuration(_))
    ));
}
