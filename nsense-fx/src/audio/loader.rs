//! Audio file loading
//!
//! Decodes any symphonia-supported container (WAV, MP3, OGG/Vorbis, FLAC)
//! to mono f32, then resamples to the pipeline's canonical rate.
//!
//! **Mixdown:** multi-channel frames are averaged, not summed, so a full
//! scale stereo file stays within [-1.0, 1.0].

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};

use super::resample::resample_mono;
use super::signal::AudioSignal;
use crate::error::{FeatureError, FeatureResult};

/// Decoded audio at its native rate
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono audio samples (f32, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// Original channel count
    pub channels: usize,
    /// Packets dropped because they failed to decode
    pub skipped_packets: usize,
}

/// Loads audio files as mono signals at a fixed sample rate
#[derive(Debug, Clone, Copy)]
pub struct SignalLoader {
    target_sample_rate: u32,
}

impl SignalLoader {
    pub fn new(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Decode `path`, mix to mono and resample to the target rate
    ///
    /// # Errors
    /// * `AudioDecode` - unreadable, corrupt, empty or unsupported file
    /// * `Resample` - resampler failure
    pub fn load(&self, path: &Path) -> FeatureResult<AudioSignal> {
        let decoded = decode_audio_file(path)?;

        let samples = if decoded.sample_rate == self.target_sample_rate {
            decoded.samples
        } else {
            debug!(
                path = %path.display(),
                from = decoded.sample_rate,
                to = self.target_sample_rate,
                "Resampling"
            );
            resample_mono(&decoded.samples, decoded.sample_rate, self.target_sample_rate)?
        };

        Ok(AudioSignal::new(samples, self.target_sample_rate))
    }
}

/// Decode an audio file to mono f32 PCM at its native rate
///
/// Packets that fail to decode are skipped with a warning. A file that
/// yields no samples at all is an error.
pub fn decode_audio_file(path: &Path) -> FeatureResult<DecodedAudio> {
    debug!(path = %path.display(), "Decoding audio file");

    let file = open_with_retry(path).map_err(|e| FeatureError::decode(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| FeatureError::decode(path, format!("probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| FeatureError::decode(path, "no audio track found"))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| FeatureError::decode(path, format!("unsupported codec: {}", e)))?;

    let mut all_samples: Vec<f32> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                // Truncated or garbled container: keep what decoded so far
                warn!(path = %path.display(), error = %e, "Stopped reading packets");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                if channels == 0 {
                    channels = spec.channels.count();
                }
                all_samples.extend(mix_to_mono(&decoded));
            }
            Err(SymphoniaError::DecodeError(reason)) => {
                skipped_packets += 1;
                warn!(path = %path.display(), reason, "Skipping undecodable packet");
            }
            Err(e) => {
                return Err(FeatureError::decode(path, format!("decode failed: {}", e)));
            }
        }
    }

    let sample_rate =
        sample_rate.ok_or_else(|| FeatureError::decode(path, "sample rate unknown"))?;

    if all_samples.is_empty() {
        return Err(FeatureError::decode(path, "no audio samples decoded"));
    }

    debug!(
        path = %path.display(),
        total_samples = all_samples.len(),
        sample_rate,
        channels,
        skipped_packets,
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples: all_samples,
        sample_rate,
        channels,
        skipped_packets,
    })
}

/// Open a file, retrying once on a transient IO error
pub fn open_with_retry(path: &Path) -> std::io::Result<File> {
    match File::open(path) {
        Ok(file) => Ok(file),
        Err(e) if is_transient(&e) => {
            debug!(path = %path.display(), error = %e, "Transient open failure, retrying");
            File::open(path)
        }
        Err(e) => Err(e),
    }
}

fn is_transient(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
    )
}

/// Average all channels of a decoded buffer into one f32 channel
fn mix_to_mono(decoded: &AudioBufferRef) -> Vec<f32> {
    match decoded {
        AudioBufferRef::U8(buf) => average_channels(buf),
        AudioBufferRef::U16(buf) => average_channels(buf),
        AudioBufferRef::U24(buf) => average_channels(buf),
        AudioBufferRef::U32(buf) => average_channels(buf),
        AudioBufferRef::S8(buf) => average_channels(buf),
        AudioBufferRef::S16(buf) => average_channels(buf),
        AudioBufferRef::S24(buf) => average_channels(buf),
        AudioBufferRef::S32(buf) => average_channels(buf),
        AudioBufferRef::F32(buf) => average_channels(buf),
        AudioBufferRef::F64(buf) => average_channels(buf),
    }
}

fn average_channels<S: Sample>(buf: &AudioBuffer<S>) -> Vec<f32>
where
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count();
    let num_frames = buf.frames();
    if num_channels == 0 {
        return Vec::new();
    }

    let mut mono = vec![0.0f32; num_frames];
    for ch in 0..num_channels {
        for (acc, &sample) in mono.iter_mut().zip(buf.chan(ch)) {
            *acc += f32::from_sample(sample);
        }
    }
    let scale = 1.0 / num_channels as f32;
    mono.iter_mut().for_each(|s| *s *= scale);
    mono
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[Vec<i16>]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for frame in frames {
            for &s in frame {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_stereo_averaged_to_mono() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        let frames: Vec<Vec<i16>> = (0..1000).map(|_| vec![16384, -16384]).collect();
        write_wav(&path, 2, 22050, &frames);

        let decoded = decode_audio_file(&path).unwrap();
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.sample_rate, 22050);
        assert_eq!(decoded.samples.len(), 1000);
        assert!(decoded.samples.iter().all(|s| s.abs() < 1e-4));
    }

    #[test]
    fn test_load_resamples_to_target_rate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        let frames: Vec<Vec<i16>> = (0..44100)
            .map(|i| {
                let t = i as f32 / 44100.0;
                vec![((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 8000.0) as i16]
            })
            .collect();
        write_wav(&path, 1, 44100, &frames);

        let signal = SignalLoader::new(22050).load(&path).unwrap();
        assert_eq!(signal.sample_rate, 22050);
        assert_eq!(signal.len(), 22050);
    }

    #[test]
    fn test_garbage_file_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.wav");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"this is definitely not audio data").unwrap();

        let result = decode_audio_file(&path);
        assert!(matches!(result, Err(FeatureError::AudioDecode { .. })));
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let result = SignalLoader::new(22050).load(Path::new("/nonexistent/C4.wav"));
        assert!(matches!(result, Err(FeatureError::AudioDecode { .. })));
    }

    #[test]
    fn test_empty_wav_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, 1, 22050, &[]);

        assert!(decode_audio_file(&path).is_err());
    }
}
