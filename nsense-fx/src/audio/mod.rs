//! Audio loading and time-domain conditioning

pub mod duration;
pub mod loader;
pub mod resample;
pub mod signal;
pub mod trim;

pub use duration::{fix_length, DurationNormalizer};
pub use loader::{decode_audio_file, DecodedAudio, SignalLoader};
pub use resample::{resample_by_ratio, resample_mono, ResampleError};
pub use signal::AudioSignal;
pub use trim::SilenceTrimmer;
