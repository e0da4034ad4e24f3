//! Configuration schema, loading and resolution
//!
//! Configuration source priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`NSENSE_CONFIG`)
//! 3. User TOML config file (`<config dir>/nsense/nsense.toml`)
//! 4. Compiled defaults (fallback)
//!
//! An explicitly named file (priorities 1-2) must exist and parse. A missing
//! or broken user file degrades to compiled defaults with a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "NSENSE_CONFIG";

/// Environment variable naming the dataset root folder
pub const DATA_ROOT_ENV_VAR: &str = "NSENSE_DATA_ROOT";

/// Dataset root used when nothing else is configured
pub const DEFAULT_DATA_ROOT: &str = "data/train";

/// Complete TOML configuration
///
/// Every field is defaulted, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TomlConfig {
    /// Root folder holding `<instrument>/<note>_<n>.<ext>` files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_root: Option<PathBuf>,

    pub audio: AudioSection,
    pub spectrogram: SpectrogramSection,
    pub augmentation: AugmentationSection,
    pub dataset: DatasetSection,
    pub logging: LoggingConfig,
}

/// Signal loading and framing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSection {
    /// Canonical sample rate in Hz
    pub sample_rate: u32,
    /// Fixed clip duration in seconds
    pub duration_seconds: f64,
    /// Trim leading/trailing silence before framing
    pub trim_silence: bool,
    /// Silence threshold in dB below the clip's own peak
    pub silence_threshold_db: f32,
}

impl Default for AudioSection {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            duration_seconds: 2.0,
            trim_silence: true,
            silence_threshold_db: 20.0,
        }
    }
}

/// Mel-spectrogram parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramSection {
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    /// Upper frequency cutoff of the mel filterbank
    pub fmax_hz: f32,
    /// Dynamic range kept below the peak after dB conversion
    pub top_db: f32,
}

impl Default for SpectrogramSection {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            fmax_hz: 8000.0,
            top_db: 80.0,
        }
    }
}

/// Augmentation switches, ranges and application probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentationSection {
    pub time_stretch: bool,
    pub time_stretch_range: [f32; 2],
    pub time_stretch_probability: f64,

    /// Off by default: shifting pitch changes the note label
    pub pitch_shift: bool,
    pub pitch_shift_range: [i32; 2],
    pub pitch_shift_probability: f64,

    pub noise: bool,
    pub noise_snr_db_range: [f32; 2],
    pub noise_probability: f64,

    pub gain: bool,
    pub gain_db_range: [f32; 2],
    pub gain_probability: f64,
}

impl Default for AugmentationSection {
    fn default() -> Self {
        Self {
            time_stretch: true,
            time_stretch_range: [0.9, 1.1],
            time_stretch_probability: 0.5,
            pitch_shift: false,
            pitch_shift_range: [-2, 2],
            pitch_shift_probability: 0.3,
            noise: true,
            noise_snr_db_range: [20.0, 40.0],
            noise_probability: 0.5,
            gain: true,
            gain_db_range: [-20.0, 20.0],
            gain_probability: 0.5,
        }
    }
}

/// Dataset indexing and batching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSection {
    pub batch_size: usize,
    pub shuffle: bool,
    /// Fixed seed for reproducible epochs; random when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Allowed audio file extensions (case-insensitive)
    pub extensions: Vec<String>,
}

impl Default for DatasetSection {
    fn default() -> Self {
        Self {
            batch_size: 32,
            shuffle: true,
            seed: None,
            extensions: ["wav", "mp3", "ogg", "flac"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Where a resolved configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine(PathBuf),
    Environment(PathBuf),
    UserFile(PathBuf),
    Defaults,
}

/// Resolved configuration plus its provenance
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    pub source: ConfigSource,
}

/// Resolves the configuration file following the documented priority order
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
    user_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create resolver with an optional `--config` argument
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self {
            cli_path,
            user_path: default_config_path(),
        }
    }

    /// Override the user config file location (tests, portable installs)
    pub fn with_user_path(mut self, user_path: Option<PathBuf>) -> Self {
        self.user_path = user_path;
        self
    }

    /// Resolve and load configuration
    pub fn resolve(&self) -> Result<LoadedConfig> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            let config = load_toml_config(path)?;
            info!("Configuration loaded from command line: {}", path.display());
            return Ok(LoadedConfig {
                config,
                source: ConfigSource::CommandLine(path.clone()),
            });
        }

        // Priority 2: Environment variable
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from) {
            let config = load_toml_config(&path)?;
            info!(
                "Configuration loaded from {}: {}",
                CONFIG_ENV_VAR,
                path.display()
            );
            return Ok(LoadedConfig {
                config,
                source: ConfigSource::Environment(path),
            });
        }

        // Priority 3: User config file (graceful degradation)
        if let Some(path) = &self.user_path {
            if path.exists() {
                match load_toml_config(path) {
                    Ok(config) => {
                        info!("Configuration loaded from {}", path.display());
                        return Ok(LoadedConfig {
                            config,
                            source: ConfigSource::UserFile(path.clone()),
                        });
                    }
                    Err(e) => {
                        warn!("Ignoring unusable config file {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Priority 4: Compiled defaults
        info!("No configuration file found, using compiled defaults");
        Ok(LoadedConfig {
            config: TomlConfig::default(),
            source: ConfigSource::Defaults,
        })
    }
}

/// Default user config file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("nsense").join("nsense.toml"))
}

/// Resolve the dataset root: CLI → `NSENSE_DATA_ROOT` → TOML → default
pub fn resolve_data_root(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Some(path) = std::env::var_os(DATA_ROOT_ENV_VAR) {
        return PathBuf::from(path);
    }

    if let Some(path) = &config.data_root {
        return path.clone();
    }

    PathBuf::from(DEFAULT_DATA_ROOT)
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Read config {} failed: {}", path.display(), e))
    })?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse config {} failed: {}", path.display(), e)))
}

/// Write a config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    std::fs::write(&temp_path, content)?;
    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}
