//! Configuration resolution and graceful degradation tests
//!
//! Covers:
//! - Source priority: CLI > NSENSE_CONFIG > user file > defaults
//! - Missing user config SHALL NOT cause an error
//! - Explicitly named config that fails to load IS an error
//! - Data root priority: CLI > NSENSE_DATA_ROOT > TOML > default
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate NSENSE_CONFIG or NSENSE_DATA_ROOT are marked with
//! #[serial] to ensure they run sequentially, not in parallel.

use nsense_common::config::{
    resolve_data_root, write_toml_config, ConfigResolver, ConfigSource, TomlConfig,
    CONFIG_ENV_VAR, DATA_ROOT_ENV_VAR, DEFAULT_DATA_ROOT,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_config(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
#[serial]
fn test_resolver_with_no_sources_uses_defaults() {
    env::remove_var(CONFIG_ENV_VAR);

    let temp_dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(None)
        .with_user_path(Some(temp_dir.path().join("absent.toml")));
    let loaded = resolver.resolve().unwrap();

    assert_eq!(loaded.source, ConfigSource::Defaults);
    assert_eq!(loaded.config, TomlConfig::default());
}

#[test]
#[serial]
fn test_resolver_cli_takes_precedence_over_env() {
    let temp_dir = TempDir::new().unwrap();
    let cli = write_config(temp_dir.path(), "cli.toml", "[audio]\nsample_rate = 16000\n");
    let from_env = write_config(temp_dir.path(), "env.toml", "[audio]\nsample_rate = 8000\n");

    env::set_var(CONFIG_ENV_VAR, &from_env);

    let loaded = ConfigResolver::new(Some(cli.clone())).resolve().unwrap();
    assert_eq!(loaded.source, ConfigSource::CommandLine(cli));
    assert_eq!(loaded.config.audio.sample_rate, 16000);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_resolver_env_var_used_without_cli() {
    let temp_dir = TempDir::new().unwrap();
    let from_env = write_config(temp_dir.path(), "env.toml", "[dataset]\nbatch_size = 8\n");

    env::set_var(CONFIG_ENV_VAR, &from_env);

    let loaded = ConfigResolver::new(None)
        .with_user_path(None)
        .resolve()
        .unwrap();
    assert_eq!(loaded.source, ConfigSource::Environment(from_env));
    assert_eq!(loaded.config.dataset.batch_size, 8);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_resolver_user_file_used_last() {
    env::remove_var(CONFIG_ENV_VAR);

    let temp_dir = TempDir::new().unwrap();
    let user = write_config(temp_dir.path(), "nsense.toml", "[logging]\nlevel = \"debug\"\n");

    let loaded = ConfigResolver::new(None)
        .with_user_path(Some(user.clone()))
        .resolve()
        .unwrap();
    assert_eq!(loaded.source, ConfigSource::UserFile(user));
    assert_eq!(loaded.config.logging.level, "debug");
}

#[test]
#[serial]
fn test_broken_user_file_degrades_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);

    let temp_dir = TempDir::new().unwrap();
    let user = write_config(temp_dir.path(), "nsense.toml", "this is not [ toml");

    let loaded = ConfigResolver::new(None)
        .with_user_path(Some(user))
        .resolve()
        .unwrap();
    assert_eq!(loaded.source, ConfigSource::Defaults);
}

#[test]
#[serial]
fn test_missing_explicit_config_is_error() {
    env::remove_var(CONFIG_ENV_VAR);

    let result = ConfigResolver::new(Some(PathBuf::from("/nonexistent/nsense.toml"))).resolve();
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_data_root_priority() {
    env::remove_var(DATA_ROOT_ENV_VAR);

    let mut config = TomlConfig::default();
    assert_eq!(resolve_data_root(None, &config), PathBuf::from(DEFAULT_DATA_ROOT));

    config.data_root = Some(PathBuf::from("/toml/root"));
    assert_eq!(resolve_data_root(None, &config), PathBuf::from("/toml/root"));

    env::set_var(DATA_ROOT_ENV_VAR, "/env/root");
    assert_eq!(resolve_data_root(None, &config), PathBuf::from("/env/root"));

    assert_eq!(
        resolve_data_root(Some(Path::new("/cli/root")), &config),
        PathBuf::from("/cli/root")
    );

    env::remove_var(DATA_ROOT_ENV_VAR);
}

#[test]
fn test_atomic_write_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("nested").join("nsense.toml");

    let mut config = TomlConfig::default();
    config.data_root = Some(PathBuf::from("/data/notes"));
    config.dataset.seed = Some(42);
    config.augmentation.noise_snr_db_range = [15.0, 30.0];

    write_toml_config(&config, &target).unwrap();

    assert!(target.exists());
    assert!(!temp_dir.path().join("nested").join("nsense.toml.tmp").exists());

    let content = std::fs::read_to_string(&target).unwrap();
    let reread: TomlConfig = toml::from_str(&content).unwrap();
    assert_eq!(reread, config);
}

#[test]
fn test_write_defaults_omits_unset_options() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("defaults.toml");

    write_toml_config(&TomlConfig::default(), &target).unwrap();

    let content = std::fs::read_to_string(&target).unwrap();
    assert!(!content.contains("data_root"));
    assert!(!content.contains("seed"));
    assert!(content.contains("[spectrogram]"));
}
