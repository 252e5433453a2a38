//! Tests for configuration loading, path resolution and atomic write-back
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate WELFARE_CONFIG are marked with #[serial].

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;
use welfare_common::config::{
    load_toml_config, resolve_config_path, write_toml_config, ImportConfig, LoggingConfig,
    ServiceConfig, TomlConfig, CONFIG_PATH_ENV,
};
use welfare_common::Error;

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    let config = load_toml_config(&path).unwrap();

    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_malformed_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "[import\nchunk_size = ").unwrap();

    let result = load_toml_config(&path);

    assert!(matches!(result, Err(Error::TomlParse(_))));
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("zero.toml");
    std::fs::write(&path, "[import]\nchunk_size = 0\n").unwrap();

    let result = load_toml_config(&path);

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_write_then_load_preserves_fields() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("welfare-import.toml");

    let config = TomlConfig {
        service: ServiceConfig {
            base_url: Some("http://localhost:8000/api".to_string()),
            request_timeout_secs: Some(45),
        },
        import: ImportConfig {
            chunk_size: 100,
            ..Default::default()
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    };

    write_toml_config(&config, &path).unwrap();
    let loaded = load_toml_config(&path).unwrap();

    assert_eq!(loaded, config);
    assert!(!temp_dir
        .path()
        .join("nested")
        .join("welfare-import.toml.tmp")
        .exists());
}

#[test]
fn test_write_overwrites_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("welfare-import.toml");
    std::fs::write(&path, "garbage that is not toml = = =").unwrap();

    write_toml_config(&TomlConfig::default(), &path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("chunk_size = 50"));
    assert!(load_toml_config(&path).is_ok());
}

#[cfg(unix)]
#[test]
fn test_written_file_has_owner_only_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("welfare-import.toml");

    write_toml_config(&TomlConfig::default(), &path).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
#[serial]
fn test_env_var_overrides_default_location() {
    env::set_var(CONFIG_PATH_ENV, "/tmp/welfare-env.toml");

    let path = resolve_config_path(None, "welfare-import").unwrap();

    assert_eq!(path, PathBuf::from("/tmp/welfare-env.toml"));
    env::remove_var(CONFIG_PATH_ENV);
}

#[test]
#[serial]
fn test_cli_path_beats_env_var() {
    env::set_var(CONFIG_PATH_ENV, "/tmp/welfare-env.toml");

    let cli = PathBuf::from("/tmp/welfare-cli.toml");
    let path = resolve_config_path(Some(&cli), "welfare-import").unwrap();

    assert_eq!(path, cli);
    env::remove_var(CONFIG_PATH_ENV);
}

#[test]
#[serial]
fn test_default_location_uses_module_name() {
    env::remove_var(CONFIG_PATH_ENV);

    let path = resolve_config_path(None, "welfare-import").unwrap();

    assert!(path.ends_with("welfare/welfare-import.toml"));
}
