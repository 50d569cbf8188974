//! Tests for configuration loading and root folder resolution
//!
//! Covers:
//! - Priority order: CLI > EVFB_ROOT_FOLDER > TOML > compiled default
//! - Missing/invalid config files fall back to defaults
//!
//! Tests touching EVFB_ROOT_FOLDER are marked #[serial] so they do not race
//! each other on the process environment.

use evfb_common::config::{
    CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig, DATABASE_FILE,
    DEFAULT_PORT, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.port, DEFAULT_PORT);
    assert_eq!(defaults.bind_address, "127.0.0.1");
    assert!(defaults.root_folder.to_string_lossy().contains("evfb"));
}

#[test]
#[serial]
fn test_resolver_cli_arg_wins_over_env() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/evfb-env-folder");

    let resolver = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/evfb-cli-folder")));

    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/evfb-cli-folder"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_env_var_wins_over_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/evfb-env-folder");

    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/evfb-toml-folder")),
        ..TomlConfig::default()
    };
    let resolver = RootFolderResolver::new("test-module").with_toml(toml);

    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/evfb-env-folder"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_toml_used_without_env() {
    env::remove_var(ROOT_FOLDER_ENV);

    let toml = TomlConfig::parse("root_folder = \"/tmp/evfb-toml-folder\"").unwrap();
    let resolver = RootFolderResolver::new("test-module").with_toml(toml);

    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/evfb-toml-folder"));
}

#[test]
#[serial]
fn test_resolver_falls_back_to_compiled_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new("test-module").with_toml(TomlConfig::default());

    assert_eq!(
        resolver.resolve(),
        CompiledDefaults::for_current_platform().root_folder
    );
}

#[test]
#[serial]
fn test_resolver_ignores_empty_env_var() {
    env::set_var(ROOT_FOLDER_ENV, "");

    let resolver = RootFolderResolver::new("test-module").with_toml(TomlConfig::default());

    assert_eq!(
        resolver.resolve(),
        CompiledDefaults::for_current_platform().root_folder
    );

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
fn test_toml_config_all_keys() {
    let config = TomlConfig::parse(
        r#"
        root_folder = "/srv/evfb"
        bind_address = "0.0.0.0"
        port = 8080
        "#,
    )
    .unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/evfb")));
    assert_eq!(config.bind_address.as_deref(), Some("0.0.0.0"));
    assert_eq!(config.port, Some(8080));
}

#[test]
fn test_toml_config_empty_is_default() {
    assert_eq!(TomlConfig::parse("").unwrap(), TomlConfig::default());
}

#[test]
fn test_toml_config_invalid_is_config_error() {
    let err = TomlConfig::parse("port = \"not a number\"").unwrap_err();
    assert!(matches!(err, evfb_common::Error::Config(_)));
}

#[test]
fn test_toml_config_load_missing_file_is_error() {
    let result = TomlConfig::load(&PathBuf::from("/nonexistent/evfb/config.toml"));
    assert!(matches!(result, Err(evfb_common::Error::Io(_))));
}

#[test]
fn test_initializer_creates_directory_and_database_path() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nested").join("evfb");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join(DATABASE_FILE));
}
