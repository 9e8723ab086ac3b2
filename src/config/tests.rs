//! Configuration tests

use super::*;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn test_config_serialization() {
    let config = Config::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(config, parsed);
}

#[test]
fn test_config_from_file() {
    let mut config = Config::default();
    config.plugins.admin_directory = PathBuf::from("./plugins/admin");
    config.plugins.api_directory = PathBuf::from("./plugins/api");
    config.catalog.path = None;
    config.view.page_size = 5;

    let temp_file = NamedTempFile::new().unwrap();
    config.save_to_file(temp_file.path()).unwrap();

    let loaded = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config, loaded);
    assert_eq!(loaded.catalog_path().unwrap(), None);
}

#[test]
fn test_optional_sections_default() {
    let yaml = r#"
version: "1.0"
plugins:
  admin_directory: ./admin
  api_directory: ./api
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();

    assert!(config.validate().is_ok());
    assert_eq!(config.view, ViewConfig::default());
    assert_eq!(config.search_debounce().as_millis(), 300);
    assert!(config.catalog.path.is_some());
}

#[test]
fn test_config_validation() {
    assert!(Config::default().validate().is_ok());

    let mut config = Config::default();
    config.version = "2.0".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.plugins.api_directory = config.plugins.admin_directory.clone();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.view.page_size = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.view.search_debounce_ms = 60_000;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.catalog.path = Some(PathBuf::new());
    assert!(config.validate().is_err());
}

#[test]
fn test_paths_are_expanded() {
    let mut config = Config::default();
    config.plugins.admin_directory = PathBuf::from("~/plugins/admin");

    let expanded = config.admin_dir().unwrap();
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.ends_with("plugins/admin"));
}

#[test]
fn test_save_creates_parent_directories() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("nested/config/plugin-store.yaml");

    Config::default().save_to_file(&path).unwrap();
    assert_eq!(Config::from_file(&path).unwrap(), Config::default());
}

#[test]
fn test_save_rejects_file_as_parent() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().join("plugin-store.yaml");

    let err = Config::default().save_to_file(&path).unwrap_err();
    assert!(err.to_string().contains("not a directory"));
}

#[test]
fn test_invalid_file_is_rejected() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), "version: \"1.0\"\nplugins: 3\n").unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}
