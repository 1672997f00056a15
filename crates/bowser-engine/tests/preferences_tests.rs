//! File-backed preference storage.

use bowser_common::{BowserError, ColorScaleConfig};
use bowser_engine::{EngineConfig, JsonFileStore, KeyValueStore, PreferenceStore};

#[test]
fn test_file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("prefs.json");

    let mut prefs = PreferenceStore::new(JsonFileStore::open(&path).unwrap());
    prefs.save(
        "displacement",
        &ColorScaleConfig {
            colormap_name: "cfastie".to_string(),
            vmin: -0.0,
            vmax: 0.015,
            ..Default::default()
        },
    );

    let reopened = PreferenceStore::new(JsonFileStore::open(&path).unwrap());
    let loaded = reopened.load("displacement");
    assert_eq!(loaded.colormap_name.as_deref(), Some("cfastie"));
    assert_eq!(loaded.vmax, Some(0.015));
    assert!(loaded.vmin.unwrap().is_sign_negative());
}

#[test]
fn test_file_is_a_flat_string_map() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    let mut store = JsonFileStore::open(&path).unwrap();
    store.set("amplitude-vmin", "-0").unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["amplitude-vmin"], "-0");
}

#[test]
fn test_corrupt_file_is_storage_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = JsonFileStore::open(&path).unwrap_err();
    assert!(matches!(err, BowserError::StorageUnavailable(_)));
}

#[test]
fn test_config_falls_back_to_memory_on_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let config = EngineConfig {
        preferences_path: Some(path),
        ..Default::default()
    };
    let mut prefs = config.preference_store();
    prefs.save("amplitude", &ColorScaleConfig::default());
    assert_eq!(prefs.load("amplitude").colormap_name.as_deref(), Some("rdbu_r"));
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bowser.yaml");
    std::fs::write(&path, "base_url: http://bowser.test:8000\nrequest_timeout_secs: 3\n").unwrap();

    let config = EngineConfig::load_from_file_with(&path, |_| None).unwrap();
    assert_eq!(config.request_timeout_secs, 3);
    assert!(EngineConfig::load_from_file_with(dir.path().join("missing.yaml"), |_| None).is_err());
}
