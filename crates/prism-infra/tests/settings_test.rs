use prism_core::rhi::{RhiSettings, SettingsError, StateQueryMode};
use tempfile::tempdir;

#[test]
fn settings_load_from_a_json_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rhi_settings.json");
    std::fs::write(
        &path,
        r#"{ "state_query_mode": "cache_only", "query_timeout_ms": 5, "reverse_z": false }"#,
    )
    .unwrap();

    let settings = RhiSettings::load(&path).unwrap();

    assert_eq!(settings.state_query_mode, StateQueryMode::CacheOnly);
    assert_eq!(settings.query_timeout_ms, 5);
    assert!(!settings.reverse_z);
    assert_eq!(settings.anisotropy, RhiSettings::default().anisotropy);
}

#[test]
fn unknown_mode_is_a_parse_error() {
    let err = RhiSettings::from_json_str(r#"{ "state_query_mode": "sometimes" }"#).unwrap_err();
    assert!(matches!(err, SettingsError::Parse(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = RhiSettings::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, SettingsError::Io { .. }));
}
