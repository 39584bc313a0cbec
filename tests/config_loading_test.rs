//! Configuration loading tests: TOML files, environment overrides, validation.
//!
//! Tests touching `EVENT_RING_*` environment variables run serially.

use daq_event_ring::config::{Settings, DEFAULT_CONFIG_PATH};
use daq_event_ring::tracing_setup::{OutputFormat, TracingConfig};
use daq_event_ring::RingError;
use serial_test::serial;
use std::fs;
use std::path::PathBuf;

fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("event_ring.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load_from(dir.path().join("absent.toml")).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
#[serial]
fn test_shipped_config_matches_defaults() {
    let settings = Settings::load_from(DEFAULT_CONFIG_PATH).unwrap();
    assert_eq!(settings, Settings::default());
    assert!(settings.validate().is_ok());
}

#[test]
#[serial]
fn test_partial_file_overrides_only_given_keys() {
    let (_dir, path) = write_config(
        r#"
[ring]
size = 16
holdoff = 5

[diagnostics]
ring_log = "Ring_log.txt"
"#,
    );
    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.ring.size, 16);
    assert_eq!(settings.ring.holdoff, 5);
    assert_eq!(settings.ring.stability_cut, 1.0);
    assert_eq!(settings.rolling_average.min_samples, 100);
    assert_eq!(
        settings.diagnostics.ring_log,
        Some(PathBuf::from("Ring_log.txt"))
    );
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let (_dir, path) = write_config("[ring]\nholdoff = 5\nsize = 64\n");

    std::env::set_var("EVENT_RING_RING__HOLDOFF", "50");
    std::env::set_var("EVENT_RING_RING__STABILITY_CUT", "0");
    let result = Settings::load_from(&path);
    std::env::remove_var("EVENT_RING_RING__HOLDOFF");
    std::env::remove_var("EVENT_RING_RING__STABILITY_CUT");

    let settings = result.unwrap();
    assert_eq!(settings.ring.holdoff, 50);
    assert_eq!(settings.ring.size, 64);
    assert!(!settings.ring.stability_enabled());
}

#[test]
#[serial]
fn test_log_format_from_file_and_environment() {
    let (_dir, path) = write_config("[application]\nlog_format = \"pretty\"\n");
    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.application.log_format, OutputFormat::Pretty);

    std::env::set_var("EVENT_RING_APPLICATION__LOG_FORMAT", "json");
    let result = Settings::load_from(&path);
    std::env::remove_var("EVENT_RING_APPLICATION__LOG_FORMAT");

    let settings = result.unwrap();
    assert_eq!(settings.application.log_format, OutputFormat::Json);
    let tracing = TracingConfig::from_settings(&settings).unwrap();
    assert_eq!(tracing.format, OutputFormat::Json);
}

#[test]
#[serial]
fn test_unknown_log_format_is_config_error() {
    let (_dir, path) = write_config("[application]\nlog_format = \"xml\"\n");
    let err = Settings::load_from(&path).unwrap_err();
    assert!(matches!(err, RingError::Config(_)));
}

#[test]
#[serial]
fn test_wrong_type_is_config_error() {
    let (_dir, path) = write_config("[ring]\nsize = \"large\"\n");
    let err = Settings::load_from(&path).unwrap_err();
    assert!(matches!(err, RingError::Config(_)));
}

#[test]
#[serial]
fn test_semantic_errors_caught_by_validate() {
    let (_dir, path) = write_config("[ring]\nsize = 0\n");
    let settings = Settings::load_from(&path).unwrap();
    let err = settings.validate().unwrap_err();
    assert!(matches!(err, RingError::InvalidConfiguration(_)));
}

#[test]
#[serial]
fn test_round_trips_through_toml() {
    let mut settings = Settings::default();
    settings.ring.size = 128;
    settings.ring.print_after_unwind = true;
    let text = toml::to_string_pretty(&settings).unwrap();

    let (_dir, path) = write_config(&text);
    assert_eq!(Settings::load_from(&path).unwrap(), settings);
}
