use helios::config::Config;
use helios::error::HeliosError;
use helios::window::{RetentionKind, WindowRetention};
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.api.site_id = Some("1234".to_string());
    cfg.controls.surplus_window = WindowRetention::samples(10);
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.api.site_id.as_deref(), Some("1234"));
    assert_eq!(loaded.controls.surplus_window.kind, RetentionKind::Samples);
    assert_eq!(loaded.controls.surplus_window.limit, 10);
    assert_eq!(loaded.logging.file, cfg.logging.file);
}

#[test]
fn access_token_is_not_written_when_empty() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    Config::default().save_to_file(tmp.path()).unwrap();
    let yaml = fs::read_to_string(tmp.path()).unwrap();
    assert!(!yaml.contains("access_token"));
}

#[test]
fn partial_file_keeps_defaults() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        b"battery:\n  target_percent: 80\nsession:\n  cycle_period_seconds: 60\n",
    )
    .unwrap();
    let cfg = Config::from_file(tmp.path()).unwrap();
    assert_eq!(cfg.battery.target_percent, 80.0);
    assert_eq!(cfg.battery.power_cap_w, 5000.0);
    assert_eq!(cfg.session.cycle_period_seconds, 60);
    assert_eq!(cfg.session.error_threshold, 3);
    assert!(cfg.validate().is_ok());
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();
    cfg.api.request_timeout_seconds = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.solar.window = WindowRetention::samples(0);
    assert!(matches!(
        cfg.validate(),
        Err(HeliosError::Validation { ref field, .. }) if field == "solar.window"
    ));

    cfg = Config::default();
    cfg.battery.target_percent = 120.0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.controls.max_charging_amps = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.scheduler.gate_min_backoff_seconds = 7200;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.timezone = "Nowhere/Special".to_string();
    assert!(cfg.validate().is_err());
}

#[test]
fn equal_daylight_hours_are_rejected() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        b"solar:\n  daylight_start_hour: 12\n  daylight_end_hour: 12\n",
    )
    .unwrap();
    let cfg = Config::from_file(tmp.path()).unwrap();
    assert!(matches!(
        cfg.validate(),
        Err(HeliosError::Validation { ref field, .. }) if field == "solar.daylight_end_hour"
    ));

    // Around the clock stays valid
    let mut cfg = Config::default();
    cfg.solar.daylight_start_hour = 0;
    cfg.solar.daylight_end_hour = 24;
    assert!(cfg.validate().is_ok());
}

#[test]
fn default_site_window_is_age_capped() {
    let cfg = Config::default();
    assert_eq!(cfg.solar.window, WindowRetention::seconds(3000));
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}

#[test]
fn from_file_missing_is_io_error() {
    let err = Config::from_file("/nonexistent/helios.yaml").unwrap_err();
    assert!(matches!(err, HeliosError::Io { .. }));
}
