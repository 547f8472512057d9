//! Comprehensive unit tests for config.rs module

use std::io::Write;

use client_pulse::config::{AppConfig, PROVIDER_ANTHROPIC, PROVIDER_LEXICON};
use client_pulse::pipeline::AnalysisSettings;

#[test]
fn test_default_database_config() {
    let config = AppConfig::default();

    assert_eq!(config.database.url, "sqlite:data/client_pulse.db");
    assert_eq!(config.database.max_connections, 10);
    assert_eq!(config.database.connection_timeout_secs, 30);
}

#[test]
fn test_default_logging_config() {
    let config = AppConfig::default();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, "text");
    assert_eq!(config.logging.file_path, None);
}

#[test]
fn test_default_analysis_and_oracle_config() {
    let config = AppConfig::default();

    assert_eq!(config.analysis.message_window, 30);
    assert_eq!(config.analysis.max_concurrent_clients, 4);
    assert_eq!(config.oracle.provider, PROVIDER_LEXICON);
    assert_eq!(config.oracle.timeout_secs, 60);
    assert_eq!(config.oracle.check_in_after_days, 21);
    assert!(config.oracle.api_key.is_none());
}

#[test]
fn test_default_digest_config() {
    let config = AppConfig::default();

    assert_eq!(config.digest.default_format, "markdown");
    assert_eq!(config.digest.output_directory, "./digests");
}

#[test]
fn test_config_validation_success() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_zero_max_connections() {
    let mut config = AppConfig::default();
    config.database.max_connections = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_invalid_log_level() {
    let mut config = AppConfig::default();
    config.logging.level = "invalid".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_valid_log_levels() {
    let valid_levels = vec!["trace", "debug", "info", "warn", "error"];
    for level in valid_levels {
        let mut config = AppConfig::default();
        config.logging.level = level.to_string();
        assert!(config.validate().is_ok(), "Failed for level: {}", level);
    }
}

#[test]
fn test_config_validation_invalid_log_format() {
    let mut config = AppConfig::default();
    config.logging.format = "xml".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_zero_message_window() {
    let mut config = AppConfig::default();
    config.analysis.message_window = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_zero_concurrency() {
    let mut config = AppConfig::default();
    config.analysis.max_concurrent_clients = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_unknown_provider() {
    let mut config = AppConfig::default();
    config.oracle.provider = "crystal_ball".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_anthropic_provider_needs_key() {
    let mut config = AppConfig::default();
    config.oracle.provider = PROVIDER_ANTHROPIC.to_string();
    config.oracle.api_key = None;
    assert!(config.validate().is_err());

    config.oracle.api_key = Some("   ".to_string());
    assert!(config.validate().is_err());

    config.oracle.api_key = Some("sk-test".to_string());
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_digest_formats() {
    for format in ["markdown", "json", "csv"] {
        let mut config = AppConfig::default();
        config.digest.default_format = format.to_string();
        assert!(config.validate().is_ok(), "Failed for format: {}", format);
    }

    let mut config = AppConfig::default();
    config.digest.default_format = "pdf".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_check_in_days() {
    let mut config = AppConfig::default();
    config.oracle.check_in_after_days = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_to_yaml_masks_api_key() {
    let mut config = AppConfig::default();
    config.oracle.api_key = Some("sk-secret-value".to_string());

    let yaml = config.to_yaml().unwrap();
    assert!(!yaml.contains("sk-secret-value"));
    assert!(yaml.contains("********"));
    assert!(yaml.contains("message_window: 30"));
}

#[test]
fn test_load_from_file_overrides_defaults() {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    writeln!(
        file,
        "analysis:\n  message_window: 12\n  max_concurrent_clients: 2\noracle:\n  check_in_after_days: 10\n"
    )
    .unwrap();

    let config = AppConfig::load_from(Some(file.path())).unwrap();
    assert_eq!(config.analysis.message_window, 12);
    assert_eq!(config.analysis.max_concurrent_clients, 2);
    assert_eq!(config.oracle.check_in_after_days, 10);
    // Untouched sections keep their defaults
    assert_eq!(config.digest.default_format, "markdown");
}

#[test]
fn test_load_from_rejects_invalid_values() {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    writeln!(file, "analysis:\n  message_window: 0\n").unwrap();

    assert!(AppConfig::load_from(Some(file.path())).is_err());
}

#[test]
fn test_analysis_settings_from_config() {
    let mut config = AppConfig::default();
    config.analysis.message_window = 15;
    config.oracle.timeout_secs = 9;

    let settings = AnalysisSettings::from(&config);
    assert_eq!(settings.message_window, 15);
    assert_eq!(settings.max_concurrent_clients, 4);
    assert_eq!(settings.oracle_timeout.as_secs(), 9);
}

#[test]
fn test_config_clone() {
    let config = AppConfig::default();
    let cloned = config.clone();
    assert_eq!(config.database.url, cloned.database.url);
    assert_eq!(config.oracle.model, cloned.oracle.model);
}
