//! Comprehensive unit tests for validation.rs module

use chrono::{Duration, Utc};
use client_pulse::validation::InputValidator;
use std::path::Path;

#[test]
fn test_validate_client_name_valid() {
    assert!(InputValidator::validate_client_name("Jane Doe").is_ok());
}

#[test]
fn test_validate_client_name_empty() {
    assert!(InputValidator::validate_client_name("").is_err());
    assert!(InputValidator::validate_client_name("   ").is_err());
}

#[test]
fn test_validate_client_name_length() {
    assert!(InputValidator::validate_client_name(&"a".repeat(100)).is_ok());
    assert!(InputValidator::validate_client_name(&"a".repeat(101)).is_err());
}

#[test]
fn test_validate_client_name_control_chars() {
    assert!(InputValidator::validate_client_name("Jane\0Doe").is_err());
    assert!(InputValidator::validate_client_name("Jane\nDoe").is_err());
    assert!(InputValidator::validate_client_name("Jane\rDoe").is_err());
}

#[test]
fn test_validate_client_name_unicode() {
    assert!(InputValidator::validate_client_name("José García").is_ok());
}

#[test]
fn test_validate_company() {
    assert!(InputValidator::validate_company("Acme Corp").is_ok());
    assert!(InputValidator::validate_company("").is_err());
    assert!(InputValidator::validate_company(&"c".repeat(201)).is_err());
}

#[test]
fn test_validate_email_valid() {
    assert!(InputValidator::validate_email("jane@acme.com").is_ok());
    assert!(InputValidator::validate_email("jane.doe+crm@mail.acme.co.uk").is_ok());
}

#[test]
fn test_validate_email_invalid() {
    assert!(InputValidator::validate_email("").is_err());
    assert!(InputValidator::validate_email("no-at-sign.com").is_err());
    assert!(InputValidator::validate_email("two@@acme.com").is_err());
    assert!(InputValidator::validate_email("@acme.com").is_err());
    assert!(InputValidator::validate_email("jane@localhost").is_err());
    assert!(InputValidator::validate_email(&format!("{}@acme.com", "a".repeat(65))).is_err());
}

#[test]
fn test_validate_subject() {
    assert!(InputValidator::validate_subject("Quarterly review").is_ok());
    assert!(InputValidator::validate_subject(" ").is_err());
    assert!(InputValidator::validate_subject(&"s".repeat(1001)).is_err());
}

#[test]
fn test_validate_sentiment() {
    assert!(InputValidator::validate_sentiment(0.3).is_ok());
    // Out of range values are clamped later, not rejected
    assert!(InputValidator::validate_sentiment(-7.0).is_ok());
    assert!(InputValidator::validate_sentiment(f64::NAN).is_err());
    assert!(InputValidator::validate_sentiment(f64::INFINITY).is_err());
}

#[test]
fn test_validate_timestamp() {
    assert!(InputValidator::validate_timestamp(Utc::now()).is_ok());
    assert!(InputValidator::validate_timestamp(Utc::now() - Duration::days(400)).is_ok());
    assert!(InputValidator::validate_timestamp(Utc::now() + Duration::hours(2)).is_ok());
    assert!(InputValidator::validate_timestamp(Utc::now() + Duration::days(3)).is_err());
}

#[test]
fn test_validate_file_path() {
    assert!(InputValidator::validate_file_path(Path::new("inbox/messages.json")).is_ok());
    assert!(InputValidator::validate_file_path(Path::new("")).is_err());
    assert!(InputValidator::validate_file_path(Path::new("../secrets.json")).is_err());
    assert!(InputValidator::validate_file_path(Path::new("~/messages.json")).is_err());
}

#[test]
fn test_validate_message_window() {
    assert!(InputValidator::validate_message_window(1).is_ok());
    assert!(InputValidator::validate_message_window(1000).is_ok());
    assert!(InputValidator::validate_message_window(0).is_err());
    assert!(InputValidator::validate_message_window(1001).is_err());
}

#[test]
fn test_sanitize_text() {
    assert_eq!(InputValidator::sanitize_text("  hello\u{0007} world  "), "hello world");
    assert_eq!(InputValidator::sanitize_text("line one\nline two"), "line one\nline two");
    assert_eq!(InputValidator::sanitize_text(""), "");
}

#[test]
fn test_validate_database_url() {
    assert!(InputValidator::validate_database_url("sqlite:data/client_pulse.db").is_ok());
    assert!(InputValidator::validate_database_url("sqlite:///tmp/pulse.db").is_ok());
    assert!(InputValidator::validate_database_url("").is_err());
    assert!(InputValidator::validate_database_url("postgres://localhost/pulse").is_err());
}
