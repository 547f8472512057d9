//! Fixtures shared by the integration tests
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use client_pulse::db::Database;
use client_pulse::models::{
    Client, ClientStatus, Message, MessageSource, Metadata, Severity, Signal, SignalType,
};
use tempfile::TempDir;

/// Fixed reference time so date arithmetic is reproducible
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    now() - chrono::Duration::hours(hours)
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - chrono::Duration::days(days)
}

pub fn client(id: i64, name: &str) -> Client {
    Client {
        id,
        name: name.to_string(),
        company: format!("{name} Co"),
        email: format!("{}@example.com", name.to_lowercase()),
        status: ClientStatus::Unknown,
        health_score: 50,
        last_contact_date: None,
        total_messages: 0,
        response_time_avg: None,
        sentiment_avg: None,
        metadata: Metadata::new(),
        created_at: days_ago(365),
        updated_at: days_ago(365),
    }
}

pub fn message(id: i64, client_id: i64, is_from_client: bool, timestamp: DateTime<Utc>) -> Message {
    Message {
        id,
        client_id,
        thread_id: None,
        from_email: if is_from_client { "client@example.com" } else { "me@agency.io" }.to_string(),
        to_email: String::new(),
        subject: "Project update".to_string(),
        body: "Some text".to_string(),
        body_snippet: "Some text".to_string(),
        timestamp,
        source: MessageSource::Gmail,
        sentiment_score: None,
        is_from_client,
        analyzed: false,
        external_id: format!("msg-{id}"),
        metadata: Metadata::new(),
        created_at: timestamp,
    }
}

pub fn signal(id: i64, client_id: i64, signal_type: SignalType, severity: u8) -> Signal {
    Signal {
        id,
        client_id,
        message_id: None,
        signal_type,
        severity: Severity::new(i64::from(severity)).unwrap(),
        title: format!("{signal_type} #{id}"),
        description: String::new(),
        context: None,
        addressed: false,
        created_at: hours_ago(id),
    }
}

/// A fresh database in its own temporary directory
pub fn temp_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("test.db").display());
    let db = Database::new(&url).expect("Failed to create database");
    (dir, db)
}
