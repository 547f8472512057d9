//! Tests for message ingestion

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use client_pulse::error::PulseError;
use client_pulse::ingest::{IngestOutcome, IngestRequest, Ingestor, UNKNOWN_COMPANY};
use client_pulse::metrics::PipelineMetrics;
use client_pulse::models::MessageSource;
use common::temp_db;

fn request(from: &str, message_id: &str) -> IngestRequest {
    IngestRequest {
        client_email: "jane.doe@acme.com".to_string(),
        from_email: from.to_string(),
        subject: "Kickoff".to_string(),
        body: Some("Thanks, the plan looks great".to_string()),
        timestamp: Some(Utc::now() - Duration::hours(1)),
        message_id: Some(message_id.to_string()),
        ..IngestRequest::default()
    }
}

#[test]
fn test_first_message_registers_client() {
    let (_dir, db) = temp_db();
    let ingestor = Ingestor::new(db.clone(), Arc::new(PipelineMetrics::new())).unwrap();

    let outcome = ingestor
        .ingest(request("jane.doe@acme.com", "m1"))
        .unwrap();
    let IngestOutcome::Inserted {
        message,
        client_created,
    } = outcome
    else {
        panic!("expected an insert");
    };

    assert!(client_created);
    assert!(message.is_from_client);
    assert_eq!(message.source, MessageSource::Gmail);
    assert_eq!(message.body_snippet, "Thanks, the plan looks great");
    assert!(message.sentiment_score.unwrap() > 0.0);
    assert_eq!(message.metadata["external_id"], "m1");

    let client = db.require_client(message.client_id).unwrap();
    assert_eq!(client.name, "Jane Doe");
    assert_eq!(client.company, UNKNOWN_COMPANY);
    assert_eq!(client.last_contact_date, Some(message.timestamp));
}

#[test]
fn test_reingest_is_a_noop() {
    let (_dir, db) = temp_db();
    let metrics = Arc::new(PipelineMetrics::new());
    let ingestor = Ingestor::new(db.clone(), Arc::clone(&metrics)).unwrap();

    ingestor.ingest(request("me@agency.io", "m1")).unwrap();
    let again = ingestor.ingest(request("me@agency.io", "m1")).unwrap();

    assert!(matches!(again, IngestOutcome::Duplicate { ref external_id, .. } if external_id == "m1"));
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.messages_ingested, 1);
    assert_eq!(snapshot.duplicate_messages, 1);
}

#[test]
fn test_operator_message_direction_and_case() {
    let (_dir, db) = temp_db();
    let ingestor = Ingestor::new(db, Arc::new(PipelineMetrics::new())).unwrap();

    let from_operator = ingestor.ingest(request("me@agency.io", "m1")).unwrap();
    let from_client = ingestor.ingest(request("JANE.DOE@ACME.COM", "m2")).unwrap();

    assert!(matches!(from_operator, IngestOutcome::Inserted { ref message, .. } if !message.is_from_client));
    assert!(matches!(from_client, IngestOutcome::Inserted { ref message, client_created: false } if message.is_from_client));
}

#[test]
fn test_missing_required_fields_are_named() {
    let (_dir, db) = temp_db();
    let ingestor = Ingestor::new(db, Arc::new(PipelineMetrics::new())).unwrap();

    let err = ingestor.ingest(IngestRequest::default()).unwrap_err();
    match err {
        PulseError::InvalidInput(msg) => {
            assert!(msg.contains("client_email"));
            assert!(msg.contains("from_email"));
            assert!(msg.contains("subject"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_provided_sentiment_is_clamped() {
    let (_dir, db) = temp_db();
    let ingestor = Ingestor::new(db, Arc::new(PipelineMetrics::new())).unwrap();

    let mut req = request("me@agency.io", "m1");
    req.sentiment_score = Some(4.2);
    let outcome = ingestor.ingest(req).unwrap();
    assert!(matches!(outcome, IngestOutcome::Inserted { ref message, .. } if message.sentiment_score == Some(1.0)));

    let mut bad = request("me@agency.io", "m2");
    bad.sentiment_score = Some(f64::NAN);
    assert!(ingestor.ingest(bad).is_err());
}

#[test]
fn test_generated_external_id_deduplicates() {
    let (_dir, db) = temp_db();
    let ingestor = Ingestor::new(db, Arc::new(PipelineMetrics::new())).unwrap();

    let mut req = request("me@agency.io", "");
    req.message_id = None;
    ingestor.ingest(req.clone()).unwrap();
    assert!(matches!(
        ingestor.ingest(req).unwrap(),
        IngestOutcome::Duplicate { .. }
    ));
}

#[test]
fn test_older_message_does_not_rewind_last_contact() {
    let (_dir, db) = temp_db();
    let ingestor = Ingestor::new(db.clone(), Arc::new(PipelineMetrics::new())).unwrap();

    let newer = request("me@agency.io", "m1");
    let newest_ts = newer.timestamp.unwrap();
    ingestor.ingest(newer).unwrap();

    let mut older = request("me@agency.io", "m0");
    older.timestamp = Some(newest_ts - Duration::days(10));
    let outcome = ingestor.ingest(older).unwrap();

    let IngestOutcome::Inserted { message, .. } = outcome else {
        panic!("expected an insert");
    };
    let client = db.require_client(message.client_id).unwrap();
    assert_eq!(client.last_contact_date, Some(newest_ts));
}

#[test]
fn test_batch_continues_past_failures() {
    let (_dir, db) = temp_db();
    let ingestor = Ingestor::new(db, Arc::new(PipelineMetrics::new())).unwrap();

    let summary = ingestor.ingest_all(vec![
        request("me@agency.io", "m1"),
        IngestRequest::default(),
        request("me@agency.io", "m1"),
        request("jane.doe@acme.com", "m2"),
    ]);

    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.failed, 1);
}

#[test]
fn test_request_deserializes_from_channel_json() {
    let json = r#"{
        "client_email": "sam@globex.com",
        "from_email": "sam@globex.com",
        "subject": "Renewal",
        "source": "slack",
        "timestamp": "2026-09-01T10:00:00Z",
        "metadata": {"channel": "C042"}
    }"#;
    let req: IngestRequest = serde_json::from_str(json).unwrap();
    assert_eq!(req.source, Some(MessageSource::Slack));
    assert!(req.body.is_none());
    assert_eq!(req.metadata["channel"], "C042");
}
