//! Comprehensive unit tests for metrics.rs module

use std::time::Duration;

use chrono::Utc;
use client_pulse::digest::build_digest;
use client_pulse::metrics::{MetricsSnapshot, PipelineMetrics};

#[test]
fn test_new_metrics_are_zero() {
    let metrics = PipelineMetrics::new();
    assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
}

#[test]
fn test_record_analyzed_counts_signals() {
    let metrics = PipelineMetrics::new();
    metrics.record_analyzed(72, 2, Duration::from_millis(40));
    metrics.record_analyzed(30, 1, Duration::from_millis(25));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.clients_analyzed, 2);
    assert_eq!(snapshot.signals_created, 3);
}

#[test]
fn test_record_skipped_and_errors() {
    let metrics = PipelineMetrics::new();
    metrics.record_skipped();
    metrics.record_error("analyze_client");
    metrics.record_error("analyze_client");

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.clients_skipped, 1);
    assert_eq!(snapshot.clients_errored, 2);
    assert_eq!(snapshot.clients_analyzed, 0);
}

#[test]
fn test_record_oracle_fallbacks() {
    let metrics = PipelineMetrics::new();
    metrics.record_oracle_fallback("error");
    metrics.record_oracle_fallback("timeout");
    assert_eq!(metrics.snapshot().oracle_fallbacks, 2);
}

#[test]
fn test_record_ingest_splits_duplicates() {
    let metrics = PipelineMetrics::new();
    metrics.record_ingest(false);
    metrics.record_ingest(false);
    metrics.record_ingest(true);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.messages_ingested, 2);
    assert_eq!(snapshot.duplicate_messages, 1);
}

#[test]
fn test_record_digest_does_not_touch_tallies() {
    let metrics = PipelineMetrics::new();
    metrics.record_digest(&build_digest(&[], Utc::now()));
    assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
}

#[test]
fn test_summary_format() {
    let metrics = PipelineMetrics::new();
    metrics.record_analyzed(80, 1, Duration::from_millis(5));
    metrics.record_skipped();
    metrics.record_ingest(true);

    assert_eq!(
        metrics.summary(),
        "analyzed=1 skipped=1 errors=0 oracle_fallbacks=0 signals_created=1 ingested=0 duplicates=1"
    );
}

#[test]
fn test_metrics_shared_across_threads() {
    let metrics = std::sync::Arc::new(PipelineMetrics::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let metrics = std::sync::Arc::clone(&metrics);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    metrics.record_ingest(false);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(metrics.snapshot().messages_ingested, 100);
}
