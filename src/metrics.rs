//! Pipeline metrics
//!
//! Every event is reported through the `metrics` facade (a no-op until a
//! recorder is installed) and also tallied in-process so the CLI can print
//! a run summary without an exporter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use serde::Serialize;

use crate::digest::Digest;

const CLIENTS_TOTAL: &str = "client_pulse_clients_total";
const ANALYSIS_DURATION: &str = "client_pulse_analysis_duration_seconds";
const HEALTH_SCORE: &str = "client_pulse_health_score";
const ORACLE_FALLBACKS: &str = "client_pulse_oracle_fallbacks_total";
const SIGNALS_CREATED: &str = "client_pulse_signals_created_total";
const MESSAGES_INGESTED: &str = "client_pulse_messages_ingested_total";
const DIGEST_ENTRIES: &str = "client_pulse_digest_entries";
const ERRORS_TOTAL: &str = "client_pulse_errors_total";

/// Point-in-time copy of the in-process tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Clients scored
    pub clients_analyzed: u64,
    /// Clients skipped for lack of messages
    pub clients_skipped: u64,
    /// Client pipelines that failed
    pub clients_errored: u64,
    /// Oracle calls replaced by the neutral fallback
    pub oracle_fallbacks: u64,
    /// Signals stored from oracle proposals
    pub signals_created: u64,
    /// Messages stored by ingestion
    pub messages_ingested: u64,
    /// Messages ignored as already known
    pub duplicate_messages: u64,
}

/// Counters and histograms for analysis and ingestion
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    clients_analyzed: AtomicU64,
    clients_skipped: AtomicU64,
    clients_errored: AtomicU64,
    oracle_fallbacks: AtomicU64,
    signals_created: AtomicU64,
    messages_ingested: AtomicU64,
    duplicate_messages: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty set of tallies
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed client analysis
    pub fn record_analyzed(&self, health_score: u8, signals_created: usize, duration: Duration) {
        self.clients_analyzed.fetch_add(1, Ordering::Relaxed);
        self.signals_created
            .fetch_add(signals_created as u64, Ordering::Relaxed);

        counter!(CLIENTS_TOTAL, "outcome" => "analyzed").increment(1);
        counter!(SIGNALS_CREATED).increment(signals_created as u64);
        histogram!(HEALTH_SCORE).record(f64::from(health_score));
        histogram!(ANALYSIS_DURATION).record(duration.as_secs_f64());
    }

    /// Record a client skipped for lack of messages
    pub fn record_skipped(&self) {
        self.clients_skipped.fetch_add(1, Ordering::Relaxed);
        counter!(CLIENTS_TOTAL, "outcome" => "skipped").increment(1);
    }

    /// Record a failed client pipeline
    pub fn record_error(&self, operation: &'static str) {
        self.clients_errored.fetch_add(1, Ordering::Relaxed);
        counter!(CLIENTS_TOTAL, "outcome" => "error").increment(1);
        counter!(ERRORS_TOTAL, "operation" => operation).increment(1);
    }

    /// Record an oracle call that fell back to the neutral result
    pub fn record_oracle_fallback(&self, reason: &'static str) {
        self.oracle_fallbacks.fetch_add(1, Ordering::Relaxed);
        counter!(ORACLE_FALLBACKS, "reason" => reason).increment(1);
    }

    /// Record one ingested message
    pub fn record_ingest(&self, duplicate: bool) {
        let outcome = if duplicate {
            self.duplicate_messages.fetch_add(1, Ordering::Relaxed);
            "duplicate"
        } else {
            self.messages_ingested.fetch_add(1, Ordering::Relaxed);
            "inserted"
        };
        counter!(MESSAGES_INGESTED, "outcome" => outcome).increment(1);
    }

    /// Record the size of each digest bucket
    pub fn record_digest(&self, digest: &Digest) {
        gauge!(DIGEST_ENTRIES, "bucket" => "alerts").set(digest.alerts.len() as f64);
        gauge!(DIGEST_ENTRIES, "bucket" => "opportunities").set(digest.opportunities.len() as f64);
        gauge!(DIGEST_ENTRIES, "bucket" => "check_ins").set(digest.check_ins.len() as f64);
    }

    /// Copy the current tallies
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            clients_analyzed: self.clients_analyzed.load(Ordering::Relaxed),
            clients_skipped: self.clients_skipped.load(Ordering::Relaxed),
            clients_errored: self.clients_errored.load(Ordering::Relaxed),
            oracle_fallbacks: self.oracle_fallbacks.load(Ordering::Relaxed),
            signals_created: self.signals_created.load(Ordering::Relaxed),
            messages_ingested: self.messages_ingested.load(Ordering::Relaxed),
            duplicate_messages: self.duplicate_messages.load(Ordering::Relaxed),
        }
    }

    /// One-line human summary of the tallies
    #[must_use]
    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "analyzed={} skipped={} errors={} oracle_fallbacks={} signals_created={} ingested={} duplicates={}",
            s.clients_analyzed,
            s.clients_skipped,
            s.clients_errored,
            s.oracle_fallbacks,
            s.signals_created,
            s.messages_ingested,
            s.duplicate_messages
        )
    }
}
