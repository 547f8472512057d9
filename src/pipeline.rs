//! Analysis pipeline
//!
//! Runs the strictly ordered per-client pass (fetch messages, consult the
//! oracle, store proposed signals, score, classify, persist) and a batch
//! runner that analyzes clients concurrently while keeping each client's
//! failure to itself.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::db::Database;
use crate::error::{PulseError, Result};
use crate::logging::OperationTimer;
use crate::metrics::PipelineMetrics;
use crate::models::{Client, ClientAssessment, ClientStatus, Message, NewSignal, Signal};
use crate::oracle::{ClientContext, Oracle, OracleResult, TranscriptEntry};
use crate::response_time::estimate_response_time;
use crate::scoring::score_and_classify;

/// Reason reported for clients with nothing to analyze
pub const NO_MESSAGES_REASON: &str = "No messages to analyze";

/// Tunables for the analysis pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSettings {
    /// Newest messages considered per client
    pub message_window: usize,
    /// Clients analyzed at once by a batch run
    pub max_concurrent_clients: usize,
    /// Longest wait for one oracle call
    pub oracle_timeout: Duration,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            message_window: 30,
            max_concurrent_clients: 4,
            oracle_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&AppConfig> for AnalysisSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            message_window: config.analysis.message_window,
            max_concurrent_clients: config.analysis.max_concurrent_clients,
            oracle_timeout: Duration::from_secs(config.oracle.timeout_secs),
        }
    }
}

/// What happened to one client during an analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClientOutcome {
    /// The client was scored and persisted
    Analyzed {
        /// Client id
        client_id: i64,
        /// Client name
        client_name: String,
        /// New health score
        health_score: u8,
        /// New status
        client_status: ClientStatus,
        /// Signals stored from the oracle's proposals
        signals_created: usize,
        /// Messages in the analysis window
        messages_analyzed: usize,
        /// True when the oracle failed and the neutral fallback was used
        oracle_fallback: bool,
    },
    /// The client had nothing to analyze
    Skipped {
        /// Client id
        client_id: i64,
        /// Client name
        client_name: String,
        /// Why it was skipped
        reason: String,
    },
    /// The client's pipeline failed
    Error {
        /// Client id
        client_id: i64,
        /// Client name
        client_name: String,
        /// Failure description
        error: String,
    },
}

impl ClientOutcome {
    /// The client this outcome is about
    #[must_use]
    pub const fn client_id(&self) -> i64 {
        match self {
            Self::Analyzed { client_id, .. }
            | Self::Skipped { client_id, .. }
            | Self::Error { client_id, .. } => *client_id,
        }
    }

    fn error(client: &Client, error: impl ToString) -> Self {
        Self::Error {
            client_id: client.id,
            client_name: client.name.clone(),
            error: error.to_string(),
        }
    }
}

/// Per-client outcomes of a batch run plus aggregate counts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// Clients considered
    pub total_clients: usize,
    /// Clients scored
    pub analyzed: usize,
    /// Clients skipped
    pub skipped: usize,
    /// Clients whose pipeline failed
    pub errors: usize,
    /// One outcome per client, in client list order
    pub results: Vec<ClientOutcome>,
}

impl BatchReport {
    fn from_results(results: Vec<ClientOutcome>) -> Self {
        let count = |pred: fn(&ClientOutcome) -> bool| results.iter().filter(|r| pred(r)).count();
        Self {
            total_clients: results.len(),
            analyzed: count(|r| matches!(r, ClientOutcome::Analyzed { .. })),
            skipped: count(|r| matches!(r, ClientOutcome::Skipped { .. })),
            errors: count(|r| matches!(r, ClientOutcome::Error { .. })),
            results,
        }
    }

    /// Build a report from per-client slots, reporting a lost slot as an error
    fn from_slots(slots: Vec<Option<ClientOutcome>>, clients: &[Client]) -> Self {
        let results = slots
            .into_iter()
            .zip(clients)
            .map(|(slot, client)| {
                slot.unwrap_or_else(|| {
                    ClientOutcome::error(client, "Analysis task ended without an outcome")
                })
            })
            .collect();
        Self::from_results(results)
    }
}

/// Orchestrates analysis over the record store and an oracle
#[derive(Clone)]
pub struct AnalysisService {
    db: Database,
    oracle: Arc<dyn Oracle>,
    settings: AnalysisSettings,
    metrics: Arc<PipelineMetrics>,
}

impl AnalysisService {
    /// Create a service from its collaborators
    pub fn new(
        db: Database,
        oracle: Arc<dyn Oracle>,
        settings: AnalysisSettings,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            db,
            oracle,
            settings,
            metrics,
        }
    }

    /// Tallies recorded by this service
    #[must_use]
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Run a store operation on the blocking pool
    async fn with_db<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || operation(&db))
            .await
            .map_err(|e| PulseError::Other(format!("Database task failed: {e}")))?
    }

    /// Analyze one client now
    pub async fn analyze_client(&self, client_id: i64) -> Result<ClientOutcome> {
        self.analyze_client_at(client_id, Utc::now()).await
    }

    /// Analyze one client as of `now`
    ///
    /// Fails with [`PulseError::ClientNotFound`] for an unknown id; any other
    /// failure is returned as is.
    pub async fn analyze_client_at(
        &self,
        client_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ClientOutcome> {
        let client = self
            .with_db(move |db| db.require_client(client_id))
            .await?;

        let outcome = self.run_pipeline(client, now).await;
        if outcome.is_err() {
            self.metrics.record_error("analyze_client");
        }
        outcome
    }

    /// Analyze every client, isolating per-client failures
    pub async fn analyze_all(&self) -> Result<BatchReport> {
        self.analyze_all_at(Utc::now()).await
    }

    /// Analyze every client as of `now`
    ///
    /// Only fails if the client list itself cannot be read.
    pub async fn analyze_all_at(&self, now: DateTime<Utc>) -> Result<BatchReport> {
        let timer = OperationTimer::new("analyze_all");
        let clients = self.with_db(Database::list_clients).await?;
        let total = clients.len();
        let roster = clients.clone();

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_clients.max(1)));
        let mut tasks = JoinSet::new();

        for (index, client) in clients.into_iter().enumerate() {
            let service = self.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, ClientOutcome::error(&client, "Analysis was shut down"));
                };

                // Run in a nested task so a panic becomes this client's error
                let worker = service.clone();
                let target = client.clone();
                let outcome = match tokio::spawn(async move { worker.analyze_loaded(target, now).await }).await {
                    Ok(outcome) => outcome,
                    Err(join_error) => {
                        service.metrics.record_error("analyze_client");
                        error!(client_id = client.id, error = %join_error, "Client analysis panicked");
                        ClientOutcome::error(&client, format!("Analysis task failed: {join_error}"))
                    }
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<ClientOutcome>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(join_error) => {
                    self.metrics.record_error("analyze_client");
                    error!(error = %join_error, "Batch task was cancelled");
                }
            }
        }

        let report = BatchReport::from_slots(slots, &roster);

        info!(
            total = report.total_clients,
            analyzed = report.analyzed,
            skipped = report.skipped,
            errors = report.errors,
            "Batch analysis finished"
        );
        timer.finish();

        Ok(report)
    }

    /// Analyze an already loaded client, folding failure into the outcome
    async fn analyze_loaded(&self, client: Client, now: DateTime<Utc>) -> ClientOutcome {
        match self.run_pipeline(client.clone(), now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.metrics.record_error("analyze_client");
                error!(client_id = client.id, error = %e, "Client analysis failed");
                ClientOutcome::error(&client, e)
            }
        }
    }

    async fn run_pipeline(&self, mut client: Client, now: DateTime<Utc>) -> Result<ClientOutcome> {
        let timer = OperationTimer::new("analyze_client");
        let client_id = client.id;
        let window = self.settings.message_window;

        let messages = self
            .with_db(move |db| db.recent_messages(client_id, window))
            .await?;
        if messages.is_empty() {
            self.metrics.record_skipped();
            info!(client_id, "Skipping client with no messages");
            return Ok(ClientOutcome::Skipped {
                client_id,
                client_name: client.name,
                reason: NO_MESSAGES_REASON.to_string(),
            });
        }

        let total_messages = self.with_db(move |db| db.count_messages(client_id)).await?;
        client.total_messages = total_messages;

        let open_signals = self
            .with_db(move |db| db.unaddressed_signals(client_id))
            .await?;
        let (analysis, oracle_fallback) = self
            .consult_oracle(&client, &messages, &open_signals, now)
            .await;

        let proposals: Vec<NewSignal> = analysis
            .signals
            .into_iter()
            .map(|proposal| proposal.into_new_signal(client_id))
            .collect();
        let created = self.with_db(move |db| db.insert_signals(&proposals)).await?;

        let signals = self
            .with_db(move |db| db.unaddressed_signals(client_id))
            .await?;

        if let Some(hours) = estimate_response_time(&messages) {
            client.response_time_avg = Some(hours);
        }

        let assessment = score_and_classify(&client, &messages, &signals, now);
        let update = ClientAssessment {
            health_score: assessment.health_score,
            status: assessment.status,
            sentiment_avg: analysis.sentiment_score,
            total_messages,
            response_time_avg: client.response_time_avg,
        };
        self.with_db(move |db| db.commit_assessment(client_id, &update))
            .await?;

        self.metrics
            .record_analyzed(assessment.health_score, created.len(), timer.elapsed());
        info!(
            client_id,
            health_score = assessment.health_score,
            status = %assessment.status,
            signals_created = created.len(),
            "Client analyzed"
        );

        Ok(ClientOutcome::Analyzed {
            client_id,
            client_name: client.name,
            health_score: assessment.health_score,
            client_status: assessment.status,
            signals_created: created.len(),
            messages_analyzed: messages.len(),
            oracle_fallback,
        })
    }

    /// Call the oracle, substituting the neutral fallback on error or timeout
    async fn consult_oracle(
        &self,
        client: &Client,
        messages: &[Message],
        open_signals: &[Signal],
        now: DateTime<Utc>,
    ) -> (OracleResult, bool) {
        let context = ClientContext::from_client(client, now).with_open_signals(open_signals);
        let transcript: Vec<TranscriptEntry> = messages.iter().map(TranscriptEntry::from).collect();

        match tokio::time::timeout(
            self.settings.oracle_timeout,
            self.oracle.infer(&context, &transcript),
        )
        .await
        {
            Ok(Ok(result)) => (result, false),
            Ok(Err(e)) => {
                warn!(client_id = client.id, error = %e, "Oracle failed, using neutral fallback");
                self.metrics.record_oracle_fallback("error");
                (OracleResult::fallback(&e.to_string()), true)
            }
            Err(_) => {
                let reason = format!(
                    "timed out after {}s",
                    self.settings.oracle_timeout.as_secs_f64()
                );
                warn!(client_id = client.id, "Oracle {reason}, using neutral fallback");
                self.metrics.record_oracle_fallback("timeout");
                (OracleResult::fallback(&reason), true)
            }
        }
    }
}
