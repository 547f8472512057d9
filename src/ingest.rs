//! Message ingestion
//!
//! Turns a channel-normalized message payload into a stored [`Message`],
//! registering the client on first contact. Re-ingesting a message with a
//! known `(source, external_id)` is a no-op.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::{Database, MessageInsert};
use crate::error::{PulseError, Result};
use crate::metrics::PipelineMetrics;
use crate::models::{Client, Message, MessageSource, Metadata, NewClient, NewMessage};
use crate::sentiment::SentimentAnalyzer;
use crate::validation::InputValidator;

/// Characters kept when deriving a snippet from the body
pub const SNIPPET_CHARS: usize = 200;
/// Company recorded for auto-registered clients
pub const UNKNOWN_COMPANY: &str = "Unknown";

/// A message as delivered by a channel adapter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Contact email of the client the conversation belongs to
    #[serde(default)]
    pub client_email: String,
    /// Sender address
    #[serde(default)]
    pub from_email: String,
    /// Subject line
    #[serde(default)]
    pub subject: String,
    /// Client display name, used when the client is new
    pub client_name: Option<String>,
    /// Company, used when the client is new
    pub company: Option<String>,
    /// Recipient address
    pub to_email: Option<String>,
    /// Full body
    pub body: Option<String>,
    /// Short excerpt
    pub body_snippet: Option<String>,
    /// When the message was sent (defaults to now)
    pub timestamp: Option<DateTime<Utc>>,
    /// Conversation thread
    pub thread_id: Option<String>,
    /// Channel-specific message id
    pub message_id: Option<String>,
    /// Channel (defaults to gmail)
    pub source: Option<MessageSource>,
    /// Precomputed sentiment
    pub sentiment_score: Option<f64>,
    /// Extra channel metadata
    #[serde(default)]
    pub metadata: Metadata,
}

/// Result of ingesting one message
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// The message was stored
    Inserted {
        /// The stored message
        message: Message,
        /// True when the client was registered by this call
        client_created: bool,
    },
    /// The message was already known; nothing was written
    Duplicate {
        /// Owning client
        client_id: i64,
        /// The external id that matched
        external_id: String,
    },
}

/// Counts from a batch ingestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Messages stored
    pub inserted: usize,
    /// Messages skipped as duplicates
    pub duplicates: usize,
    /// Messages rejected or failed
    pub failed: usize,
}

/// Derive a display name from an email address
///
/// `jane.doe@acme.com` becomes `Jane Doe`.
#[must_use]
pub fn extract_name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    local
        .split(['.', '_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a deduplication id for a message that arrived without one
#[must_use]
pub fn generate_external_id(from_email: &str, timestamp: DateTime<Utc>, subject: &str) -> String {
    format!("{from_email}-{}-{subject}", timestamp.to_rfc3339())
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}

fn invalid(err: &anyhow::Error) -> PulseError {
    PulseError::InvalidInput(err.to_string())
}

/// Stores incoming messages and keeps client contact dates current
pub struct Ingestor {
    db: Database,
    analyzer: SentimentAnalyzer,
    metrics: Arc<PipelineMetrics>,
}

impl Ingestor {
    /// Create an ingestor over `db`
    pub fn new(db: Database, metrics: Arc<PipelineMetrics>) -> Result<Self> {
        Ok(Self {
            db,
            analyzer: SentimentAnalyzer::new()?,
            metrics,
        })
    }

    /// Ingest a single message
    pub fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome> {
        Self::check_required(&request)?;
        InputValidator::validate_email(&request.client_email).map_err(|e| invalid(&e))?;
        InputValidator::validate_email(&request.from_email).map_err(|e| invalid(&e))?;
        InputValidator::validate_subject(&request.subject).map_err(|e| invalid(&e))?;

        let timestamp = request.timestamp.unwrap_or_else(Utc::now);
        InputValidator::validate_timestamp(timestamp).map_err(|e| invalid(&e))?;

        let (client, client_created) = self.find_or_create_client(&request)?;
        let new_message = self.build_message(&client, request, timestamp)?;
        let external_id = new_message.external_id.clone();

        match self.db.insert_message(&new_message)? {
            MessageInsert::Duplicate => {
                debug!(client_id = client.id, external_id = %external_id, "Message already ingested");
                self.metrics.record_ingest(true);
                Ok(IngestOutcome::Duplicate {
                    client_id: client.id,
                    external_id,
                })
            }
            MessageInsert::Inserted(message) => {
                self.db.advance_last_contact(client.id, message.timestamp)?;
                self.metrics.record_ingest(false);
                debug!(client_id = client.id, message_id = message.id, "Message stored");
                Ok(IngestOutcome::Inserted {
                    message,
                    client_created,
                })
            }
        }
    }

    /// Ingest many messages, continuing past individual failures
    pub fn ingest_all(&self, requests: Vec<IngestRequest>) -> IngestSummary {
        let mut summary = IngestSummary::default();

        for (index, request) in requests.into_iter().enumerate() {
            match self.ingest(request) {
                Ok(IngestOutcome::Inserted { .. }) => summary.inserted += 1,
                Ok(IngestOutcome::Duplicate { .. }) => summary.duplicates += 1,
                Err(e) => {
                    warn!(index, error = %e, "Failed to ingest message");
                    summary.failed += 1;
                }
            }
        }

        info!(
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            failed = summary.failed,
            "Ingestion finished"
        );
        summary
    }

    fn check_required(request: &IngestRequest) -> Result<()> {
        let missing: Vec<&str> = [
            ("client_email", &request.client_email),
            ("from_email", &request.from_email),
            ("subject", &request.subject),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PulseError::InvalidInput(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    fn find_or_create_client(&self, request: &IngestRequest) -> Result<(Client, bool)> {
        if let Some(client) = self.db.find_client_by_email(&request.client_email)? {
            return Ok((client, false));
        }

        let name = match request.client_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => extract_name_from_email(&request.client_email),
        };
        InputValidator::validate_client_name(&name).map_err(|e| invalid(&e))?;

        let company = request
            .company
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNKNOWN_COMPANY)
            .to_string();

        let client = self.db.create_client(&NewClient {
            name,
            company,
            email: request.client_email.trim().to_string(),
            metadata: Metadata::new(),
        })?;
        info!(client_id = client.id, email = %client.email, "Registered new client");

        Ok((client, true))
    }

    fn build_message(
        &self,
        client: &Client,
        request: IngestRequest,
        timestamp: DateTime<Utc>,
    ) -> Result<NewMessage> {
        let body = request
            .body
            .as_deref()
            .map(InputValidator::sanitize_text)
            .filter(|b| !b.is_empty());
        let snippet = request
            .body_snippet
            .as_deref()
            .map(InputValidator::sanitize_text)
            .filter(|s| !s.is_empty());

        let (body, body_snippet) = match (body, snippet) {
            (Some(body), Some(snippet)) => (body, snippet),
            (Some(body), None) => {
                let snippet = body.chars().take(SNIPPET_CHARS).collect();
                (body, snippet)
            }
            (None, Some(snippet)) => (snippet.clone(), snippet),
            (None, None) => (String::new(), String::new()),
        };

        let sentiment_score = match request.sentiment_score {
            Some(score) => {
                InputValidator::validate_sentiment(score).map_err(|e| invalid(&e))?;
                Some(score.clamp(-1.0, 1.0))
            }
            None => self.analyzer.score(&body),
        };

        let is_from_client = request
            .from_email
            .trim()
            .eq_ignore_ascii_case(client.email.trim());

        let external_id = request
            .message_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or_else(
                || generate_external_id(&request.from_email, timestamp, &request.subject),
                ToString::to_string,
            );

        let mut metadata = request.metadata;
        metadata.insert(
            "external_id".to_string(),
            serde_json::Value::String(external_id.clone()),
        );

        Ok(NewMessage {
            client_id: client.id,
            thread_id: request.thread_id,
            from_email: request.from_email,
            to_email: request.to_email.unwrap_or_default(),
            subject: request.subject,
            body,
            body_snippet,
            timestamp,
            source: request.source.unwrap_or_default(),
            sentiment_score,
            is_from_client,
            external_id,
            metadata,
        })
    }
}
