//! Data models for clients, messages, and signals
//!
//! This module contains the record shapes shared by the store, the scoring
//! core and the digest, plus the insert/update payloads used to create them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::PulseError;

/// Free-form metadata attached to clients and messages
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Health score given to clients that have never been analyzed
pub const NEUTRAL_HEALTH_SCORE: u8 = 50;

/// Implements string conversions and SQLite text mapping for a label enum.
macro_rules! text_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            /// The stored label for this variant
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = PulseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(PulseError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

/// Coarse relationship category derived from health score and signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    /// Needs immediate attention
    AtRisk,
    /// Shows potential for expansion
    Opportunity,
    /// Positive, stable relationship
    Healthy,
    /// Never analyzed
    #[default]
    Unknown,
}

text_enum!(ClientStatus, "client status", {
    AtRisk => "at_risk",
    Opportunity => "opportunity",
    Healthy => "healthy",
    Unknown => "unknown",
});

/// Kind of observation a signal records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// Warning sign: frustration, delays, going silent
    Risk,
    /// Expansion hint: new projects, referrals, upsell
    Opportunity,
    /// Proactive outreach is due
    CheckIn,
    /// Praise or gratitude
    Positive,
    /// Direct complaint
    Negative,
}

text_enum!(SignalType, "signal type", {
    Risk => "risk",
    Opportunity => "opportunity",
    CheckIn => "check_in",
    Positive => "positive",
    Negative => "negative",
});

/// Channel a message arrived through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    /// Email
    #[default]
    Gmail,
    /// Slack chat
    Slack,
    /// Microsoft Teams chat
    Teams,
    /// Entered by hand
    Manual,
    /// Basecamp message or comment
    Basecamp,
}

text_enum!(MessageSource, "message source", {
    Gmail => "gmail",
    Slack => "slack",
    Teams => "teams",
    Manual => "manual",
    Basecamp => "basecamp",
});

/// Signal severity, always within 1..=10
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Severity(u8);

impl Severity {
    /// Lowest severity
    pub const MIN: Self = Self(1);
    /// Highest severity
    pub const MAX: Self = Self(10);

    /// Create a severity, rejecting values outside 1..=10
    pub fn new(value: i64) -> Result<Self, PulseError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (1..=10).contains(v))
            .map(Self)
            .ok_or(PulseError::InvalidSeverity(value))
    }

    /// Create a severity, pulling out-of-range values to the nearest bound
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        // 1..=10 always fits in u8 after the clamp
        Self(value.clamp(1, 10) as u8)
    }

    /// The numeric severity
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Severity {
    type Error = PulseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Severity> for i64 {
    fn from(severity: Severity) -> Self {
        Self::from(severity.0)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for Severity {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.0)))
    }
}

impl FromSql for Severity {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_i64()?;
        Self::new(raw).map_err(|_| FromSqlError::OutOfRange(raw))
    }
}

/// A monitored client relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Database primary key
    pub id: i64,
    /// Display name
    pub name: String,
    /// Company name
    pub company: String,
    /// Contact email, unique per client
    pub email: String,
    /// Status from the most recent analysis
    pub status: ClientStatus,
    /// Health score from the most recent analysis (0-100)
    pub health_score: u8,
    /// Timestamp of the latest message exchanged
    pub last_contact_date: Option<DateTime<Utc>>,
    /// Total messages on record
    pub total_messages: i64,
    /// Typical hours to respond to the client
    pub response_time_avg: Option<f64>,
    /// Overall sentiment (-1.0 to 1.0)
    pub sentiment_avg: Option<f64>,
    /// Free-form metadata
    pub metadata: Metadata,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// One communication event with a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Database primary key
    pub id: i64,
    /// Owning client
    pub client_id: i64,
    /// Conversation thread, if the channel has one
    pub thread_id: Option<String>,
    /// Sender address
    pub from_email: String,
    /// Recipient address
    pub to_email: String,
    /// Subject line
    pub subject: String,
    /// Full body
    pub body: String,
    /// Short excerpt of the body
    pub body_snippet: String,
    /// When the message was sent
    pub timestamp: DateTime<Utc>,
    /// Channel the message came from
    pub source: MessageSource,
    /// Sentiment score (-1.0 to 1.0, if available)
    pub sentiment_score: Option<f64>,
    /// True when the client sent the message
    pub is_from_client: bool,
    /// True once a scoring pass has consumed the message
    pub analyzed: bool,
    /// Channel-specific id used for deduplication
    pub external_id: String,
    /// Free-form metadata
    pub metadata: Metadata,
    /// Timestamp when the message was stored
    pub created_at: DateTime<Utc>,
}

/// A discrete, evidence-backed observation about a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Database primary key
    pub id: i64,
    /// Owning client
    pub client_id: i64,
    /// Originating message; may dangle, never dereferenced by scoring
    pub message_id: Option<i64>,
    /// Kind of observation
    pub signal_type: SignalType,
    /// Urgency within its type
    pub severity: Severity,
    /// Short title
    pub title: String,
    /// What was detected and why it matters
    pub description: String,
    /// Verbatim quote backing the signal
    pub context: Option<String>,
    /// True once a person (or automation) acted on it
    pub addressed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Signal {
    /// True for an unaddressed signal of the given type
    #[must_use]
    pub fn is_open(&self, signal_type: SignalType) -> bool {
        !self.addressed && self.signal_type == signal_type
    }
}

/// Data for registering a new client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClient {
    /// Display name
    pub name: String,
    /// Company name
    pub company: String,
    /// Contact email
    pub email: String,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: Metadata,
}

/// Administrative edit of a client's profile
///
/// Score and status are deliberately absent: only the analysis pipeline
/// writes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientUpdate {
    /// New display name
    pub name: Option<String>,
    /// New company name
    pub company: Option<String>,
    /// New contact email
    pub email: Option<String>,
    /// Replacement metadata
    pub metadata: Option<Metadata>,
}

/// Data for storing a new message
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Owning client
    pub client_id: i64,
    /// Conversation thread
    pub thread_id: Option<String>,
    /// Sender address
    pub from_email: String,
    /// Recipient address
    pub to_email: String,
    /// Subject line
    pub subject: String,
    /// Full body
    pub body: String,
    /// Short excerpt
    pub body_snippet: String,
    /// When the message was sent
    pub timestamp: DateTime<Utc>,
    /// Channel the message came from
    pub source: MessageSource,
    /// Sentiment score (-1.0 to 1.0)
    pub sentiment_score: Option<f64>,
    /// True when the client sent the message
    pub is_from_client: bool,
    /// Channel-specific id used for deduplication
    pub external_id: String,
    /// Free-form metadata
    pub metadata: Metadata,
}

/// Data for storing a new signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSignal {
    /// Owning client
    pub client_id: i64,
    /// Originating message
    pub message_id: Option<i64>,
    /// Kind of observation
    pub signal_type: SignalType,
    /// Urgency within its type
    pub severity: Severity,
    /// Short title
    pub title: String,
    /// Longer description
    pub description: String,
    /// Verbatim quote
    pub context: Option<String>,
}

/// Values written back to a client after a scoring pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientAssessment {
    /// Recomputed health score
    pub health_score: u8,
    /// Recomputed status
    pub status: ClientStatus,
    /// Sentiment reported by the oracle
    pub sentiment_avg: f64,
    /// Total messages on record
    pub total_messages: i64,
    /// Typical hours to respond
    pub response_time_avg: Option<f64>,
}

/// A client together with its unaddressed signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSignals {
    /// The owning client
    pub client: Client,
    /// Its unaddressed signals
    pub signals: Vec<Signal>,
}

/// Portfolio-level counts for the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Number of monitored clients
    pub total_clients: i64,
    /// Clients currently at risk
    pub at_risk_count: i64,
    /// Clients currently flagged as opportunities
    pub opportunity_count: i64,
    /// Clients currently healthy
    pub healthy_count: i64,
    /// Mean health score across clients (0 when there are none)
    pub avg_health_score: f64,
    /// Unaddressed signals across clients
    pub unread_signals: i64,
}
