//! Natural-language inference over a client's conversation
//!
//! An [`Oracle`] reads a client's recent transcript and proposes a sentiment
//! score, an advisory status and health score, and candidate signals. Its
//! output is advisory: the scoring core recomputes score and status itself.
//!
//! Two implementations are provided:
//! - [`AnthropicOracle`] calls the Anthropic Messages API
//! - [`LexiconOracle`] runs offline with the local sentiment lexicon

use std::collections::HashSet;
use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OracleSettings;
use crate::error::{PulseError, Result};
use crate::models::{
    Client, ClientStatus, Message, MessageSource, NewSignal, Severity, Signal, SignalType,
    NEUTRAL_HEALTH_SCORE,
};
use crate::sentiment::SentimentAnalyzer;

/// Longest body excerpt sent to an oracle when a message has no snippet
const TRANSCRIPT_EXCERPT_CHARS: usize = 300;
/// Longest evidence quote attached to a lexicon signal
const CONTEXT_QUOTE_CHARS: usize = 200;

/// What an oracle knows about the client besides the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientContext {
    /// Client id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Company name
    pub company: String,
    /// Status before this analysis
    pub status: ClientStatus,
    /// Total messages on record
    pub total_messages: i64,
    /// Typical hours to respond, if known
    pub response_time_avg: Option<f64>,
    /// Reference time for the analysis
    pub as_of: DateTime<Utc>,
    /// Types of the client's unaddressed signals
    #[serde(default)]
    pub open_signals: Vec<SignalType>,
}

impl ClientContext {
    /// Build the context for a client as of `as_of`
    #[must_use]
    pub fn from_client(client: &Client, as_of: DateTime<Utc>) -> Self {
        Self {
            id: client.id,
            name: client.name.clone(),
            company: client.company.clone(),
            status: client.status,
            total_messages: client.total_messages,
            response_time_avg: client.response_time_avg,
            as_of,
            open_signals: Vec::new(),
        }
    }

    /// Record which signal types are already open for the client
    #[must_use]
    pub fn with_open_signals(mut self, signals: &[Signal]) -> Self {
        self.open_signals.clear();
        for signal in signals {
            if !self.open_signals.contains(&signal.signal_type) {
                self.open_signals.push(signal.signal_type);
            }
        }
        self
    }

    /// Whether an unaddressed signal of this type exists
    #[must_use]
    pub fn has_open(&self, signal_type: SignalType) -> bool {
        self.open_signals.contains(&signal_type)
    }
}

/// One message as presented to an oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Channel
    pub source: MessageSource,
    /// Subject line
    pub subject: String,
    /// Body excerpt
    pub snippet: String,
    /// When it was sent
    pub timestamp: DateTime<Utc>,
    /// Direction
    pub is_from_client: bool,
    /// Already seen by an earlier analysis pass
    #[serde(default)]
    pub analyzed: bool,
}

impl From<&Message> for TranscriptEntry {
    fn from(message: &Message) -> Self {
        let snippet = if message.body_snippet.is_empty() {
            message.body.chars().take(TRANSCRIPT_EXCERPT_CHARS).collect()
        } else {
            message.body_snippet.clone()
        };

        Self {
            source: message.source,
            subject: message.subject.clone(),
            snippet,
            timestamp: message.timestamp,
            is_from_client: message.is_from_client,
            analyzed: message.analyzed,
        }
    }
}

/// A signal suggested by an oracle, not yet stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedSignal {
    /// Kind of observation
    pub signal_type: SignalType,
    /// Urgency (1-10)
    pub severity: Severity,
    /// Short title
    pub title: String,
    /// What was detected and why it matters
    pub description: String,
    /// Supporting quote
    pub context: Option<String>,
}

impl ProposedSignal {
    /// Attach the proposal to a client for storage
    #[must_use]
    pub fn into_new_signal(self, client_id: i64) -> NewSignal {
        NewSignal {
            client_id,
            message_id: None,
            signal_type: self.signal_type,
            severity: self.severity,
            title: self.title,
            description: self.description,
            context: self.context,
        }
    }
}

/// Structured oracle output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleResult {
    /// Overall client sentiment (-1.0 to 1.0)
    pub sentiment_score: f64,
    /// Advisory status
    pub client_status: ClientStatus,
    /// Advisory health score (0-100)
    pub health_score: u8,
    /// Short explanation
    pub reasoning: String,
    /// Candidate signals
    pub signals: Vec<ProposedSignal>,
}

impl OracleResult {
    /// Reasoning prefix used by [`OracleResult::fallback`]
    pub const FALLBACK_REASONING: &'static str = "Analysis failed - manual review needed";

    /// Neutral result used when the oracle fails
    #[must_use]
    pub fn fallback(reason: &str) -> Self {
        Self {
            sentiment_score: 0.0,
            client_status: ClientStatus::Unknown,
            health_score: NEUTRAL_HEALTH_SCORE,
            reasoning: format!("{}: {reason}", Self::FALLBACK_REASONING),
            signals: Vec::new(),
        }
    }
}

/// Capability that turns a transcript into sentiment and candidate signals
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Analyze a client's recent transcript
    ///
    /// # Arguments
    /// * `context` - Who the client is and how things stood before
    /// * `transcript` - Recent messages, oldest first
    async fn infer(
        &self,
        context: &ClientContext,
        transcript: &[TranscriptEntry],
    ) -> Result<OracleResult>;
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    sentiment_score: f64,
    #[serde(default)]
    client_status: Option<String>,
    #[serde(default)]
    health_score: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    signals: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawSignal {
    signal_type: String,
    #[serde(default)]
    severity: Option<f64>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    context: Option<String>,
}

#[allow(clippy::cast_possible_truncation)]
fn parse_signal(value: serde_json::Value) -> Option<ProposedSignal> {
    let raw: RawSignal = serde_json::from_value(value).ok()?;
    let signal_type = raw.signal_type.parse().ok()?;
    let title = raw.title.trim();
    if title.is_empty() {
        return None;
    }

    Some(ProposedSignal {
        signal_type,
        severity: Severity::clamped(raw.severity.unwrap_or(5.0).round() as i64),
        title: title.to_string(),
        description: raw.description.trim().to_string(),
        context: raw
            .context
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    })
}

/// Parse model text into an [`OracleResult`]
///
/// The JSON object may be surrounded by prose or code fences. Values are
/// clamped into range, signals with an unknown type or no title are dropped,
/// and an unrecognized status becomes `unknown`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_oracle_response(text: &str) -> Result<OracleResult> {
    let start = text
        .find('{')
        .ok_or_else(|| PulseError::Oracle("No JSON object in oracle response".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| PulseError::Oracle("Unterminated JSON object in oracle response".to_string()))?;

    let raw: RawResponse = serde_json::from_str(&text[start..=end])
        .map_err(|e| PulseError::Oracle(format!("Malformed oracle response: {e}")))?;

    if !raw.sentiment_score.is_finite() {
        return Err(PulseError::Oracle("Sentiment score is not a number".to_string()));
    }

    let client_status = raw
        .client_status
        .and_then(|label| label.parse().ok())
        .unwrap_or_default();
    let health_score = raw
        .health_score
        .filter(|h| h.is_finite())
        .map_or(NEUTRAL_HEALTH_SCORE, |h| h.round().clamp(0.0, 100.0) as u8);

    Ok(OracleResult {
        sentiment_score: raw.sentiment_score.clamp(-1.0, 1.0),
        client_status,
        health_score,
        reasoning: raw.reasoning.unwrap_or_default(),
        signals: raw.signals.into_iter().filter_map(parse_signal).collect(),
    })
}

// ----------------------------------------------------------------------
// Anthropic
// ----------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

/// Oracle backed by the Anthropic Messages API
pub struct AnthropicOracle {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicOracle {
    /// Create an oracle from the oracle settings
    pub fn new(settings: &OracleSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PulseError::InvalidConfig("ANTHROPIC_API_KEY not set".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_url: settings.api_url.clone(),
            api_key,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        })
    }

    async fn call_api(&self, prompt: String) -> Result<String> {
        debug!(model = %self.model, "Calling Anthropic API");

        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PulseError::Oracle(format!(
                "API request failed with status {status}: {error_text}"
            )));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| PulseError::Oracle(format!("Failed to parse response: {e}")))?;

        api_response
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| PulseError::Oracle("Empty response from API".to_string()))
    }
}

/// Build the analysis prompt for a client and its transcript
#[must_use]
pub fn build_prompt(context: &ClientContext, transcript: &[TranscriptEntry]) -> String {
    let mut history = String::new();
    for entry in transcript {
        let direction = if entry.is_from_client { "CLIENT" } else { "YOU" };
        let seen = if entry.analyzed { " (reviewed)" } else { "" };
        let _ = writeln!(
            history,
            "[{}]{seen} {direction} via {}: {}\n{}\n",
            entry.timestamp.format("%Y-%m-%d"),
            entry.source,
            entry.subject,
            entry.snippet
        );
    }

    let response_time = context
        .response_time_avg
        .map_or_else(|| "Unknown".to_string(), |h| format!("{h:.1} hours"));
    let open_signals = if context.open_signals.is_empty() {
        "None".to_string()
    } else {
        context
            .open_signals
            .iter()
            .map(SignalType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        r#"You are a relationship intelligence system analyzing client communications.

CLIENT INFORMATION:
- Name: {name}
- Company: {company}
- Current Status: {status}
- Total Messages: {total}
- Average Response Time: {response_time}
- Open Signals: {open_signals}

RECENT CONVERSATION HISTORY (last {count} messages, oldest first):
{history}
ANALYSIS TASKS:
1. Sentiment Score: overall client sentiment from -1 (very negative) to +1 (very positive).
2. Signals, each one of:
   - risk: frustration, delays, going silent, concerns about timeline/budget/quality
   - opportunity: new projects, scaling up, referrals, upsell potential
   - check_in: long silence or need for proactive outreach
   - positive: strong praise or gratitude
   - negative: direct complaints or issues raised
3. Client Status: at_risk, opportunity, healthy or unknown.
4. Health Score: 0-100.

Respond ONLY with valid JSON in this exact format:
{{
  "sentiment_score": -0.2,
  "client_status": "at_risk",
  "health_score": 65,
  "reasoning": "Brief explanation of your assessment",
  "signals": [
    {{
      "signal_type": "risk",
      "severity": 7,
      "title": "Short title",
      "description": "What you detected and why it matters",
      "context": "Quote from the messages"
    }}
  ]
}}

Only include signals with clear evidence in the messages. Severity runs from 1 (low) to 10 (critical).
Return an empty signals array when nothing stands out. Be conservative with risk signals.
Messages marked (reviewed) were covered by an earlier analysis: use them for context only and do not
repeat signals that are already open.
"#,
        name = context.name,
        company = context.company,
        status = context.status,
        total = context.total_messages,
        count = transcript.len(),
    )
}

#[async_trait]
impl Oracle for AnthropicOracle {
    async fn infer(
        &self,
        context: &ClientContext,
        transcript: &[TranscriptEntry],
    ) -> Result<OracleResult> {
        let text = self.call_api(build_prompt(context, transcript)).await?;
        parse_oracle_response(&text)
    }
}

// ----------------------------------------------------------------------
// Lexicon
// ----------------------------------------------------------------------

struct CueSet {
    signal_type: SignalType,
    title: &'static str,
    base_severity: i64,
    stems: HashSet<String>,
}

const RISK_CUES: &[&str] = &[
    "cancel", "delay", "deadline", "budget", "frustrated", "concerned", "disappointed", "unhappy",
    "competitor", "terminate", "overdue", "escalate",
];
const OPPORTUNITY_CUES: &[&str] = &[
    "expand", "expansion", "referral", "refer", "scale", "grow", "additional", "upgrade",
    "proposal",
];
const NEGATIVE_CUES: &[&str] = &[
    "complaint", "complain", "broken", "unacceptable", "wrong", "bug", "error", "refund",
];
const POSITIVE_CUES: &[&str] = &[
    "thanks", "appreciate", "great", "excellent", "love", "impressed", "amazing", "fantastic",
];

/// Offline oracle built on the local sentiment lexicon
///
/// Proposes at most one signal per type from cue words in the client's own
/// messages, plus a check-in when the conversation has gone quiet.
pub struct LexiconOracle {
    analyzer: SentimentAnalyzer,
    cue_sets: Vec<CueSet>,
    check_in_after_days: i64,
}

impl LexiconOracle {
    /// Create a lexicon oracle that suggests a check-in after `check_in_after_days` of silence
    pub fn new(check_in_after_days: i64) -> Result<Self> {
        let analyzer = SentimentAnalyzer::new()?;

        let cue_sets = [
            (SignalType::Risk, "Risk language in client messages", 6, RISK_CUES),
            (SignalType::Opportunity, "Expansion interest", 5, OPPORTUNITY_CUES),
            (SignalType::Negative, "Complaint raised", 5, NEGATIVE_CUES),
            (SignalType::Positive, "Positive feedback", 3, POSITIVE_CUES),
        ]
        .into_iter()
        .map(|(signal_type, title, base_severity, words)| CueSet {
            signal_type,
            title,
            base_severity,
            stems: words.iter().map(|word| analyzer.stem(word)).collect(),
        })
        .collect();

        Ok(Self {
            analyzer,
            cue_sets,
            check_in_after_days,
        })
    }

    fn entry_text(entry: &TranscriptEntry) -> String {
        format!("{} {}", entry.subject, entry.snippet)
    }

    fn mean_sentiment(&self, transcript: &[TranscriptEntry]) -> f64 {
        let scores: Vec<f64> = transcript
            .iter()
            .filter_map(|entry| self.analyzer.score(&Self::entry_text(entry)))
            .collect();
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }

    fn cue_signal(&self, cues: &CueSet, transcript: &[TranscriptEntry]) -> Option<ProposedSignal> {
        let mut hits = 0_i64;
        let mut matched_words = Vec::new();
        let mut latest_quote = None;

        // Reviewed messages already produced their signals
        for entry in transcript.iter().filter(|e| e.is_from_client && !e.analyzed) {
            let stems = self.analyzer.stems(&Self::entry_text(entry));
            let found: Vec<&String> = stems.iter().filter(|s| cues.stems.contains(*s)).collect();
            if found.is_empty() {
                continue;
            }
            hits += 1;
            for stem in found {
                if !matched_words.contains(stem) {
                    matched_words.push(stem.clone());
                }
            }
            latest_quote = Some(entry.snippet.chars().take(CONTEXT_QUOTE_CHARS).collect::<String>());
        }

        if hits == 0 {
            return None;
        }

        Some(ProposedSignal {
            signal_type: cues.signal_type,
            severity: Severity::clamped(cues.base_severity + hits - 1),
            title: cues.title.to_string(),
            description: format!(
                "{hits} client message(s) mention: {}",
                matched_words.join(", ")
            ),
            context: latest_quote.filter(|q| !q.is_empty()),
        })
    }

    fn check_in_signal(&self, context: &ClientContext, transcript: &[TranscriptEntry]) -> Option<ProposedSignal> {
        if context.has_open(SignalType::CheckIn) {
            return None;
        }
        let latest = transcript.iter().map(|e| e.timestamp).max()?;
        let quiet_days = (context.as_of - latest).num_days();
        if quiet_days <= self.check_in_after_days {
            return None;
        }

        Some(ProposedSignal {
            signal_type: SignalType::CheckIn,
            severity: Severity::clamped(5),
            title: "Time for a check-in".to_string(),
            description: format!("No messages exchanged in {quiet_days} days"),
            context: None,
        })
    }
}

#[async_trait]
impl Oracle for LexiconOracle {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    async fn infer(
        &self,
        context: &ClientContext,
        transcript: &[TranscriptEntry],
    ) -> Result<OracleResult> {
        let sentiment_score = self.mean_sentiment(transcript);

        let mut signals: Vec<ProposedSignal> = self
            .cue_sets
            .iter()
            .filter_map(|cues| self.cue_signal(cues, transcript))
            .collect();
        signals.extend(self.check_in_signal(context, transcript));

        let has = |t: SignalType| signals.iter().any(|s| s.signal_type == t);
        let client_status = if has(SignalType::Risk) {
            ClientStatus::AtRisk
        } else if has(SignalType::Opportunity) {
            ClientStatus::Opportunity
        } else if transcript.is_empty() {
            ClientStatus::Unknown
        } else {
            ClientStatus::Healthy
        };

        let reasoning = format!(
            "Lexicon analysis of {} messages: mean sentiment {sentiment_score:.2}, {} signal(s)",
            transcript.len(),
            signals.len()
        );

        Ok(OracleResult {
            sentiment_score,
            client_status,
            health_score: ((sentiment_score + 1.0) * 50.0).round().clamp(0.0, 100.0) as u8,
            reasoning,
            signals,
        })
    }
}
