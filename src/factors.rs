//! Health factor extraction
//!
//! Reduces a client, its recent message window and its signals to the six
//! numbers the scoring function works from. Everything here is a pure
//! function of its arguments; the caller supplies `now`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Client, Message, Signal, SignalType};

/// Recency assigned to a client with no recorded contact
pub const NEVER_CONTACTED_DAYS: i64 = 999;

/// Look-back window for the frequency factor
pub const FREQUENCY_WINDOW_DAYS: i64 = 90;

/// Inputs to the health score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthFactors {
    /// Whole days since last contact
    pub recency: i64,
    /// Messages per 30 days over the last 90 days
    pub frequency: f64,
    /// Mean message sentiment in the window (0 when none is scored)
    pub sentiment: f64,
    /// Stored typical hours to respond
    pub response_time: Option<f64>,
    /// Unaddressed risk signals
    pub risk_count: usize,
    /// Unaddressed opportunity signals
    pub opportunity_count: usize,
}

/// Extract the scoring factors for one client
///
/// # Arguments
/// * `client` - The client record (last contact date, stored response time)
/// * `messages` - The client's recent message window
/// * `signals` - The client's signals; addressed ones are ignored
/// * `now` - Reference time for recency and frequency
#[must_use]
pub fn extract_health_factors(
    client: &Client,
    messages: &[Message],
    signals: &[Signal],
    now: DateTime<Utc>,
) -> HealthFactors {
    HealthFactors {
        recency: recency_days(client.last_contact_date, now),
        frequency: monthly_frequency(messages, now),
        sentiment: mean_sentiment(messages),
        response_time: client.response_time_avg,
        risk_count: count_open(signals, SignalType::Risk),
        opportunity_count: count_open(signals, SignalType::Opportunity),
    }
}

fn recency_days(last_contact: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    last_contact.map_or(NEVER_CONTACTED_DAYS, |last| (now - last).num_days())
}

fn monthly_frequency(messages: &[Message], now: DateTime<Utc>) -> f64 {
    let cutoff = now - Duration::days(FREQUENCY_WINDOW_DAYS);
    let recent = messages.iter().filter(|m| m.timestamp > cutoff).count();
    recent as f64 / FREQUENCY_WINDOW_DAYS as f64 * 30.0
}

fn mean_sentiment(messages: &[Message]) -> f64 {
    let scores: Vec<f64> = messages.iter().filter_map(|m| m.sentiment_score).collect();
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

fn count_open(signals: &[Signal], signal_type: SignalType) -> usize {
    signals.iter().filter(|s| s.is_open(signal_type)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recency_sentinel_and_floor() {
        let now = Utc::now();
        assert_eq!(recency_days(None, now), NEVER_CONTACTED_DAYS);
        assert_eq!(recency_days(Some(now - Duration::hours(47)), now), 1);
        assert_eq!(recency_days(Some(now - Duration::days(200)), now), 200);
    }
}
