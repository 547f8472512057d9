//! Health scoring
//!
//! Starts from a neutral 50 and adds one adjustment per factor. The result
//! is rounded and clamped to 0..=100.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::classify;
use crate::factors::{extract_health_factors, HealthFactors};
use crate::models::{Client, ClientStatus, Message, Signal};

const BASELINE: f64 = 50.0;
const RISK_PENALTY: f64 = 10.0;
const OPPORTUNITY_BONUS: f64 = 5.0;
const OPPORTUNITY_CAP: f64 = 15.0;

/// Score and status computed for one client
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Health score (0-100)
    pub health_score: u8,
    /// Status derived from the score and signals
    pub status: ClientStatus,
    /// Factors the score was computed from
    pub factors: HealthFactors,
}

fn recency_adjustment(days: i64) -> f64 {
    match days {
        ..=7 => 30.0,
        8..=30 => 20.0,
        31..=90 => 10.0,
        // 91-180 days is a neutral band
        91..=180 => 0.0,
        _ => -20.0,
    }
}

fn sentiment_adjustment(sentiment: f64) -> f64 {
    sentiment * 20.0
}

fn response_time_adjustment(hours: Option<f64>) -> f64 {
    match hours {
        Some(h) if h < 4.0 => 10.0,
        Some(h) if h < 24.0 => 5.0,
        Some(h) if h > 72.0 => -15.0,
        // Unset, or the neutral 24-72h band
        _ => 0.0,
    }
}

fn risk_adjustment(risk_count: usize) -> f64 {
    -(risk_count as f64) * RISK_PENALTY
}

fn opportunity_adjustment(opportunity_count: usize) -> f64 {
    (opportunity_count as f64 * OPPORTUNITY_BONUS).min(OPPORTUNITY_CAP)
}

fn frequency_adjustment(per_month: f64) -> f64 {
    if per_month > 4.0 {
        10.0
    } else if per_month < 1.0 {
        -10.0
    } else {
        0.0
    }
}

/// Compute the health score for a set of factors
///
/// Always returns a value in 0..=100, however extreme the factors.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn calculate_health_score(factors: &HealthFactors) -> u8 {
    let score = BASELINE
        + recency_adjustment(factors.recency)
        + sentiment_adjustment(factors.sentiment)
        + response_time_adjustment(factors.response_time)
        + risk_adjustment(factors.risk_count)
        + opportunity_adjustment(factors.opportunity_count)
        + frequency_adjustment(factors.frequency);

    // NaN saturates to 0 in the cast
    score.round().clamp(0.0, 100.0) as u8
}

/// Score and classify a client from its recent messages and unaddressed signals
///
/// Pure: the same snapshot and `now` always give the same assessment.
#[must_use]
pub fn score_and_classify(
    client: &Client,
    messages: &[Message],
    signals: &[Signal],
    now: DateTime<Utc>,
) -> Assessment {
    let factors = extract_health_factors(client, messages, signals, now);
    let health_score = calculate_health_score(&factors);
    let status = classify(health_score, signals);

    Assessment {
        health_score,
        status,
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_bands_do_not_move_the_score() {
        assert_eq!(recency_adjustment(91), 0.0);
        assert_eq!(recency_adjustment(180), 0.0);
        assert_eq!(recency_adjustment(181), -20.0);
        assert_eq!(response_time_adjustment(Some(24.0)), 0.0);
        assert_eq!(response_time_adjustment(Some(72.0)), 0.0);
        assert_eq!(response_time_adjustment(None), 0.0);
    }

    #[test]
    fn test_opportunity_bonus_is_capped() {
        assert_eq!(opportunity_adjustment(2), 10.0);
        assert_eq!(opportunity_adjustment(3), 15.0);
        assert_eq!(opportunity_adjustment(40), 15.0);
    }
}
