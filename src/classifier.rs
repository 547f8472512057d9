//! Status classification
//!
//! The classifier is an ordered decision table: each rule pairs a guard over
//! `(health_score, signals)` with the status it yields, and the first guard
//! that holds wins. `ClientStatus::Unknown` is never produced here; it only
//! exists as the state of a client that has not been analyzed yet.

use serde::{Deserialize, Serialize};

use crate::models::{ClientStatus, Signal, SignalType};

/// Risk severity at or above which a single risk signal escalates a client
pub const ESCALATION_SEVERITY: u8 = 7;
/// Scores below this are at risk
pub const AT_RISK_BELOW: u8 = 40;
/// Minimum score for an open opportunity to count
pub const OPPORTUNITY_MIN_SCORE: u8 = 60;
/// Minimum score to be healthy on score alone
pub const HEALTHY_MIN_SCORE: u8 = 70;

/// Identifies which row of the decision table fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusRule {
    /// Severe open risk, or score below the at-risk threshold
    SevereRiskOrLowScore,
    /// Open opportunity with a good enough score
    OpportunityWithGoodScore,
    /// High score
    HighScore,
    /// Low score, checked a second time
    LowScoreSafetyNet,
    /// Everything else
    MidRangeDefault,
}

struct Rule {
    tag: StatusRule,
    guard: fn(u8, &[Signal]) -> bool,
    status: ClientStatus,
}

const RULES: [Rule; 5] = [
    Rule {
        tag: StatusRule::SevereRiskOrLowScore,
        guard: severe_risk_or_low_score,
        status: ClientStatus::AtRisk,
    },
    Rule {
        tag: StatusRule::OpportunityWithGoodScore,
        guard: opportunity_with_good_score,
        status: ClientStatus::Opportunity,
    },
    Rule {
        tag: StatusRule::HighScore,
        guard: high_score,
        status: ClientStatus::Healthy,
    },
    // Redundant with the first row (same threshold) and unreachable while that
    // row precedes it. Intentionally kept as its own row.
    Rule {
        tag: StatusRule::LowScoreSafetyNet,
        guard: low_score,
        status: ClientStatus::AtRisk,
    },
    Rule {
        tag: StatusRule::MidRangeDefault,
        guard: always,
        status: ClientStatus::Healthy,
    },
];

fn severe_risk_or_low_score(score: u8, signals: &[Signal]) -> bool {
    has_severe_risk(signals) || score < AT_RISK_BELOW
}

fn opportunity_with_good_score(score: u8, signals: &[Signal]) -> bool {
    has_open_opportunity(signals) && score >= OPPORTUNITY_MIN_SCORE
}

const fn high_score(score: u8, _: &[Signal]) -> bool {
    score >= HEALTHY_MIN_SCORE
}

const fn low_score(score: u8, _: &[Signal]) -> bool {
    score < AT_RISK_BELOW
}

const fn always(_: u8, _: &[Signal]) -> bool {
    true
}

fn has_severe_risk(signals: &[Signal]) -> bool {
    signals
        .iter()
        .any(|s| s.is_open(SignalType::Risk) && s.severity.get() >= ESCALATION_SEVERITY)
}

fn has_open_opportunity(signals: &[Signal]) -> bool {
    signals.iter().any(|s| s.is_open(SignalType::Opportunity))
}

/// Classify a client and report which rule decided it
#[must_use]
pub fn classify_with_rule(health_score: u8, signals: &[Signal]) -> (ClientStatus, StatusRule) {
    RULES
        .iter()
        .find(|rule| (rule.guard)(health_score, signals))
        .map_or(
            (ClientStatus::Healthy, StatusRule::MidRangeDefault),
            |rule| (rule.status, rule.tag),
        )
}

/// Classify a client from its health score and unaddressed signals
///
/// Addressed signals in `signals` are ignored.
#[must_use]
pub fn classify(health_score: u8, signals: &[Signal]) -> ClientStatus {
    classify_with_rule(health_score, signals).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_net_is_shadowed_for_every_score() {
        for score in 0..=100 {
            let (_, rule) = classify_with_rule(score, &[]);
            assert_ne!(rule, StatusRule::LowScoreSafetyNet);
        }
    }

    #[test]
    fn test_mid_range_defaults_to_healthy() {
        assert_eq!(
            classify_with_rule(55, &[]),
            (ClientStatus::Healthy, StatusRule::MidRangeDefault)
        );
        assert_eq!(
            classify_with_rule(39, &[]),
            (ClientStatus::AtRisk, StatusRule::SevereRiskOrLowScore)
        );
    }
}
