//! Tests for the status decision table

mod common;

use client_pulse::classifier::{classify, classify_with_rule, StatusRule};
use client_pulse::models::{ClientStatus, SignalType};
use common::signal;

#[test]
fn test_low_score_is_at_risk() {
    assert_eq!(classify(35, &[]), ClientStatus::AtRisk);
    assert_eq!(classify(0, &[]), ClientStatus::AtRisk);
    assert_eq!(classify(39, &[]), ClientStatus::AtRisk);
}

#[test]
fn test_threshold_40_is_not_at_risk() {
    assert_eq!(classify(40, &[]), ClientStatus::Healthy);
}

#[test]
fn test_opportunity_with_good_score() {
    let signals = vec![signal(1, 1, SignalType::Opportunity, 6)];
    assert_eq!(classify(65, &signals), ClientStatus::Opportunity);
    assert_eq!(classify(60, &signals), ClientStatus::Opportunity);
    assert_eq!(classify(95, &signals), ClientStatus::Opportunity);
}

#[test]
fn test_opportunity_below_60_falls_through() {
    let signals = vec![signal(1, 1, SignalType::Opportunity, 6)];
    let (status, rule) = classify_with_rule(59, &signals);
    assert_eq!(status, ClientStatus::Healthy);
    assert_eq!(rule, StatusRule::MidRangeDefault);
}

#[test]
fn test_high_score_is_healthy() {
    let (status, rule) = classify_with_rule(80, &[]);
    assert_eq!(status, ClientStatus::Healthy);
    assert_eq!(rule, StatusRule::HighScore);
}

#[test]
fn test_severe_risk_overrides_high_score() {
    let signals = vec![signal(1, 1, SignalType::Risk, 9)];
    let (status, rule) = classify_with_rule(90, &signals);
    assert_eq!(status, ClientStatus::AtRisk);
    assert_eq!(rule, StatusRule::SevereRiskOrLowScore);
}

#[test]
fn test_escalation_starts_at_severity_7() {
    assert_eq!(
        classify(90, &[signal(1, 1, SignalType::Risk, 7)]),
        ClientStatus::AtRisk
    );
    assert_eq!(
        classify(90, &[signal(1, 1, SignalType::Risk, 6)]),
        ClientStatus::Healthy
    );
}

#[test]
fn test_severe_risk_beats_opportunity() {
    let signals = vec![
        signal(1, 1, SignalType::Opportunity, 10),
        signal(2, 1, SignalType::Risk, 8),
    ];
    assert_eq!(classify(85, &signals), ClientStatus::AtRisk);
}

#[test]
fn test_addressed_signals_are_ignored() {
    let mut risk = signal(1, 1, SignalType::Risk, 10);
    risk.addressed = true;
    let mut opportunity = signal(2, 1, SignalType::Opportunity, 10);
    opportunity.addressed = true;

    assert_eq!(classify(90, &[risk]), ClientStatus::Healthy);
    assert_eq!(classify(65, &[opportunity]), ClientStatus::Healthy);
}

#[test]
fn test_other_signal_types_do_not_affect_status() {
    let signals = vec![
        signal(1, 1, SignalType::Negative, 10),
        signal(2, 1, SignalType::CheckIn, 10),
        signal(3, 1, SignalType::Positive, 10),
    ];
    assert_eq!(classify(65, &signals), ClientStatus::Healthy);
}

#[test]
fn test_unknown_is_never_produced() {
    let signals = vec![signal(1, 1, SignalType::Opportunity, 5)];
    for score in 0..=100u8 {
        assert_ne!(classify(score, &[]), ClientStatus::Unknown);
        assert_ne!(classify(score, &signals), ClientStatus::Unknown);
    }
}
