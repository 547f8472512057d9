//! Tests for response-time estimation

mod common;

use client_pulse::response_time::estimate_response_time;
use common::{hours_ago, message};

#[test]
fn test_median_of_two_turns() {
    let messages = vec![
        message(1, 1, true, hours_ago(30)),
        message(2, 1, false, hours_ago(28)),
        message(3, 1, true, hours_ago(20)),
        message(4, 1, false, hours_ago(10)),
    ];
    assert_eq!(estimate_response_time(&messages), Some(6.0));
}

#[test]
fn test_odd_number_of_turns_takes_middle() {
    let messages = vec![
        message(1, 1, true, hours_ago(100)),
        message(2, 1, false, hours_ago(99)),
        message(3, 1, true, hours_ago(80)),
        message(4, 1, false, hours_ago(50)),
        message(5, 1, true, hours_ago(40)),
        message(6, 1, false, hours_ago(36)),
    ];
    // Turns of 1h, 30h and 4h
    assert_eq!(estimate_response_time(&messages), Some(4.0));
}

#[test]
fn test_only_client_to_operator_pairs_count() {
    let messages = vec![
        message(1, 1, false, hours_ago(50)),
        message(2, 1, true, hours_ago(40)),
        message(3, 1, true, hours_ago(30)),
        message(4, 1, false, hours_ago(27)),
        message(5, 1, false, hours_ago(1)),
    ];
    assert_eq!(estimate_response_time(&messages), Some(3.0));
}

#[test]
fn test_no_messages() {
    assert_eq!(estimate_response_time(&[]), None);
}

#[test]
fn test_single_message() {
    assert_eq!(estimate_response_time(&[message(1, 1, true, hours_ago(5))]), None);
}

#[test]
fn test_one_sided_conversation() {
    let from_client = vec![
        message(1, 1, true, hours_ago(5)),
        message(2, 1, true, hours_ago(3)),
    ];
    let from_operator = vec![
        message(1, 1, false, hours_ago(5)),
        message(2, 1, false, hours_ago(3)),
    ];
    assert_eq!(estimate_response_time(&from_client), None);
    assert_eq!(estimate_response_time(&from_operator), None);
}

#[test]
fn test_fractional_hours() {
    let messages = vec![
        message(1, 1, true, hours_ago(2)),
        message(2, 1, false, hours_ago(2) + chrono::Duration::minutes(90)),
    ];
    assert_eq!(estimate_response_time(&messages), Some(1.5));
}
