//! Response-time estimation from message exchange pairs
//!
//! A response is observed whenever a client message is immediately followed
//! by an operator message. The estimate is the median of those gaps, so a
//! single slow reply (a vacation, a holiday weekend) does not drag it.

use crate::models::Message;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Typical hours taken to answer the client
///
/// # Arguments
/// * `messages` - The client's messages in chronological order
///
/// # Returns
/// The median reply gap in hours, or `None` when no client message was
/// directly followed by an operator reply.
#[must_use]
pub fn estimate_response_time(messages: &[Message]) -> Option<f64> {
    let gaps: Vec<f64> = messages
        .windows(2)
        .filter(|pair| pair[0].is_from_client && !pair[1].is_from_client)
        .map(|pair| {
            let elapsed = pair[1].timestamp - pair[0].timestamp;
            elapsed.num_milliseconds() as f64 / 1000.0 / SECONDS_PER_HOUR
        })
        .collect();

    median(gaps)
}

/// Median of a sample; the two middle values are averaged for even lengths
fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;

    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(vec![]), None);
        assert_eq!(median(vec![5.0]), Some(5.0));
        assert_eq!(median(vec![9.0, 1.0, 4.0]), Some(4.0));
        assert_eq!(median(vec![10.0, 2.0]), Some(6.0));
        assert_eq!(median(vec![1.0, 2.0, 3.0, 400.0]), Some(2.5));
    }
}
