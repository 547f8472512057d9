use client_pulse::sentiment::SentimentAnalyzer;

fn analyzer() -> SentimentAnalyzer {
    SentimentAnalyzer::new().expect("Failed to build analyzer")
}

#[test]
fn test_empty_text_has_no_score() {
    assert_eq!(analyzer().score(""), None);
    assert_eq!(analyzer().score("   https://example.com  "), None);
}

#[test]
fn test_neutral_text_scores_zero() {
    assert_eq!(analyzer().score("Meeting moved to Tuesday"), Some(0.0));
}

#[test]
fn test_positive_and_negative_text() {
    let a = analyzer();
    assert!(a.score("Excellent work, we love it").unwrap() > 0.0);
    assert!(a.score("This is terrible and we are frustrated").unwrap() < 0.0);
}

#[test]
fn test_negation_flips_polarity() {
    let a = analyzer();
    assert!(a.score("We are happy").unwrap() > 0.0);
    assert!(a.score("We are not happy").unwrap() < 0.0);
}

#[test]
fn test_intensifiers_scale_weight() {
    let a = analyzer();
    assert!(a.score("very confused").unwrap() < a.score("confused").unwrap());
    assert!(a.score("slightly good").unwrap() < a.score("good").unwrap());
}

#[test]
fn test_scores_are_bounded() {
    let a = analyzer();
    let text = "extremely excellent absolutely amazing incredibly perfect";
    let score = a.score(text).unwrap();
    assert!((-1.0..=1.0).contains(&score));
}

#[test]
fn test_stems_share_lexicon_entries() {
    let a = analyzer();
    assert_eq!(a.stem("delays"), a.stem("delay"));
    assert!(a.score("Delays again").unwrap() < 0.0);
}
