//! Local lexicon-based sentiment analysis
//!
//! Used to score messages at ingestion time and by the offline oracle.
//! Words are matched on their English stems, so "frustrated" and
//! "frustrating" share one lexicon entry.

use std::collections::HashMap;

use anyhow::Result;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

const POSITIVE_WORDS: &[(&str, f64)] = &[
    ("good", 1.0),
    ("great", 1.5),
    ("excellent", 2.0),
    ("amazing", 2.0),
    ("wonderful", 1.8),
    ("fantastic", 1.8),
    ("happy", 1.2),
    ("love", 2.0),
    ("pleased", 1.2),
    ("satisfied", 1.0),
    ("excited", 1.5),
    ("thrilled", 1.8),
    ("grateful", 1.5),
    ("appreciate", 1.2),
    ("thanks", 0.8),
    ("perfect", 2.0),
    ("impressed", 1.5),
    ("helpful", 1.2),
    ("smooth", 1.0),
    ("success", 1.5),
    ("recommend", 1.5),
];

const NEGATIVE_WORDS: &[(&str, f64)] = &[
    ("bad", -1.0),
    ("terrible", -2.0),
    ("awful", -2.0),
    ("horrible", -2.0),
    ("worst", -2.0),
    ("hate", -2.0),
    ("poor", -1.2),
    ("disappointed", -1.5),
    ("unhappy", -1.5),
    ("angry", -1.5),
    ("upset", -1.2),
    ("frustrated", -1.5),
    ("annoyed", -1.2),
    ("worried", -1.2),
    ("concerned", -1.0),
    ("confused", -0.8),
    ("delay", -1.0),
    ("late", -0.8),
    ("problem", -1.0),
    ("issue", -0.8),
    ("broken", -1.5),
    ("unacceptable", -2.0),
    ("cancel", -1.5),
    ("refund", -1.2),
    ("useless", -1.5),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.5),
    ("extremely", 2.0),
    ("incredibly", 2.0),
    ("absolutely", 2.0),
    ("completely", 1.8),
    ("totally", 1.8),
    ("really", 1.3),
    ("so", 1.2),
    ("quite", 1.2),
    ("somewhat", 0.8),
    ("slightly", 0.7),
    ("barely", 0.5),
];

// Apostrophes are stripped during cleaning, so "don't" arrives as "don t"
const NEGATIONS: &[&str] = &[
    "not", "no", "never", "nothing", "neither", "nor", "cannot", "don", "didn", "doesn", "isn",
    "wasn", "won",
];

/// Lexicon sentiment scorer with text cleaning and stemming
pub struct SentimentAnalyzer {
    url_regex: Regex,
    emoji_regex: Regex,
    special_chars_regex: Regex,
    extra_spaces_regex: Regex,
    stemmer: Stemmer,
    lexicon: HashMap<String, f64>,
}

impl SentimentAnalyzer {
    /// Create an analyzer with the built-in English lexicon
    pub fn new() -> Result<Self> {
        let url_regex = Regex::new(r"https?://\S+|www\.\S+")
            .map_err(|e| anyhow::anyhow!("Failed to compile URL regex: {e}"))?;
        let emoji_regex = Regex::new(r"\p{Extended_Pictographic}")
            .map_err(|e| anyhow::anyhow!("Failed to compile emoji regex: {e}"))?;
        let special_chars_regex = Regex::new(r"[^\w\s]")
            .map_err(|e| anyhow::anyhow!("Failed to compile special chars regex: {e}"))?;
        let extra_spaces_regex = Regex::new(r"\s+")
            .map_err(|e| anyhow::anyhow!("Failed to compile spaces regex: {e}"))?;

        let stemmer = Stemmer::create(Algorithm::English);

        let lexicon = POSITIVE_WORDS
            .iter()
            .chain(NEGATIVE_WORDS)
            .map(|(word, weight)| (stemmer.stem(word).into_owned(), *weight))
            .collect();

        Ok(Self {
            url_regex,
            emoji_regex,
            special_chars_regex,
            extra_spaces_regex,
            stemmer,
            lexicon,
        })
    }

    /// Clean the text by removing URLs, emojis, and normalizing whitespace
    #[must_use]
    pub fn clean_text(&self, text: &str) -> String {
        let normalized = text.nfc().collect::<String>();
        let no_urls = self.url_regex.replace_all(&normalized, " ");
        let no_emojis = self.emoji_regex.replace_all(&no_urls, " ");
        let no_special = self.special_chars_regex.replace_all(&no_emojis, " ");
        let normalized_spaces = self.extra_spaces_regex.replace_all(&no_special, " ");

        normalized_spaces.trim().to_lowercase()
    }

    /// Stem a single word
    #[must_use]
    pub fn stem(&self, word: &str) -> String {
        self.stemmer.stem(word).into_owned()
    }

    /// Clean a text and stem every word in it
    #[must_use]
    pub fn stems(&self, text: &str) -> Vec<String> {
        self.clean_text(text)
            .split_whitespace()
            .map(|word| self.stem(word))
            .collect()
    }

    /// Score the sentiment of a text
    ///
    /// # Returns
    /// `None` for text with no words, otherwise the mean weight of the
    /// sentiment-bearing words clamped to -1.0..=1.0 (0.0 when there are none)
    #[must_use]
    pub fn score(&self, text: &str) -> Option<f64> {
        let cleaned = self.clean_text(text);
        let words: Vec<&str> = cleaned.split_whitespace().collect();
        if words.is_empty() {
            return None;
        }

        let mut total = 0.0;
        let mut hits = 0_u32;

        for (i, word) in words.iter().enumerate() {
            let Some(weight) = self.lexicon.get(&self.stem(word)) else {
                continue;
            };
            let mut sentiment = *weight;

            if i > 0 {
                if let Some((_, intensity)) = INTENSIFIERS.iter().find(|(w, _)| *w == words[i - 1]) {
                    sentiment *= intensity;
                }
            }

            let negated = words[i.saturating_sub(2)..i]
                .iter()
                .any(|prev| NEGATIONS.contains(prev));
            if negated {
                // Flip and soften
                sentiment = -sentiment * 0.8;
            }

            total += sentiment;
            hits += 1;
        }

        if hits == 0 {
            return Some(0.0);
        }
        Some((total / f64::from(hits)).clamp(-1.0, 1.0))
    }
}
