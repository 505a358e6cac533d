// src/analyze/sentiment.rs
//! Sentiment scoring for company mentions.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;

use crate::analyze::entities::EntityMention;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

pub const EMOJI_THUMBS_UP: &str = "\u{1f44d}";
pub const EMOJI_THUMBS_DOWN: &str = "\u{1f44e}";
pub const EMOJI_SHRUG: &str = "¯\\_(\u{30c4})_/¯";

/// Raw lexicon score that maps to full +/-1.0.
const SATURATION: f32 = 4.0;

/// Result fields in output order.
pub const SENTIMENT_FIELDS: [&str; 2] = ["sentiment", "opinion"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentResult {
    pub sentiment: String,
    pub opinion: String,
}

impl SentimentResult {
    pub fn new(sentiment: impl Into<String>, opinion: impl Into<String>) -> Self {
        Self {
            sentiment: sentiment.into(),
            opinion: opinion.into(),
        }
    }

    /// Values in [`SENTIMENT_FIELDS`] order.
    pub fn values(&self) -> [&str; 2] {
        [&self.sentiment, &self.opinion]
    }
}

#[async_trait]
pub trait SentimentEngine: Send + Sync {
    /// One call per event with all of its mentions. Must return an entry for
    /// every symbol in `mentions`.
    async fn analyze(&self, mentions: &[EntityMention]) -> Result<HashMap<String, SentimentResult>>;
}

pub fn sentiment_emoji(score: f32) -> &'static str {
    if score > 0.0 {
        EMOJI_THUMBS_UP
    } else if score < 0.0 {
        EMOJI_THUMBS_DOWN
    } else {
        EMOJI_SHRUG
    }
}

/// "Tesla Inc. 👍 TSLA"
pub fn compile_opinion(name: &str, symbol: &str, score: f32) -> String {
    format!("{name} {} {symbol}", sentiment_emoji(score))
}

/// Lexicon scorer with a short negation window.
#[derive(Debug, Clone, Default)]
pub struct LexiconSentimentEngine;

impl LexiconSentimentEngine {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    /// Returns (raw score, token count).
    /// A negator within the previous 1..=3 tokens flips a word's sign.
    pub fn score_text(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;

        for i in 0..tokens.len() {
            let base = self.word_score(tokens[i].as_str());
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }

        (score, tokens.len())
    }

    /// Score in [-1.0, 1.0].
    pub fn normalized(&self, text: &str) -> f32 {
        let (raw, _) = self.score_text(text);
        (raw as f32 / SATURATION).clamp(-1.0, 1.0)
    }
}

#[async_trait]
impl SentimentEngine for LexiconSentimentEngine {
    async fn analyze(&self, mentions: &[EntityMention]) -> Result<HashMap<String, SentimentResult>> {
        let mut out = HashMap::with_capacity(mentions.len());
        for m in mentions {
            let score = self.normalized(&m.excerpt);
            let opinion = compile_opinion(&m.name, &m.symbol, score);
            tracing::info!(target: "pipeline", symbol = %m.symbol, score, %opinion, "sentiment");
            out.insert(m.symbol.clone(), SentimentResult::new(format!("{score:.2}"), opinion));
        }
        Ok(out)
    }
}

/// Alphanumeric tokens, lower-case.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
}

fn is_negator(tok: &str) -> bool {
    // Apostrophes split words, so "isn't" arrives as "isn" + "t".
    matches!(
        tok,
        "not" | "no" | "never" | "isn" | "wasn" | "aren" | "won" | "cannot" | "without" | "hardly"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexicon_scores_and_negation() {
        let e = LexiconSentimentEngine::new();
        let (pos, n) = e.score_text("Tesla surges on record profit");
        assert!(pos > 0);
        assert_eq!(n, 5);
        let (neg, _) = e.score_text("Tesla did not surge");
        assert!(neg < 0);
    }

    #[test]
    fn normalized_is_clamped() {
        let e = LexiconSentimentEngine::new();
        let s = e.normalized("great great great great great great amazing");
        assert_eq!(s, 1.0);
        assert_eq!(e.normalized("the a of"), 0.0);
    }

    #[test]
    fn opinion_text_uses_emoji() {
        assert_eq!(compile_opinion("Tesla Inc.", "TSLA", 0.5), "Tesla Inc. \u{1f44d} TSLA");
        assert_eq!(compile_opinion("Tesla Inc.", "TSLA", -0.1), "Tesla Inc. \u{1f44e} TSLA");
        assert!(compile_opinion("X", "X", 0.0).contains(EMOJI_SHRUG));
    }

    #[tokio::test]
    async fn engine_returns_entry_per_symbol() {
        let e = LexiconSentimentEngine::new();
        let ms = vec![
            EntityMention {
                symbol: "TSLA".into(),
                name: "Tesla Inc.".into(),
                excerpt: "Tesla and Apple crash".into(),
                url: String::new(),
            },
            EntityMention {
                symbol: "AAPL".into(),
                name: "Apple Inc.".into(),
                excerpt: "Tesla and Apple crash".into(),
                url: String::new(),
            },
        ];
        let out = e.analyze(&ms).await.unwrap();
        assert_eq!(out.len(), 2);
        assert!(out["AAPL"].sentiment.starts_with('-'));
        assert!(out["TSLA"].opinion.ends_with("TSLA"));
    }
}
