// src/analyze/mod.rs
//! Per-event analysis pipeline.
//!
//! Order, each step a possible early exit:
//! 1) strip the filter punctuation set and tokenize
//! 2) required-keyword gate
//! 3) ignored-keyword veto
//! 4) strip hashtags / mentions from the display text
//! 5) company extraction (no mentions -> skip)
//! 6) one sentiment call for all mentions
//! 7) header once + one CSV row per mention, in extraction order
//!
//! Filtering runs on the original text, so `#TSLA` still counts as `TSLA`.

pub mod entities;
pub mod filter;
pub mod sentiment;
pub mod tokenize;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::ingest::types::{Event, EventHandler};
use crate::sink::CsvSink;

// Re-export convenient types.
pub use crate::analyze::entities::{CompanyDirectory, EntityExtractor, EntityMention, FixedSymbolExtractor};
pub use crate::analyze::filter::{FilterVerdict, KeywordFilterSet};
pub use crate::analyze::sentiment::{LexiconSentimentEngine, SentimentEngine, SentimentResult};
pub use crate::analyze::tokenize::{strip_filter_symbols, Tokenizer, WordTokenizer};

/// Excerpt column label for streamed posts.
pub const EXCERPT_TWEET: &str = "tweet";
/// Excerpt column label for polled headlines.
pub const EXCERPT_HEADLINE: &str = "headline";

static HASHTAG_OR_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[#|@]\S+").expect("hashtag regex"));

/// Remove `#tag` / `@user` runs from display text.
pub fn strip_hashtags(text: &str) -> String {
    HASHTAG_OR_MENTION.replace_all(text, "").trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingRequired,
    Ignored,
    NoKnownEntity,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingRequired => "missing_required",
            SkipReason::Ignored => "ignored",
            SkipReason::NoKnownEntity => "no_known_entity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    /// Number of rows appended.
    Written(usize),
}

type Row = [String; 6];

enum Prepared {
    Skip(SkipReason),
    Rows(Vec<Row>),
}

pub struct AnalysisPipeline {
    tokenizer: Box<dyn Tokenizer>,
    filters: KeywordFilterSet,
    extractor: Arc<dyn EntityExtractor>,
    engine: Arc<dyn SentimentEngine>,
    sink: Arc<CsvSink>,
    excerpt_label: &'static str,
}

impl AnalysisPipeline {
    pub fn new(
        filters: KeywordFilterSet,
        extractor: Arc<dyn EntityExtractor>,
        engine: Arc<dyn SentimentEngine>,
        sink: Arc<CsvSink>,
    ) -> Self {
        Self {
            tokenizer: Box::new(WordTokenizer::new()),
            filters,
            extractor,
            engine,
            sink,
            excerpt_label: EXCERPT_TWEET,
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Name of the excerpt column (`tweet` or `headline`).
    pub fn with_excerpt_label(mut self, label: &'static str) -> Self {
        self.excerpt_label = label;
        self
    }

    /// CSV header, in row order.
    pub fn fields(&self) -> [&'static str; 6] {
        ["symbol", "name", "sentiment", "opinion", self.excerpt_label, "url"]
    }

    pub fn sink(&self) -> &CsvSink {
        &self.sink
    }

    /// Steps 1–6: everything up to (not including) the write.
    async fn prepare(&self, mut event: Event) -> Result<Prepared> {
        let tokens = self.tokenizer.tokenize(&strip_filter_symbols(&event.text));
        debug!(target: "pipeline", ?tokens, "tokens");

        match self.filters.check(&tokens) {
            FilterVerdict::Pass => {}
            FilterVerdict::MissingRequired => return Ok(Prepared::Skip(SkipReason::MissingRequired)),
            FilterVerdict::Ignored => return Ok(Prepared::Skip(SkipReason::Ignored)),
        }

        event.text = strip_hashtags(&event.text);
        debug!(target: "pipeline", text = %event.text, "stripped hashtags");

        let mentions = self.extractor.find(&event).await?;
        if mentions.is_empty() {
            return Ok(Prepared::Skip(SkipReason::NoKnownEntity));
        }

        let results = self.engine.analyze(&mentions).await?;

        let mut rows = Vec::with_capacity(mentions.len());
        for m in mentions {
            let r = results
                .get(&m.symbol)
                .ok_or_else(|| anyhow!("sentiment engine returned nothing for {}", m.symbol))?;
            let [sentiment, opinion] = r.values();
            rows.push([
                m.symbol,
                m.name,
                sentiment.to_string(),
                opinion.to_string(),
                m.excerpt,
                m.url,
            ]);
        }
        Ok(Prepared::Rows(rows))
    }

    fn persist(&self, rows: &[Row]) -> Result<usize> {
        let write = || -> Result<usize> {
            self.sink.write_header_once(&self.fields())?;
            for row in rows {
                self.sink.write_row(row)?;
                info!(target: "pipeline", row = %row.join(","), "row");
            }
            Ok(rows.len())
        };
        write().inspect_err(|e| {
            error!(target: "sink", path = %self.sink.path().display(), error = ?e, "writing results failed");
        })
    }

    /// Run one event through the pipeline.
    pub async fn process(&self, event: Event) -> Result<Outcome> {
        counter!("pipeline_events_total").increment(1);
        match self.prepare(event).await? {
            Prepared::Skip(reason) => {
                counter!("pipeline_skipped_total", "reason" => reason.as_str()).increment(1);
                Ok(Outcome::Skipped(reason))
            }
            Prepared::Rows(rows) => {
                let n = self.persist(&rows)?;
                counter!("pipeline_rows_written_total").increment(n as u64);
                Ok(Outcome::Written(n))
            }
        }
    }
}

#[async_trait]
impl EventHandler for AnalysisPipeline {
    async fn handle(&self, event: Event) {
        let url = event.url.clone();
        match self.process(event).await {
            Ok(Outcome::Skipped(SkipReason::NoKnownEntity)) => {
                info!(target: "pipeline", ?url, "no mention of any known publicly traded company");
            }
            Ok(Outcome::Skipped(reason)) => {
                info!(target: "pipeline", ?url, reason = reason.as_str(), "event skipped by keyword filter");
            }
            Ok(Outcome::Written(rows)) => {
                info!(target: "pipeline", ?url, rows, path = %self.sink.path().display(), "results written");
            }
            Err(e) => {
                counter!("pipeline_errors_total").increment(1);
                warn!(target: "pipeline", ?url, error = ?e, "event dropped");
            }
        }
    }
}
