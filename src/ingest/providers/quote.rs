// src/ingest/providers/quote.rs
//! One-shot price lookup for a ticker symbol (Yahoo chart API).

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::sink::CsvSink;

pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Header of the quote CSV, in row order.
pub const QUOTE_FIELDS: [&str; 6] = ["symbol", "date", "last price", "low", "high", "volume"];

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub date: String, // UTC, %Y-%m-%dT%H:%M:%S
    pub last_price: Option<f64>,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub volume: Option<u64>,
}

impl Quote {
    /// Row values in [`QUOTE_FIELDS`] order; missing numbers are empty.
    pub fn values(&self) -> Vec<String> {
        fn opt<T: ToString>(v: Option<T>) -> String {
            v.map(|x| x.to_string()).unwrap_or_default()
        }
        vec![
            self.symbol.clone(),
            self.date.clone(),
            opt(self.last_price),
            opt(self.low),
            opt(self.high),
            opt(self.volume),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Meta {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Bars>,
}

#[derive(Debug, Deserialize, Default)]
struct Bars {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

fn last<T: Copy>(v: &[Option<T>]) -> Option<T> {
    v.last().copied().flatten()
}

/// Build a [`Quote`] from a chart API body, taking the latest bar.
pub fn parse_chart(body: &str, now: DateTime<Utc>) -> Result<Quote> {
    let resp: ChartResponse = serde_json::from_str(body).context("parsing chart json")?;
    if let Some(err) = resp.chart.error.filter(|e| !e.is_null()) {
        return Err(anyhow!("chart api error: {err}"));
    }
    let result = resp
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| anyhow!("chart response without result"))?;
    let bars = result.indicators.quote.into_iter().next().unwrap_or_default();

    Ok(Quote {
        symbol: result.meta.symbol,
        date: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
        last_price: last(&bars.close),
        low: last(&bars.low),
        high: last(&bars.high),
        volume: last(&bars.volume),
    })
}

pub async fn fetch_quote(client: &reqwest::Client, symbol: &str) -> Result<Quote> {
    let url = format!(
        "{YAHOO_CHART_URL}/{symbol}?region=US&lang=en-US&includePrePost=false&interval=2m&range=5d"
    );
    tracing::info!(target: "quote", %url, "chart query");
    let body = client
        .get(&url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("failed to retrieve data from {url}"))?
        .text()
        .await
        .context("reading chart body")?;
    parse_chart(&body, Utc::now())
}

/// Fetch one quote and append it (header once) to `sink`.
pub async fn lookup_and_write(symbol: &str, sink: &CsvSink) -> Result<Quote> {
    let quote = fetch_quote(&reqwest::Client::new(), symbol).await?;
    tracing::info!(target: "quote", ?quote, "found data");
    sink.write_record(&QUOTE_FIELDS, &quote.values())?;
    Ok(quote)
}
