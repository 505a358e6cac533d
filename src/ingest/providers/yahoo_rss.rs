// src/ingest/providers/yahoo_rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;

use crate::ingest::normalize_text;
use crate::ingest::types::{Event, HeadlineSource};

pub const YAHOO_RSS_URL: &str = "https://feeds.finance.yahoo.com/rss/2.0/headline";

/// Paragraphs taken from a followed article page.
const MAX_PARAGRAPHS: usize = 10;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
}

/// Headlines for one ticker symbol from the Yahoo Finance RSS feed.
pub struct YahooRssProvider {
    mode: Mode,
    follow_links: bool,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl YahooRssProvider {
    pub fn from_fixture(content: &str) -> Self {
        Self {
            mode: Mode::Fixture(content.to_string()),
            follow_links: false,
        }
    }

    pub fn for_symbol(symbol: &str) -> Self {
        let url = format!("{YAHOO_RSS_URL}?s={symbol}&region=US&lang=en-US");
        Self {
            mode: Mode::Http {
                url,
                client: reqwest::Client::new(),
            },
            follow_links: false,
        }
    }

    /// Also fetch each item's article and emit its first paragraphs.
    /// Only has an effect for HTTP-backed providers.
    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn parse_items_from_str(s: &str) -> Result<Vec<Event>> {
        let t0 = std::time::Instant::now();
        let rss: Rss = from_str(s).context("parsing yahoo rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let text = normalize_text(it.title.as_deref().unwrap_or_default());
            if text.is_empty() {
                continue;
            }
            out.push(Event {
                text,
                url: it.link,
                author: Some("Yahoo Finance".to_string()),
                id: None,
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        Ok(out)
    }

    async fn follow(&self, client: &reqwest::Client, link: &str) -> Result<Vec<Event>> {
        let html = client
            .get(link)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("fetching article {link}"))?
            .text()
            .await
            .context("reading article body")?;

        Ok(extract_paragraphs(&html)
            .into_iter()
            .map(|p| Event::new(p).with_url(link).with_author("Yahoo Finance"))
            .collect())
    }
}

/// Text of the first few `<p>` elements of a page, blanks dropped.
pub fn extract_paragraphs(html: &str) -> Vec<String> {
    static RE_P: OnceCell<Regex> = OnceCell::new();
    let re = RE_P.get_or_init(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p>").expect("paragraph regex"));

    re.captures_iter(html)
        .take(MAX_PARAGRAPHS)
        .filter_map(|c| c.get(1))
        .map(|m| normalize_text(m.as_str()))
        .filter(|t| !t.is_empty())
        .collect()
}

#[async_trait]
impl HeadlineSource for YahooRssProvider {
    async fn fetch_latest(&self) -> Result<Vec<Event>> {
        let (url, client) = match &self.mode {
            Mode::Fixture(s) => return Self::parse_items_from_str(s),
            Mode::Http { url, client } => (url, client),
        };

        let body = client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .context("yahoo rss get()")?
            .text()
            .await
            .context("yahoo rss .text()")?;
        let mut out = Self::parse_items_from_str(&body)?;

        if self.follow_links {
            let links: Vec<String> = out.iter().filter_map(|e| e.url.clone()).collect();
            for link in links {
                match self.follow(client, &link).await {
                    Ok(mut paras) => out.append(&mut paras),
                    Err(e) => {
                        tracing::warn!(target: "poller", error = ?e, %link, "can't crawl article");
                        counter!("ingest_provider_errors_total").increment(1);
                    }
                }
            }
        }

        counter!("ingest_events_total").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "Yahoo Finance"
    }
}
