// src/ingest/types.rs
use anyhow::Result;

/// One text unit handed to the analysis pipeline (a post or a headline).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Event {
    pub text: String,        // raw text as received
    pub url: Option<String>, // link back to the post / article
    pub author: Option<String>,
    pub id: Option<String>,
}

impl Event {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: None,
            author: None,
            id: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Per-event callback registered with a transport.
/// Implementations must not panic or propagate errors; a bad event is dropped.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event);
}

/// Opens one logical session and feeds every delivered event to `handler`,
/// sequentially and in delivery order. Returns when the session ends, for
/// whatever reason. Never retries.
#[async_trait::async_trait]
pub trait SessionRunner: Send + Sync {
    async fn run_session(&self, handler: &dyn EventHandler);
}

/// Pull-based source of headlines for polling mode.
#[async_trait::async_trait]
pub trait HeadlineSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Event>>;
    fn name(&self) -> &'static str;
}
