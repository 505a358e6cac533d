// src/ingest/headlines.rs
//! Polling mode: fetch headlines at a fixed interval and hand each new one to
//! the pipeline. The whole polling loop is a single "session"; there is no
//! connection to drop, so it runs without a backoff supervisor.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use sha2::{Digest, Sha256};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::ingest::types::{EventHandler, HeadlineSource, SessionRunner};

pub const DEFAULT_FREQUENCY_SECS: u64 = 120;

/// Headlines remembered for dedup; the oldest are forgotten first.
pub const DEFAULT_SEEN_CAPACITY: usize = 10_000;

/// Bounded set of text keys, evicted in insertion order.
#[derive(Debug)]
struct SeenWindow {
    keys: HashSet<[u8; 32]>,
    order: VecDeque<[u8; 32]>,
    capacity: usize,
}

impl SeenWindow {
    fn new(capacity: usize) -> Self {
        Self {
            keys: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// `true` if `key` was not remembered yet.
    fn insert(&mut self, key: [u8; 32]) -> bool {
        if !self.keys.insert(key) {
            return false;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.keys.remove(&old);
            }
        }
        true
    }
}

pub struct HeadlinePoller {
    source: Box<dyn HeadlineSource>,
    frequency: Duration,
    seen: Mutex<SeenWindow>,
}

fn text_key(text: &str) -> [u8; 32] {
    let digest = Sha256::digest(text.as_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    key
}

impl HeadlinePoller {
    pub fn new(source: Box<dyn HeadlineSource>, frequency: Duration) -> Self {
        Self {
            source,
            frequency,
            seen: Mutex::new(SeenWindow::new(DEFAULT_SEEN_CAPACITY)),
        }
    }

    /// How many distinct headlines to remember.
    pub fn with_seen_capacity(self, capacity: usize) -> Self {
        Self {
            seen: Mutex::new(SeenWindow::new(capacity)),
            ..self
        }
    }

    pub fn frequency(&self) -> Duration {
        self.frequency
    }

    /// Fetch once and dispatch headlines not seen before.
    /// Returns how many were dispatched.
    pub async fn poll_once(&self, handler: &dyn EventHandler) -> Result<usize> {
        let events = self.source.fetch_latest().await?;
        let mut dispatched = 0usize;

        for ev in events {
            let fresh = {
                let mut seen = self.seen.lock().expect("poller seen-set mutex poisoned");
                seen.insert(text_key(&ev.text))
            };
            if !fresh {
                continue;
            }
            debug!(target: "poller", text = %ev.text, url = ?ev.url, "new headline");
            handler.handle(ev).await;
            dispatched += 1;
        }

        counter!("poller_headlines_total").increment(dispatched as u64);
        Ok(dispatched)
    }
}

#[async_trait]
impl SessionRunner for HeadlinePoller {
    async fn run_session(&self, handler: &dyn EventHandler) {
        let mut ticker = tokio::time::interval(self.frequency);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.poll_once(handler).await {
                Ok(n) => info!(target: "poller", source = self.source.name(), new = n, "poll finished"),
                Err(e) => {
                    warn!(target: "poller", source = self.source.name(), error = ?e, "poll failed");
                    counter!("ingest_provider_errors_total").increment(1);
                }
            }
            info!(target: "poller", secs = self.frequency.as_secs(), "waiting for next poll");
        }
    }
}
