// src/ingest/stream.rs
//! Streaming transport: one long-lived HTTP request whose body is
//! newline-delimited JSON, one post per line.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use metrics::counter;
use tracing::{debug, error, info, warn};

use crate::ingest::tweet::parse_tweet;
use crate::ingest::types::{EventHandler, SessionRunner};

#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    pub url: String,
    pub bearer_token: Option<String>,
    /// Phrases to track (sent comma-joined as `track`).
    pub track: Vec<String>,
    /// User ids to follow (sent comma-joined as `follow`).
    pub follow: Vec<String>,
}

/// Reads user ids from a file, one per line. Blank lines are skipped.
pub fn load_follow_ids(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading follow list from {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Splits an incoming byte stream into complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Feed a chunk; returns every line completed by it (without the newline).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let rest = self.buf.split_off(pos + 1);
            let line = std::mem::replace(&mut self.buf, rest);
            lines.push(String::from_utf8_lossy(&line).trim_end().to_string());
        }
        lines
    }

    /// Whatever is left after the stream ended, if non-blank.
    pub fn finish(self) -> Option<String> {
        let tail = String::from_utf8_lossy(&self.buf).trim().to_string();
        (!tail.is_empty()).then_some(tail)
    }
}

/// Silence after which a connection counts as dead. The upstream sends
/// keep-alive newlines well within this.
pub const STALL_TIMEOUT: Duration = Duration::from_secs(90);

pub struct HttpStreamSession {
    cfg: StreamConfig,
    client: reqwest::Client,
    stall: Duration,
}

impl HttpStreamSession {
    pub fn new(cfg: StreamConfig) -> Self {
        Self {
            cfg,
            client: reqwest::Client::new(),
            stall: STALL_TIMEOUT,
        }
    }

    /// Longest wait for the response head or for the next body chunk.
    pub fn with_stall_timeout(mut self, stall: Duration) -> Self {
        self.stall = stall;
        self
    }

    async fn open(&self) -> Result<reqwest::Response> {
        let mut req = self.client.get(&self.cfg.url);
        if let Some(token) = &self.cfg.bearer_token {
            req = req.bearer_auth(token);
        }
        if !self.cfg.track.is_empty() {
            req = req.query(&[("track", self.cfg.track.join(","))]);
        }
        if !self.cfg.follow.is_empty() {
            req = req.query(&[("follow", self.cfg.follow.join(","))]);
        }

        let resp = tokio::time::timeout(self.stall, req.send())
            .await
            .map_err(|_| anyhow!("no response within {:?}", self.stall))?
            .context("connecting to stream")?;
        resp.error_for_status().context("stream rejected the request")
    }

    /// Deliver one line to the handler. Returns true if an event was dispatched.
    async fn dispatch(&self, line: &str, handler: &dyn EventHandler) -> bool {
        // Keep-alive newlines carry no payload.
        if line.trim().is_empty() {
            return false;
        }
        match parse_tweet(line) {
            Ok(ev) => {
                debug!(target: "session", id = ?ev.id, "examining post");
                handler.handle(ev).await;
                true
            }
            Err(e) => {
                warn!(target: "session", error = %e, "skipping undecodable line");
                counter!("session_bad_lines_total").increment(1);
                false
            }
        }
    }

    /// Pump events until the upstream closes. Returns how many were delivered.
    async fn pump(&self, handler: &dyn EventHandler) -> Result<usize> {
        let resp = self.open().await?;
        let mut body = resp.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut delivered = 0usize;

        loop {
            let next = tokio::time::timeout(self.stall, body.next())
                .await
                .map_err(|_| anyhow!("stream stalled: no data for {:?}", self.stall))?;
            let Some(chunk) = next else { break };
            let chunk = chunk.context("reading stream body")?;
            for line in lines.push(&chunk) {
                if self.dispatch(&line, handler).await {
                    delivered += 1;
                }
            }
        }
        if let Some(tail) = lines.finish() {
            if self.dispatch(&tail, handler).await {
                delivered += 1;
            }
        }
        Ok(delivered)
    }
}

#[async_trait]
impl SessionRunner for HttpStreamSession {
    async fn run_session(&self, handler: &dyn EventHandler) {
        counter!("session_attempts_total").increment(1);
        info!(
            target: "session",
            url = %self.cfg.url,
            track = ?self.cfg.track,
            follow = self.cfg.follow.len(),
            "starting new session"
        );
        match self.pump(handler).await {
            Ok(delivered) => warn!(target: "session", delivered, "stream closed by upstream"),
            Err(e) => error!(target: "session", error = ?e, "session failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_joins_split_chunks() {
        let mut lb = LineBuffer::default();
        assert!(lb.push(b"{\"text\":\"a").is_empty());
        let out = lb.push(b"\"}\r\n\r\n{\"te");
        assert_eq!(out, vec!["{\"text\":\"a\"}".to_string(), String::new()]);
        let out = lb.push(b"xt\":\"b\"}");
        assert!(out.is_empty());
        assert_eq!(lb.finish().as_deref(), Some("{\"text\":\"b\"}"));
    }

    #[test]
    fn blank_tail_is_dropped() {
        let mut lb = LineBuffer::default();
        lb.push(b"x\n  ");
        assert!(lb.finish().is_none());
    }

    #[test]
    fn follow_ids_skip_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("users.txt");
        std::fs::write(&p, "123\n\n  456  \n").unwrap();
        assert_eq!(load_follow_ids(&p).unwrap(), vec!["123", "456"]);
    }
}
