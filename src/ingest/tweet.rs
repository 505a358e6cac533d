// src/ingest/tweet.rs
//! Decoding of streamed post payloads into [`Event`]s.
//!
//! Two payload shapes are accepted:
//! - v1.1 statuses: `{ "text", "id_str", "user": { "screen_name" } }`
//! - v2 stream envelopes: `{ "data": { "text", "id", "author_id" }, "includes": { "users": [{ "username" }] } }`

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::ingest::types::Event;

const TWEET_URL_BASE: &str = "https://twitter.com";

#[derive(Debug, Deserialize)]
struct V1Status {
    text: String,
    id_str: Option<String>,
    user: Option<V1User>,
}

#[derive(Debug, Deserialize)]
struct V1User {
    screen_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct V2Envelope {
    data: V2Tweet,
    #[serde(default)]
    includes: Option<V2Includes>,
}

#[derive(Debug, Deserialize)]
struct V2Tweet {
    text: String,
    id: Option<String>,
    author_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct V2Includes {
    #[serde(default)]
    users: Vec<V2User>,
}

#[derive(Debug, Deserialize)]
struct V2User {
    id: Option<String>,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    V2(V2Envelope),
    V1(V1Status),
}

/// Link to a post, if both the author handle and the id are known.
pub fn tweet_link(screen_name: Option<&str>, id: Option<&str>) -> Option<String> {
    match (screen_name, id) {
        (Some(name), Some(id)) if !name.is_empty() && !id.is_empty() => {
            Some(format!("{TWEET_URL_BASE}/{name}/status/{id}"))
        }
        _ => None,
    }
}

/// Decode one raw payload line into an [`Event`].
pub fn parse_tweet(raw: &str) -> Result<Event> {
    let payload: Payload =
        serde_json::from_str(raw).with_context(|| format!("decoding post payload: {raw}"))?;

    let (text, id, author) = match payload {
        Payload::V1(st) => {
            let author = st.user.and_then(|u| u.screen_name);
            (st.text, st.id_str, author)
        }
        Payload::V2(env) => {
            let users = env.includes.map(|i| i.users).unwrap_or_default();
            // Prefer the user matching author_id; fall back to the first expansion.
            let author = users
                .iter()
                .find(|u| u.id.is_some() && u.id == env.data.author_id)
                .or_else(|| users.first())
                .and_then(|u| u.username.clone());
            (env.data.text, env.data.id, author)
        }
    };

    if text.trim().is_empty() {
        return Err(anyhow!("post payload without text"));
    }

    let url = tweet_link(author.as_deref(), id.as_deref());
    Ok(Event {
        text,
        url,
        author,
        id,
    })
}
