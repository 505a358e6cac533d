// src/ingest/mod.rs
//! Event sources: the streaming session, the headline poller and the
//! providers they pull from.

pub mod headlines;
pub mod providers;
pub mod stream;
pub mod tweet;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;

/// Max characters kept from a single scraped text unit.
const MAX_TEXT_CHARS: usize = 1500;

/// Normalize scraped text: decode entities, strip tags, fold quotes and whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (covers NBSP and newlines)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_markup_and_folds_ws() {
        let s = "  <p>Tesla&nbsp;<b>beats</b>\n\t&ldquo;estimates&rdquo;!</p> ";
        assert_eq!(normalize_text(s), r#"Tesla beats "estimates"!"#);
    }

    #[test]
    fn normalize_text_caps_length() {
        let s = "x".repeat(4_000);
        assert_eq!(normalize_text(&s).chars().count(), MAX_TEXT_CHARS);
    }
}
