// src/analyze/tokenize.rs
//! Word tokenization used by the keyword filters.

use once_cell::sync::Lazy;
use regex::Regex;

/// Symbols removed from the raw text before tokenizing.
static STRIP_SET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[%|$.,!:@]|\(|\)|#|\+|``|''|\?|-").expect("strip-set regex"));

/// Clitic suffixes split off into their own token ("don't" -> "do", "n't").
const CLITICS: [&str; 7] = ["n't", "'s", "'re", "'ve", "'ll", "'d", "'m"];

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Remove the filter punctuation set from `text`.
pub fn strip_filter_symbols(text: &str) -> String {
    STRIP_SET.replace_all(text, "").into_owned()
}

/// Treebank-flavoured word tokenizer: whitespace split, punctuation at the
/// edges of a word becomes its own token, and common clitics are separated.
/// Case is preserved.
#[derive(Debug, Clone, Default)]
pub struct WordTokenizer;

impl WordTokenizer {
    pub fn new() -> Self {
        Self
    }

    fn push_word(out: &mut Vec<String>, word: &str) {
        let lower = word.to_ascii_lowercase();
        for c in CLITICS {
            if lower.len() > c.len() && lower.ends_with(c) {
                let cut = word.len() - c.len();
                out.push(word[..cut].to_string());
                out.push(word[cut..].to_string());
                return;
            }
        }
        out.push(word.to_string());
    }
}

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        for chunk in text.split_whitespace() {
            let start = chunk
                .char_indices()
                .find(|(_, c)| c.is_alphanumeric())
                .map(|(i, _)| i);
            let Some(start) = start else {
                // Pure punctuation chunk, e.g. ";" or "...".
                out.push(chunk.to_string());
                continue;
            };
            let end = chunk
                .char_indices()
                .rev()
                .find(|(_, c)| c.is_alphanumeric())
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(chunk.len());

            for c in chunk[..start].chars() {
                out.push(c.to_string());
            }
            Self::push_word(&mut out, &chunk[start..end]);
            for c in chunk[end..].chars() {
                out.push(c.to_string());
            }
        }
        out
    }
}
