// src/analyze/entities.rs
//! Company recognition.
//!
//! The directory is a JSON file (default `config/companies.json`, or the path
//! in `COMPANIES_PATH`) listing `{ symbol, name, aliases }` entries. A company
//! is mentioned when its cashtag (`$TSLA`), its name or one of its aliases
//! occurs in the text, case-insensitively and on word boundaries.
//!
//! Mentions come back in order of first occurrence, one per symbol.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ingest::types::Event;

pub const DEFAULT_COMPANIES_PATH: &str = "config/companies.json";
pub const ENV_COMPANIES_PATH: &str = "COMPANIES_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A recognized company reference inside one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityMention {
    pub symbol: String,
    pub name: String,
    pub excerpt: String,
    pub url: String,
}

#[async_trait]
pub trait EntityExtractor: Send + Sync {
    /// Mentions found in `event`. An empty result is a normal outcome.
    async fn find(&self, event: &Event) -> Result<Vec<EntityMention>>;
}

fn mention_for(company: &Company, event: &Event) -> EntityMention {
    EntityMention {
        symbol: company.symbol.clone(),
        name: company.name.clone(),
        excerpt: event.text.clone(),
        url: event.url.clone().unwrap_or_default(),
    }
}

#[derive(Debug, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    companies: Vec<Company>,
}

#[derive(Debug)]
struct Entry {
    company: Company,
    re: Regex,
}

/// `\b` is only meaningful next to a word character.
fn term_pattern(term: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let pre = if term.chars().next().is_some_and(is_word) { r"\b" } else { "" };
    let post = if term.chars().last().is_some_and(is_word) { r"\b" } else { "" };
    format!("{pre}{}{post}", regex::escape(term))
}

#[derive(Debug, Default)]
pub struct CompanyDirectory {
    entries: Vec<Entry>,
}

impl CompanyDirectory {
    pub fn from_companies(companies: Vec<Company>) -> Result<Self> {
        let mut entries = Vec::with_capacity(companies.len());
        for company in companies {
            let symbol = company.symbol.trim();
            if symbol.is_empty() {
                return Err(anyhow!("company entry without symbol: {}", company.name));
            }
            let mut alts = vec![format!(r"\${}\b", regex::escape(symbol))];
            for term in std::iter::once(&company.name).chain(company.aliases.iter()) {
                let term = term.trim();
                if !term.is_empty() {
                    alts.push(term_pattern(term));
                }
            }
            let re = Regex::new(&format!("(?i)(?:{})", alts.join("|")))
                .with_context(|| format!("compiling matcher for {symbol}"))?;
            entries.push(Entry { company, re });
        }
        Ok(Self { entries })
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading company directory from {}", path.display()))?;
        let file: DirectoryFile = serde_json::from_str(&content)
            .with_context(|| format!("parsing company directory {}", path.display()))?;
        Self::from_companies(file.companies)
    }

    /// `$COMPANIES_PATH`, else `config/companies.json`, else an empty directory.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_COMPANIES_PATH) {
            return Self::load_from(&PathBuf::from(p));
        }
        let p = PathBuf::from(DEFAULT_COMPANIES_PATH);
        if p.exists() {
            return Self::load_from(&p);
        }
        tracing::warn!("no company directory found; every event will be skipped");
        Ok(Self::default())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, symbol: &str) -> Option<&Company> {
        self.entries
            .iter()
            .map(|e| &e.company)
            .find(|c| c.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Companies mentioned in `text`, ordered by first occurrence.
    pub fn scan(&self, text: &str) -> Vec<&Company> {
        let mut hits: Vec<(usize, &Company)> = self
            .entries
            .iter()
            .filter_map(|e| e.re.find(text).map(|m| (m.start(), &e.company)))
            .collect();
        hits.sort_by_key(|(pos, _)| *pos);

        let mut seen = HashSet::new();
        hits.into_iter()
            .filter(|(_, c)| seen.insert(c.symbol.as_str()))
            .map(|(_, c)| c)
            .collect()
    }
}

#[async_trait]
impl EntityExtractor for CompanyDirectory {
    async fn find(&self, event: &Event) -> Result<Vec<EntityMention>> {
        let found = self.scan(&event.text);
        tracing::debug!(
            target: "pipeline",
            found = ?found.iter().map(|c| c.symbol.as_str()).collect::<Vec<_>>(),
            "company scan"
        );
        Ok(found.into_iter().map(|c| mention_for(c, event)).collect())
    }
}

/// Attributes every event to one company (polling mode: all headlines are
/// about the polled symbol).
#[derive(Debug, Clone)]
pub struct FixedSymbolExtractor {
    company: Company,
}

impl FixedSymbolExtractor {
    pub fn new(symbol: &str, name: &str) -> Self {
        Self {
            company: Company {
                symbol: symbol.to_string(),
                name: name.to_string(),
                aliases: Vec::new(),
            },
        }
    }

    /// Name from the directory when known, the symbol itself otherwise.
    pub fn from_directory(symbol: &str, dir: &CompanyDirectory) -> Self {
        match dir.lookup(symbol) {
            Some(c) => Self::new(&c.symbol, &c.name),
            None => Self::new(symbol, symbol),
        }
    }
}

#[async_trait]
impl EntityExtractor for FixedSymbolExtractor {
    async fn find(&self, event: &Event) -> Result<Vec<EntityMention>> {
        Ok(vec![mention_for(&self.company, event)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir() -> CompanyDirectory {
        CompanyDirectory::from_companies(vec![
            Company {
                symbol: "TSLA".into(),
                name: "Tesla Inc.".into(),
                aliases: vec!["Tesla".into()],
            },
            Company {
                symbol: "AAPL".into(),
                name: "Apple Inc.".into(),
                aliases: vec!["Apple".into(), "iPhone".into()],
            },
            Company {
                symbol: "F".into(),
                name: "Ford Motor Company".into(),
                aliases: vec!["Ford".into()],
            },
        ])
        .unwrap()
    }

    #[test]
    fn cashtags_and_aliases_in_order_of_appearance() {
        let d = dir();
        let found: Vec<_> = d
            .scan("New iPhone beats $tsla, Tesla fans annoyed")
            .iter()
            .map(|c| c.symbol.as_str())
            .collect();
        assert_eq!(found, vec!["AAPL", "TSLA"]);
    }

    #[test]
    fn word_boundaries_prevent_partial_hits() {
        let d = dir();
        assert!(d.scan("Affordable housing and Pineapple prices").is_empty());
        assert!(d.scan("$FX rallies").is_empty());
        assert_eq!(d.scan("Buy $F now")[0].symbol, "F");
    }

    #[test]
    fn name_with_trailing_dot_matches() {
        let d = dir();
        assert_eq!(d.scan("Shares of Apple Inc. rose").len(), 1);
    }

    #[tokio::test]
    async fn mentions_carry_excerpt_and_url() {
        let d = dir();
        let ev = Event::new("Tesla $TSLA surges").with_url("https://x.test/1");
        let m = d.find(&ev).await.unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].name, "Tesla Inc.");
        assert_eq!(m[0].excerpt, "Tesla $TSLA surges");
        assert_eq!(m[0].url, "https://x.test/1");
    }

    #[test]
    fn fixed_extractor_falls_back_to_symbol() {
        let d = dir();
        assert_eq!(FixedSymbolExtractor::from_directory("tsla", &d).company.name, "Tesla Inc.");
        assert_eq!(FixedSymbolExtractor::from_directory("NVDA", &d).company.name, "NVDA");
    }
}
