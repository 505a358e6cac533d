// src/cli.rs
//! Command-line surface.
//!
//! Three run modes fall out of the flag combination:
//! * `--keywords` / `--file` stream posts through the pipeline,
//! * `--symbol --news-headlines` polls headlines for one symbol,
//! * `--symbol` alone writes a one-row quote.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;

use crate::ingest::headlines::DEFAULT_FREQUENCY_SECS;

#[derive(Debug, Clone, Parser)]
#[command(name = "stockmine", version, about = "Mine social posts and headlines for stock sentiment")]
pub struct Cli {
    /// Comma-separated phrases to track on the stream.
    #[arg(short = 'k', long, conflicts_with_all = ["news_headlines", "symbol"])]
    pub keywords: Option<String>,

    /// Comma-separated words; a post must contain at least one of them.
    #[arg(long)]
    pub required_keywords: Option<String>,

    /// Comma-separated words that drop a post when present.
    #[arg(long)]
    pub ignored_keywords: Option<String>,

    /// File with one account id per line to follow on the stream.
    #[arg(short = 'f', long, conflicts_with_all = ["news_headlines", "symbol"])]
    pub file: Option<PathBuf>,

    /// Company ticker symbol.
    #[arg(short = 's', long)]
    pub symbol: Option<String>,

    /// Poll news headlines for `--symbol`.
    #[arg(long, requires = "symbol")]
    pub news_headlines: bool,

    /// Seconds between headline polls.
    #[arg(long, default_value_t = DEFAULT_FREQUENCY_SECS)]
    pub frequency: u64,

    /// Also fetch the linked articles and analyse their paragraphs.
    #[arg(long, requires = "news_headlines")]
    pub follow_links: bool,

    /// Directory for the results file (overrides `[output] dir`).
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Stream {
        track: Vec<String>,
        follow_file: Option<PathBuf>,
    },
    Headlines {
        symbol: String,
        frequency: u64,
        follow_links: bool,
    },
    Quote {
        symbol: String,
    },
}

/// Comma-separated list in input order, trimmed, blanks and repeats dropped.
fn ordered_list(raw: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for k in raw.unwrap_or_default().split(',').map(str::trim) {
        if !k.is_empty() && !out.iter().any(|o| o == k) {
            out.push(k.to_string());
        }
    }
    out
}

impl Cli {
    pub fn mode(&self) -> Result<Mode> {
        if self.keywords.is_some() || self.file.is_some() {
            let mut track = ordered_list(self.keywords.as_deref());
            // Required words are tracked too, or the stream would never carry them.
            if !track.is_empty() {
                for w in ordered_list(self.required_keywords.as_deref()) {
                    if !track.contains(&w) {
                        track.push(w);
                    }
                }
            }
            return Ok(Mode::Stream {
                track,
                follow_file: self.file.clone(),
            });
        }

        let symbol = self
            .symbol
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("nothing to do: pass --keywords, --file or --symbol (see --help)"))?
            .to_uppercase();

        if self.news_headlines {
            if self.frequency == 0 {
                return Err(anyhow!("--frequency must be at least 1 second"));
            }
            Ok(Mode::Headlines {
                symbol,
                frequency: self.frequency,
                follow_links: self.follow_links,
            })
        } else {
            Ok(Mode::Quote { symbol })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("stockmine").chain(args.iter().copied()))
    }

    #[test]
    fn keywords_select_stream_and_track_required_words() {
        let cli = parse(&["-k", "Tesla, $TSLA", "--required-keywords", "Tesla,EV"]).unwrap();
        assert_eq!(
            cli.mode().unwrap(),
            Mode::Stream {
                track: vec!["Tesla".into(), "$TSLA".into(), "EV".into()],
                follow_file: None,
            }
        );
    }

    #[test]
    fn symbol_alone_is_a_quote() {
        let cli = parse(&["-s", "tsla"]).unwrap();
        assert_eq!(cli.mode().unwrap(), Mode::Quote { symbol: "TSLA".into() });
    }

    #[test]
    fn headlines_take_frequency_and_follow_links() {
        let cli = parse(&["-s", "AAPL", "--news-headlines", "--frequency", "30", "--follow-links"]).unwrap();
        assert_eq!(
            cli.mode().unwrap(),
            Mode::Headlines {
                symbol: "AAPL".into(),
                frequency: 30,
                follow_links: true,
            }
        );
        let cli = parse(&["-s", "AAPL", "--news-headlines"]).unwrap();
        assert!(matches!(cli.mode().unwrap(), Mode::Headlines { frequency: 120, .. }));
    }

    #[test]
    fn invalid_combinations_are_rejected() {
        assert!(parse(&["-k", "Tesla", "-s", "TSLA", "--news-headlines"]).is_err());
        assert!(parse(&["-f", "ids.txt", "-s", "TSLA", "--news-headlines"]).is_err());
        assert!(parse(&["-s", "TSLA", "--follow-links"]).is_err());
        // a symbol would be silently ignored by stream mode
        assert!(parse(&["-k", "Tesla", "-s", "TSLA"]).is_err());
        assert!(parse(&["-f", "ids.txt", "-s", "TSLA"]).is_err());
        assert!(parse(&["--news-headlines"]).is_err());
        assert!(parse(&[]).unwrap().mode().is_err());
        assert!(parse(&["-s", "TSLA", "--news-headlines", "--frequency", "0"])
            .unwrap()
            .mode()
            .is_err());
    }
}
