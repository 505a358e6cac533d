// src/config/mod.rs
//! File configuration (`config/stockmine.toml`).
//!
//! Lookup order:
//! 1) `$STOCKMINE_CONFIG_PATH` (must exist)
//! 2) `config/stockmine.toml`
//! 3) built-in defaults
//!
//! `STREAM_URL` and `STREAM_BEARER_TOKEN` from the environment (or `.env`)
//! override the `[stream]` section.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

pub const ENV_CONFIG_PATH: &str = "STOCKMINE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/stockmine.toml";
pub const ENV_STREAM_URL: &str = "STREAM_URL";
pub const ENV_STREAM_BEARER_TOKEN: &str = "STREAM_BEARER_TOKEN";

pub const DEFAULT_STREAM_URL: &str = "https://stream.twitter.com/1.1/statuses/filter.json";
pub const DEFAULT_MONITOR_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub stream: StreamSection,
    pub output: OutputSection,
    pub monitor: MonitorSection,
    pub companies: CompaniesSection,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamSection {
    pub url: String,
    /// Usually left out of the file and taken from `STREAM_BEARER_TOKEN`.
    pub bearer_token: Option<String>,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_STREAM_URL.to_string(),
            bearer_token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSection {
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorSection {
    pub enabled: bool,
    pub addr: String,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: DEFAULT_MONITOR_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompaniesSection {
    /// Falls back to `$COMPANIES_PATH` / `config/companies.json` when unset.
    pub path: Option<PathBuf>,
}

impl AppConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(cfg.with_env_overrides())
    }

    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if p.exists() {
            return Self::load_from(&p);
        }
        Ok(Self::default().with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(url) = non_empty_env(ENV_STREAM_URL) {
            self.stream.url = url;
        }
        if let Some(token) = non_empty_env(ENV_STREAM_BEARER_TOKEN) {
            self.stream.bearer_token = Some(token);
        }
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
[output]
dir = "out"

[monitor]
enabled = false
"#,
        )
        .unwrap();
        assert_eq!(cfg.output.dir, PathBuf::from("out"));
        assert!(!cfg.monitor.enabled);
        assert_eq!(cfg.monitor.addr, DEFAULT_MONITOR_ADDR);
        assert_eq!(cfg.stream.url, DEFAULT_STREAM_URL);
        assert!(cfg.companies.path.is_none());
    }

    #[serial_test::serial]
    #[test]
    fn env_path_wins_and_env_overrides_stream() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("custom.toml");
        fs::write(&p, "[stream]\nurl = \"https://file.test/stream\"\n").unwrap();

        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::remove_var(ENV_STREAM_URL);
        env::set_var(ENV_STREAM_BEARER_TOKEN, " secret ");
        let cfg = AppConfig::load_default().unwrap();
        assert_eq!(cfg.stream.url, "https://file.test/stream");
        assert_eq!(cfg.stream.bearer_token.as_deref(), Some("secret"));

        env::set_var(ENV_STREAM_URL, "https://env.test/stream");
        let cfg = AppConfig::load_default().unwrap();
        assert_eq!(cfg.stream.url, "https://env.test/stream");

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("nope.toml").display().to_string());
        assert!(AppConfig::load_default().is_err());

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_STREAM_URL);
        env::remove_var(ENV_STREAM_BEARER_TOKEN);
    }
}
