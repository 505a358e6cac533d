// src/logging.rs
//! Tracing setup: compact lines by default, JSON when `LOG_FORMAT=json`.
//! `RUST_LOG` replaces the default directive entirely.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Targets the crate logs under besides its own module paths.
pub const LOG_TARGETS: [&str; 7] = [
    "pipeline",
    "supervisor",
    "session",
    "poller",
    "sink",
    "monitor",
    "quote",
];

/// `stockmine=info,pipeline=info,...,warn`
pub fn default_directive() -> String {
    let mut parts = vec!["stockmine=info".to_string()];
    parts.extend(LOG_TARGETS.iter().map(|t| format!("{t}=info")));
    parts.push("warn".to_string());
    parts.join(",")
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive()))
}

pub fn init() {
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().compact())
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_lists_every_target_before_the_fallback() {
        let d = default_directive();
        assert!(d.starts_with("stockmine=info,pipeline=info,"));
        assert!(d.ends_with(",quote=info,warn"));
    }
}
