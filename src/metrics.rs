// src/metrics.rs
//! Prometheus recorder plus one-time descriptions of every series the
//! miner emits.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Install the global Prometheus recorder. Fails if a recorder is already set.
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("prometheus: install recorder")?;
    describe_all();
    Ok(handle)
}

/// One-time metrics registration (so series show up on /metrics).
pub fn describe_all() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("supervisor_sessions_total", "Sessions started by the backoff supervisor.");
        describe_gauge!("backoff_tries", "Delays taken in the current backoff sequence.");
        describe_counter!("session_attempts_total", "Stream connections attempted.");
        describe_counter!(
            "session_bad_lines_total",
            "Stream lines that could not be decoded as a post."
        );
        describe_counter!("poller_headlines_total", "New headlines handed to the pipeline.");
        describe_counter!("ingest_events_total", "Total events parsed from providers.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_histogram!("ingest_parse_ms", "Provider parse time in milliseconds.");
        describe_counter!("pipeline_events_total", "Events entering the analysis pipeline.");
        describe_counter!(
            "pipeline_skipped_total",
            "Events dropped by a keyword gate or with no known company, by reason."
        );
        describe_counter!("pipeline_rows_written_total", "Result rows appended to the CSV sink.");
        describe_counter!("pipeline_errors_total", "Events dropped because of an error.");
    });
}
