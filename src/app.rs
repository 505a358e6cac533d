// src/app.rs
//! Wires configuration into one of the three run modes and drives it until it
//! finishes, gives up or is interrupted.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use tracing::{info, warn};

use crate::analyze::{
    AnalysisPipeline, CompanyDirectory, FixedSymbolExtractor, KeywordFilterSet,
    LexiconSentimentEngine, EXCERPT_HEADLINE,
};
use crate::cli::{Cli, Mode};
use crate::config::AppConfig;
use crate::ingest::headlines::HeadlinePoller;
use crate::ingest::providers::quote;
use crate::ingest::providers::yahoo_rss::YahooRssProvider;
use crate::ingest::stream::{load_follow_ids, HttpStreamSession, StreamConfig};
use crate::ingest::types::SessionRunner;
use crate::monitor::{self, Monitor};
use crate::sink::CsvSink;
use crate::supervisor::{BackoffSupervisor, Clock};

fn output_dir(cli: &Cli, cfg: &AppConfig) -> Result<PathBuf> {
    let dir = cli.output_dir.clone().unwrap_or_else(|| cfg.output.dir.clone());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    Ok(dir)
}

fn load_directory(cfg: &AppConfig) -> Result<CompanyDirectory> {
    let dir = match &cfg.companies.path {
        Some(p) => CompanyDirectory::load_from(p)?,
        None => CompanyDirectory::load_default()?,
    };
    info!(companies = dir.len(), "company directory loaded");
    Ok(dir)
}

async fn start_monitor(cfg: &AppConfig) -> Result<Option<Monitor>> {
    if !cfg.monitor.enabled {
        return Ok(None);
    }
    let handle = match crate::metrics::install_recorder() {
        Ok(h) => Some(h),
        Err(e) => {
            warn!(target: "monitor", error = ?e, "metrics disabled");
            None
        }
    };
    Monitor::start(&cfg.monitor.addr, monitor::router(handle))
        .await
        .map(Some)
}

/// Resolves on Ctrl-C. If the signal cannot be watched it never resolves.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = ?e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// Drive the supervisor. It only comes back once the retry budget is spent.
pub async fn supervise<R, C>(supervisor: &BackoffSupervisor<R, C>) -> Result<()>
where
    R: SessionRunner,
    C: Clock,
{
    supervisor.run().await;
    Err(anyhow!("exceeded maximum retry count"))
}

/// Run `work` until it finishes or `shutdown` fires, then stop the monitor.
/// On shutdown `work` is dropped where it stands, backoff sleep included.
pub async fn run_until<W, S>(work: W, shutdown: S, monitor: Option<Monitor>) -> Result<()>
where
    W: Future<Output = Result<()>>,
    S: Future<Output = ()>,
{
    let result = tokio::select! {
        r = work => r,
        _ = shutdown => {
            info!("interrupted, shutting down");
            Ok(())
        }
    };
    if let Some(m) = monitor {
        m.stop().await;
    }
    result
}

/// Run until the mode completes. Errors map to a non-zero exit in `main`.
pub async fn run(cli: Cli, cfg: AppConfig) -> Result<()> {
    let mode = cli.mode()?;
    let sink = Arc::new(CsvSink::at_start(&output_dir(&cli, &cfg)?, &Local::now()));
    info!(target: "sink", path = %sink.path().display(), "results file");

    let filters = || {
        KeywordFilterSet::from_lists(
            cli.required_keywords.as_deref(),
            cli.ignored_keywords.as_deref(),
        )
    };
    let engine = Arc::new(LexiconSentimentEngine::new());

    match mode {
        Mode::Quote { symbol } => {
            let q = quote::lookup_and_write(&symbol, &sink).await?;
            info!(symbol = %q.symbol, date = %q.date, "quote written");
            Ok(())
        }
        Mode::Stream { track, follow_file } => {
            let directory = Arc::new(load_directory(&cfg)?);
            let follow = match &follow_file {
                Some(p) => load_follow_ids(p)?,
                None => Vec::new(),
            };
            if cfg.stream.bearer_token.is_none() {
                warn!(target: "session", "no STREAM_BEARER_TOKEN set; connecting without credentials");
            }
            info!(target: "session", ?track, follow = follow.len(), "stream mode");
            let session = HttpStreamSession::new(StreamConfig {
                url: cfg.stream.url.clone(),
                bearer_token: cfg.stream.bearer_token.clone(),
                track,
                follow,
            });
            let pipeline = Arc::new(AnalysisPipeline::new(filters(), directory, engine, sink));
            let supervisor = BackoffSupervisor::new(session, pipeline);

            let monitor = start_monitor(&cfg).await?;
            run_until(supervise(&supervisor), ctrl_c(), monitor).await
        }
        Mode::Headlines {
            symbol,
            frequency,
            follow_links,
        } => {
            let directory = load_directory(&cfg)?;
            let extractor = Arc::new(FixedSymbolExtractor::from_directory(&symbol, &directory));
            let pipeline = AnalysisPipeline::new(filters(), extractor, engine, sink)
                .with_excerpt_label(EXCERPT_HEADLINE);
            let source = YahooRssProvider::for_symbol(&symbol).with_follow_links(follow_links);
            let poller = HeadlinePoller::new(Box::new(source), Duration::from_secs(frequency));
            info!(target: "poller", %symbol, frequency, follow_links, "headline mode");

            let monitor = start_monitor(&cfg).await?;
            let polling = async {
                poller.run_session(&pipeline).await;
                Ok::<(), anyhow::Error>(())
            };
            run_until(polling, ctrl_c(), monitor).await
        }
    }
}
