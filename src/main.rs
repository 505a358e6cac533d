//! stockmine: stream or poll market chatter, score it per company and append
//! the results to a CSV file.

use clap::Parser;

use stockmine::cli::Cli;
use stockmine::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; harmless when absent.
    let _ = dotenvy::dotenv();
    stockmine::logging::init();

    let cli = Cli::parse();
    let cfg = AppConfig::load_default()?;

    if let Err(e) = stockmine::app::run(cli, cfg).await {
        tracing::error!(error = ?e, "stockmine stopped");
        return Err(e);
    }
    Ok(())
}
