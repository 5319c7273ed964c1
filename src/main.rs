//! Market Sentiment Feed — Binary Entrypoint
//! One discrete batch run per invocation: fetch, score, aggregate, persist.
//! Meant to be driven by an external scheduler (cron/CI); exits 0 whenever
//! aggregation itself completes, even under partial fetch failure.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use market_sentiment_feed::pipeline::{self, RunOptions, Window};
use market_sentiment_feed::store::JsonStore;

#[derive(Debug, Parser)]
#[command(name = "market-sentiment-feed", about = "Crypto/global news sentiment index")]
struct Cli {
    /// Analysis window (accepted for scheduler symmetry).
    #[arg(long, value_enum, default_value = "1h")]
    window: Window,

    /// Use the bundled sample dataset instead of live fetches.
    #[arg(long)]
    offline: bool,

    /// Generate the daily recap from persisted history and exit.
    #[arg(long)]
    recap: bool,

    /// Directory for feed.json / history.json / recap.json artifacts.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("market_sentiment_feed=info,warn"));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let store = JsonStore::new(&cli.out_dir);

    if cli.recap {
        pipeline::write_recap(&store)?;
        return Ok(());
    }

    let opts = RunOptions {
        window: cli.window,
        offline: cli.offline,
    };
    pipeline::run(&opts, &store).await?;
    Ok(())
}
