//! # Run orchestration
//! One batch invocation: load persisted state, gather items (live or
//! bundled samples), reduce market indicators, aggregate, persist. The run
//! never hard-fails on fetch problems — it prefers stale/neutral output
//! over no output — and artifacts are written only at the very end of a
//! successful pass.

use anyhow::Result;
use chrono::Utc;
use clap::ValueEnum;
use tracing::{info, warn};

use crate::aggregate::{aggregate, AggregationResult};
use crate::fetch::HttpClient;
use crate::indicators::{self, MarketSnapshot};
use crate::ingest::fetch_all;
use crate::ingest::providers::default_providers;
use crate::ingest::types::NewsItem;
use crate::recap::build_recap;
use crate::store::JsonStore;
use crate::weighting::SourceWeights;

pub const SOURCE_WEIGHTS_PATH: &str = "config/source_weights.json";

/// Analysis window. Accepted for scheduler symmetry; the reduction logic
/// itself is window-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Window {
    #[default]
    #[value(name = "1h")]
    OneHour,
    #[value(name = "4h")]
    FourHours,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub window: Window,
    pub offline: bool,
}

/// Bundled sample dataset for offline runs and the cold-start fallback.
/// Timestamps in the bundled file are static, so they are restamped to the
/// load time; otherwise the freshness decay would zero the sample weights.
pub fn sample_items() -> Vec<NewsItem> {
    let raw = include_str!("../samples/sample_items.json");
    let mut items: Vec<NewsItem> =
        serde_json::from_str(raw).expect("valid bundled sample items");
    let now = Utc::now().to_rfc3339();
    for it in &mut items {
        it.published_at = Some(now.clone());
    }
    items
}

/// Execute one batch run against the given store.
pub async fn run(opts: &RunOptions, store: &JsonStore) -> Result<AggregationResult> {
    info!(window = ?opts.window, offline = opts.offline, "starting run");

    let history = store.load_history();
    let mut cache = store.load_validator_cache();
    let weights = SourceWeights::load_from_file(SOURCE_WEIGHTS_PATH);

    let (items, market) = if opts.offline {
        (sample_items(), MarketSnapshot::neutral())
    } else {
        let http = HttpClient::new()?;
        let providers = default_providers();
        let mut items = fetch_all(&providers, &http, &mut cache).await;

        // Cold start with every source down: fall back to bundled samples.
        // With a prior feed on disk the run proceeds with zero new items.
        if items.is_empty() && !store.feed_exists() {
            warn!("all sources empty and no prior feed, using bundled samples");
            items = sample_items();
        }

        let market = indicators::generate(&http).await;
        (items, market)
    };

    let result = aggregate(items, history, market, &weights, Utc::now());

    store.save_feed(&result)?;
    store.save_history(&result.history)?;
    store.save_validator_cache(&cache)?;

    info!(
        crypto = result.summary.counts.crypto,
        global = result.summary.counts.global,
        combined = result.summary.combined_sentiment,
        "run complete"
    );
    Ok(result)
}

/// Generate the recap report from persisted history (`--recap`).
pub fn write_recap(store: &JsonStore) -> Result<bool> {
    let history = store.load_history();
    match build_recap(&history, Utc::now()) {
        Some(recap) => {
            store.save_recap(&recap)?;
            info!(entries = recap.entries, "recap written");
            Ok(true)
        }
        None => {
            warn!("no history yet, skipping recap");
            Ok(false)
        }
    }
}
