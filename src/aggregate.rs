//! # Aggregator
//! Combines scored, weighted news items into per-bucket and combined
//! sentiment summaries with a confidence estimate, picks the top
//! positive/negative driver items, and merges in the market indicator
//! snapshot and rolling history.
//!
//! Pure with respect to I/O: items, history and the market snapshot are
//! fetched by the pipeline and passed in, together with the reference time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::history::{append_capped, Counts, HistoryEntry};
use crate::indicators::{CoinActivity, MarketSnapshot, MomentumShift, NormalizedIndicators};
use crate::ingest::types::{Category, NewsItem};
use crate::sentiment::score_text;
use crate::weighting::{compute_item_weight, SourceWeights};

pub const RESULT_VERSION: &str = "v1";

/// Scored items with `|sentiment|` at or below this are neutral noise and
/// are dropped before bucketing.
const NEUTRAL_THRESHOLD: f64 = 0.1;

/// Crypto dominates the combined index by design; global macro news is a
/// minor modifier.
const CRYPTO_SHARE: f64 = 0.9;
const GLOBAL_SHARE: f64 = 0.1;

#[derive(Debug, Clone)]
struct ScoredItem {
    sentiment: f64,
    weight: f64,
    item: NewsItem,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct BucketSummary {
    raw: f64,
    s01: f64,
    confidence: f64,
    count: usize,
}

/// A top-ranked item cited as evidence for the sentiment score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub title: String,
    pub url: String,
    pub source: String,
    pub weight: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketMovers {
    pub high_activity: Vec<CoinActivity>,
    pub momentum_shifts: Vec<MomentumShift>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Drivers {
    pub positive: Vec<Driver>,
    pub negative: Vec<Driver>,
    pub market: MarketMovers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub crypto_sentiment: f64,
    pub global_sentiment: f64,
    pub combined_sentiment: f64,
    pub confidence: f64,
    pub counts: Counts,
    pub market_indicators: MarketSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notes {
    /// Reserved for future diagnostics; always present, currently empty.
    pub warnings: Vec<String>,
}

/// The full output document of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub version: String,
    pub updated_at: String,
    pub summary: Summary,
    pub indicators: NormalizedIndicators,
    pub history: Vec<HistoryEntry>,
    pub drivers: Drivers,
    pub notes: Notes,
}

/// Keep the first-seen item per distinct url; items without a url are
/// dropped entirely.
pub fn dedupe_items(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut seen: HashSet<String> = HashSet::new();
    items
        .into_iter()
        .filter(|it| !it.url.is_empty() && seen.insert(it.url.clone()))
        .collect()
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Reduce one bucket to `(raw, normalized01, confidence, count)`.
///
/// The normalized score deliberately amplifies the raw weighted sentiment
/// (×2, ×0.3 around the 0.5 midpoint) and compresses it into [0.2, 0.8] so
/// the gauge never saturates. Confidence is a smoothed-volume term times a
/// source-diversity term that saturates at 4 distinct sources.
fn calc(bucket: &[ScoredItem]) -> BucketSummary {
    if bucket.is_empty() {
        return BucketSummary::default();
    }
    let total_weight: f64 = bucket.iter().map(|s| s.weight).sum();
    if total_weight == 0.0 {
        return BucketSummary::default();
    }

    let raw = bucket
        .iter()
        .map(|s| s.sentiment * s.weight)
        .sum::<f64>()
        / total_weight;
    let amplified = raw * 2.0;
    let s01 = (0.5 + amplified * 0.3).clamp(0.2, 0.8);

    let unique_sources = bucket
        .iter()
        .map(|s| s.item.source.as_str())
        .collect::<HashSet<_>>()
        .len();
    let volume_term = (total_weight / (total_weight + 10.0)).sqrt();
    let diversity_term = (unique_sources as f64 / 4.0).sqrt().min(1.0);

    BucketSummary {
        raw,
        s01,
        confidence: volume_term * diversity_term,
        count: bucket.len(),
    }
}

fn driver_record(s: &ScoredItem) -> Driver {
    Driver {
        title: s.item.title.clone(),
        url: s.item.url.clone(),
        source: s.item.source.clone(),
        weight: round4(s.weight),
        score: round4(s.sentiment),
    }
}

/// One full aggregation pass. `history` is the persisted prior sequence;
/// the returned document carries it with this run's entry appended
/// (capped).
pub fn aggregate(
    items: Vec<NewsItem>,
    mut history: Vec<HistoryEntry>,
    market: MarketSnapshot,
    sources: &SourceWeights,
    now: DateTime<Utc>,
) -> AggregationResult {
    let items = dedupe_items(items);

    let mut crypto: Vec<ScoredItem> = Vec::new();
    let mut global: Vec<ScoredItem> = Vec::new();
    for item in items {
        let text = item.text.as_deref().unwrap_or(&item.title);
        let sentiment = score_text(text);
        if sentiment.abs() <= NEUTRAL_THRESHOLD {
            continue;
        }
        let weight = compute_item_weight(&item, sources, now);
        let scored = ScoredItem {
            sentiment,
            weight,
            item,
        };
        match scored.item.category.bucket() {
            Category::Global => global.push(scored),
            _ => crypto.push(scored),
        }
    }

    let c = calc(&crypto);
    let g = calc(&global);

    let combined_raw = CRYPTO_SHARE * c.raw + GLOBAL_SHARE * g.raw;
    // The all-empty run reports 0.0 across the board (empty-bucket
    // shortcut), not the midpoint of the [0.2, 0.8] scale.
    let combined01 = if c.count == 0 && g.count == 0 {
        0.0
    } else {
        (combined_raw + 1.0) / 2.0
    };
    let combined_conf = CRYPTO_SHARE * c.confidence + GLOBAL_SHARE * g.confidence;

    // Drivers: rank all scored items by sentiment × weight.
    let mut ranked: Vec<&ScoredItem> = crypto.iter().chain(global.iter()).collect();
    ranked.sort_by(|a, b| {
        (b.sentiment * b.weight)
            .partial_cmp(&(a.sentiment * a.weight))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let positive: Vec<Driver> = ranked
        .iter()
        .filter(|s| s.sentiment > 0.0)
        .take(3)
        .map(|s| driver_record(s))
        .collect();
    let negative: Vec<Driver> = ranked
        .iter()
        .rev()
        .filter(|s| s.sentiment < 0.0)
        .take(3)
        .map(|s| driver_record(s))
        .collect();

    let movers = MarketMovers {
        high_activity: market.activity.high_activity_coins.iter().take(3).cloned().collect(),
        momentum_shifts: market.activity.momentum_shifts.iter().take(3).cloned().collect(),
    };

    let updated_at = now.to_rfc3339();
    let counts = Counts {
        crypto: c.count,
        global: g.count,
    };

    append_capped(
        &mut history,
        HistoryEntry {
            ts: updated_at.clone(),
            crypto: round4(c.s01),
            global: round4(g.s01),
            combined: round4(combined01),
            counts,
        },
    );

    let indicators = market.indicators.clone();
    AggregationResult {
        version: RESULT_VERSION.to_string(),
        updated_at,
        summary: Summary {
            crypto_sentiment: round4(c.s01),
            global_sentiment: round4(g.s01),
            combined_sentiment: round4(combined01),
            confidence: round4(combined_conf),
            counts,
            market_indicators: market,
        },
        indicators,
        history,
        drivers: Drivers {
            positive,
            negative,
            market: movers,
        },
        notes: Notes::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, title: &str, source: &str, category: Category) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            text: None,
            url: url.to_string(),
            source: source.to_string(),
            published_at: Some(Utc::now().to_rfc3339()),
            category,
        }
    }

    fn scored(sentiment: f64, weight: f64, url: &str, source: &str) -> ScoredItem {
        ScoredItem {
            sentiment,
            weight,
            item: item(url, "t", source, Category::Crypto),
        }
    }

    #[test]
    fn dedupe_keeps_first_seen_and_drops_empty_urls() {
        let items = vec![
            item("https://x/1", "first", "CoinDesk", Category::Crypto),
            item("", "no url", "CoinDesk", Category::Crypto),
            item("https://x/1", "second", "Decrypt", Category::Crypto),
            item("https://x/2", "other", "Decrypt", Category::Crypto),
        ];
        let out = dedupe_items(items);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "first");
        assert_eq!(out[1].url, "https://x/2");
    }

    #[test]
    fn empty_bucket_reduces_to_zeros() {
        let b = calc(&[]);
        assert_eq!(b, BucketSummary::default());
        let zero_weight = vec![scored(0.5, 0.0, "https://x/1", "CoinDesk")];
        assert_eq!(calc(&zero_weight), BucketSummary::default());
    }

    #[test]
    fn bucket_raw_is_weight_averaged_sentiment() {
        let b = calc(&[
            scored(1.0, 1.0, "https://x/1", "CoinDesk"),
            scored(-1.0, 3.0, "https://x/2", "Decrypt"),
        ]);
        // (1·1 − 1·3) / 4 = −0.5
        assert!((b.raw - (-0.5)).abs() < 1e-12);
        assert_eq!(b.count, 2);
    }

    #[test]
    fn normalized_sentiment_stays_within_band() {
        for (s, w) in [(1.0, 50.0), (-1.0, 50.0), (0.2, 1.0), (-0.2, 0.1)] {
            let b = calc(&[scored(s, w, "https://x/1", "CoinDesk")]);
            assert!(
                (0.2..=0.8).contains(&b.s01),
                "s01 {} out of band for s={s}, w={w}",
                b.s01
            );
        }
        // Strong positive saturates at the upper clamp.
        let b = calc(&[scored(1.0, 10.0, "https://x/1", "CoinDesk")]);
        assert_eq!(b.s01, 0.8);
    }

    #[test]
    fn confidence_grows_with_weight_and_diversity() {
        let one_source = calc(&[
            scored(0.5, 5.0, "https://x/1", "CoinDesk"),
            scored(0.5, 5.0, "https://x/2", "CoinDesk"),
        ]);
        let four_sources = calc(&[
            scored(0.5, 2.5, "https://x/1", "CoinDesk"),
            scored(0.5, 2.5, "https://x/2", "Decrypt"),
            scored(0.5, 2.5, "https://x/3", "CryptoSlate"),
            scored(0.5, 2.5, "https://x/4", "CoinTelegraph"),
        ]);
        assert!(four_sources.confidence > one_source.confidence);
        assert!((0.0..=1.0).contains(&one_source.confidence));
        assert!((0.0..=1.0).contains(&four_sources.confidence));

        // Same diversity, more weight → higher confidence.
        let light = calc(&[scored(0.5, 1.0, "https://x/1", "CoinDesk")]);
        let heavy = calc(&[scored(0.5, 20.0, "https://x/1", "CoinDesk")]);
        assert!(heavy.confidence > light.confidence);
    }

    #[test]
    fn diversity_term_saturates_at_four_sources() {
        let four = calc(&[
            scored(0.5, 1.0, "https://x/1", "A"),
            scored(0.5, 1.0, "https://x/2", "B"),
            scored(0.5, 1.0, "https://x/3", "C"),
            scored(0.5, 1.0, "https://x/4", "D"),
        ]);
        let five = calc(&[
            scored(0.5, 0.8, "https://x/1", "A"),
            scored(0.5, 0.8, "https://x/2", "B"),
            scored(0.5, 0.8, "https://x/3", "C"),
            scored(0.5, 0.8, "https://x/4", "D"),
            scored(0.5, 0.8, "https://x/5", "E"),
        ]);
        // Equal total weight, diversity capped: confidences match.
        assert!((four.confidence - five.confidence).abs() < 1e-12);
    }

    #[test]
    fn empty_run_reports_zeros_not_midpoint() {
        let sw = SourceWeights::default_seed();
        let r = aggregate(
            Vec::new(),
            Vec::new(),
            MarketSnapshot::neutral(),
            &sw,
            Utc::now(),
        );
        assert_eq!(r.summary.counts, Counts::default());
        assert_eq!(r.summary.crypto_sentiment, 0.0);
        assert_eq!(r.summary.global_sentiment, 0.0);
        assert_eq!(r.summary.combined_sentiment, 0.0);
        assert_eq!(r.summary.confidence, 0.0);
        assert_eq!(r.history.len(), 1);
        assert_eq!(r.history[0].combined, 0.0);
        assert!(r.notes.warnings.is_empty());
        assert_eq!(r.version, RESULT_VERSION);
    }

    #[test]
    fn neutral_items_are_filtered_before_bucketing() {
        let sw = SourceWeights::default_seed();
        let items = vec![
            item("https://x/1", "Company reports quarterly numbers", "CoinDesk", Category::Crypto),
        ];
        let r = aggregate(items, Vec::new(), MarketSnapshot::neutral(), &sw, Utc::now());
        assert_eq!(r.summary.counts.crypto, 0);
        assert!(r.drivers.positive.is_empty());
        assert!(r.drivers.negative.is_empty());
    }

    #[test]
    fn social_and_unknown_categories_fold_into_crypto() {
        let sw = SourceWeights::default_seed();
        let items = vec![
            item("https://x/1", "Mainnet upgrade bullish", "CryptoPanic", Category::Social),
            item("https://x/2", "Exploit causes panic selloff", "CoinDesk", Category::Other),
        ];
        let r = aggregate(items, Vec::new(), MarketSnapshot::neutral(), &sw, Utc::now());
        assert_eq!(r.summary.counts.crypto, 2);
        assert_eq!(r.summary.counts.global, 0);
    }

    #[test]
    fn scoring_prefers_text_over_title() {
        let sw = SourceWeights::default_seed();
        let mut it = item("https://x/1", "Mainnet upgrade bullish", "CoinDesk", Category::Crypto);
        it.text = Some("Regulator files lawsuit, panic selloff follows".to_string());
        let r = aggregate(vec![it], Vec::new(), MarketSnapshot::neutral(), &sw, Utc::now());
        assert!(r.drivers.positive.is_empty());
        assert_eq!(r.drivers.negative.len(), 1);
    }

    #[test]
    fn combined_blend_is_ninety_ten() {
        let sw = SourceWeights::default_seed();
        let now = Utc::now();
        let items = vec![
            item("https://x/1", "Mainnet upgrade bullish rally", "CoinDesk", Category::Crypto),
            item("https://x/2", "Markets drop on panic selloff", "Reuters Markets", Category::Global),
        ];
        let r = aggregate(items, Vec::new(), MarketSnapshot::neutral(), &sw, now);
        assert_eq!(r.summary.counts, Counts { crypto: 1, global: 1 });

        // Recompute the blend from the per-bucket raw scores.
        let c_raw = score_text("Mainnet upgrade bullish rally");
        let g_raw = score_text("Markets drop on panic selloff");
        let expected = ((0.9 * c_raw + 0.1 * g_raw) + 1.0) / 2.0;
        assert!((r.summary.combined_sentiment - round4(expected)).abs() < 1e-9);
    }

    #[test]
    fn drivers_are_ranked_by_sentiment_times_weight() {
        let sw = SourceWeights::default_seed();
        let now = Utc::now();
        let items = vec![
            // CoinDesk weight 1.0 beats CryptoPanic 0.5 at equal sentiment.
            item("https://x/1", "Mainnet upgrade bullish", "CryptoPanic", Category::Crypto),
            item("https://x/2", "Mainnet upgrade bullish", "CoinDesk", Category::Crypto),
            item("https://x/3", "Exchange hack triggers panic selloff", "CoinDesk", Category::Crypto),
        ];
        let r = aggregate(items, Vec::new(), MarketSnapshot::neutral(), &sw, now);
        assert_eq!(r.drivers.positive.len(), 2);
        assert_eq!(r.drivers.positive[0].url, "https://x/2");
        assert_eq!(r.drivers.negative.len(), 1);
        assert_eq!(r.drivers.negative[0].url, "https://x/3");
        assert!(r.drivers.negative[0].score < 0.0);
    }

    #[test]
    fn history_is_appended_once_per_run() {
        let sw = SourceWeights::default_seed();
        let mut history = Vec::new();
        for _ in 0..3 {
            let r = aggregate(
                Vec::new(),
                history.clone(),
                MarketSnapshot::neutral(),
                &sw,
                Utc::now(),
            );
            history = r.history;
        }
        assert_eq!(history.len(), 3);
    }
}
