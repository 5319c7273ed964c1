//! # Market Indicator Snapshot
//!
//! Reduces market-wide numeric signals (CoinGecko top-100 markets,
//! alternative.me Fear & Greed) to a small set of normalized indicators
//! plus a discrete regime classification.
//!
//! The snapshot never fails the run: every sub-reduction goes through
//! [`reduce_or`] with a documented neutral default, so upstream outages
//! degrade individual metrics instead of aborting aggregation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fetch::HttpClient;

const COINGECKO_MARKETS_URL: &str = "https://api.coingecko.com/api/v3/coins/markets\
?vs_currency=usd&order=market_cap_desc&per_page=100&page=1&sparkline=false\
&price_change_percentage=1h,24h,7d,30d";
const FEAR_GREED_URL: &str = "https://api.alternative.me/fng/?limit=7";

/// One per-coin market record as returned by CoinGecko.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoinMarket {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub market_cap: f64,
    #[serde(default)]
    pub total_volume: f64,
    #[serde(default, rename = "price_change_percentage_24h")]
    pub change_24h: Option<f64>,
    #[serde(
        default,
        rename = "price_change_percentage_7d_in_currency",
        alias = "price_change_percentage_7d"
    )]
    pub change_7d: Option<f64>,
    #[serde(
        default,
        rename = "price_change_percentage_30d_in_currency",
        alias = "price_change_percentage_30d"
    )]
    pub change_30d: Option<f64>,
}

impl CoinMarket {
    fn c24(&self) -> f64 {
        self.change_24h.unwrap_or(0.0)
    }
    fn c7(&self) -> f64 {
        self.change_7d.unwrap_or(0.0)
    }
    fn c30(&self) -> f64 {
        self.change_30d.unwrap_or(0.0)
    }
}

/// Discrete market-trend classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Bull,
    Bear,
    Sideways,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DominanceSide {
    Btc,
    Eth,
    #[default]
    Mixed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    AltSeason,
    Mixed,
    BtcDominance,
    Transitional,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FearGreedTrend {
    Improving,
    Declining,
    #[default]
    Stable,
}

/// The compact normalized block exposed at the top level of the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedIndicators {
    /// Top-20 average 24h % change, clamped to ±50 then scaled to [-1, 1].
    pub change24h: f64,
    /// Std-dev of top-20 24h % changes / 15, clamped to [0, 1].
    pub vol: f64,
    #[serde(rename = "fearGreed")]
    pub fear_greed: i64,
    /// Daily acceleration of 24h vs 7d change, scaled to [-1, 1].
    pub momentum: f64,
    pub regime: Regime,
    /// On-chain activity proxy in [0, 1].
    pub activity: f64,
    pub dominance: DominanceSide,
}

impl Default for NormalizedIndicators {
    fn default() -> Self {
        Self {
            change24h: 0.0,
            vol: 0.5,
            fear_greed: 50,
            momentum: 0.0,
            regime: Regime::Unknown,
            activity: 0.5,
            dominance: DominanceSide::Mixed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeSummary {
    pub regime: Regime,
    pub strength: f64,
    pub confidence: f64,
    pub bull_score: i32,
    pub bear_score: i32,
    pub breadth_24h: f64,
    pub avg_change_24h: f64,
    pub avg_change_7d: f64,
    pub avg_change_30d: f64,
    pub weighted_change_24h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FearGreedSummary {
    pub value: i64,
    pub classification: String,
    pub trend: FearGreedTrend,
    pub week_average: f64,
    pub volatility: i64,
}

impl Default for FearGreedSummary {
    fn default() -> Self {
        Self {
            value: 50,
            classification: "Neutral".to_string(),
            trend: FearGreedTrend::Stable,
            week_average: 50.0,
            volatility: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinActivity {
    pub symbol: String,
    pub volume_mcap_ratio: f64,
    pub price_change_24h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumShift {
    pub symbol: String,
    pub momentum: f64,
    pub change_24h: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub total_volume_24h_usd: f64,
    pub high_activity_count: usize,
    pub high_activity_coins: Vec<CoinActivity>,
    pub momentum_shifts: Vec<MomentumShift>,
    pub activity_level: ActivityLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DominanceSummary {
    pub btc_dominance: f64,
    pub eth_dominance: f64,
    pub alt_dominance: f64,
    pub alt_season_score: f64,
    pub season: Season,
    pub alts_outperforming_24h: usize,
    pub alts_outperforming_7d: usize,
    pub btc_performance_24h: f64,
    pub btc_performance_7d: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinQuote {
    pub price: f64,
    pub change_24h: f64,
}

/// Full snapshot: normalized block plus display-only detail metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub timestamp: String,
    pub indicators: NormalizedIndicators,
    pub regime: RegimeSummary,
    pub fear_greed: FearGreedSummary,
    pub activity: ActivitySummary,
    pub dominance: DominanceSummary,
    pub btc: CoinQuote,
    pub eth: CoinQuote,
    pub coins_analyzed: usize,
}

impl MarketSnapshot {
    /// Neutral snapshot used when all upstream data is unavailable
    /// (including offline runs).
    pub fn neutral() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            ..Self::default()
        }
    }
}

/// Apply a pure reduction to the coin list, falling back to the metric's
/// neutral default on empty input or when the reduction declines.
fn reduce_or<T>(coins: &[CoinMarket], fallback: T, f: impl FnOnce(&[CoinMarket]) -> Option<T>) -> T {
    if coins.is_empty() {
        return fallback;
    }
    f(coins).unwrap_or(fallback)
}

fn round_dp(x: f64, dp: u32) -> f64 {
    let m = 10f64.powi(dp as i32);
    (x * m).round() / m
}

/// Bull/bear evidence scoring over the top 20 coins. Average-change
/// thresholds ±2 (24h), ±5 (7d), ±10 (30d) and breadth thresholds
/// 0.7/0.3 (24h), 0.6/0.4 (7d) each add fixed point increments.
pub fn regime_summary(coins: &[CoinMarket]) -> RegimeSummary {
    reduce_or(coins, RegimeSummary::default(), |coins| {
        let top = &coins[..coins.len().min(20)];
        let n = top.len() as f64;

        let positive_24h = top.iter().filter(|c| c.c24() > 0.0).count() as f64;
        let positive_7d = top.iter().filter(|c| c.c7() > 0.0).count() as f64;

        let avg_24h = top.iter().map(|c| c.c24()).sum::<f64>() / n;
        let avg_7d = top.iter().map(|c| c.c7()).sum::<f64>() / n;
        let avg_30d = top.iter().map(|c| c.c30()).sum::<f64>() / n;

        let total_mcap: f64 = top.iter().map(|c| c.market_cap).sum();
        let weighted_24h = if total_mcap > 0.0 {
            top.iter().map(|c| c.c24() * c.market_cap).sum::<f64>() / total_mcap
        } else {
            avg_24h
        };

        let mut bull = 0i32;
        let mut bear = 0i32;

        if avg_24h > 2.0 {
            bull += 2;
        } else if avg_24h < -2.0 {
            bear += 2;
        }
        if avg_7d > 5.0 {
            bull += 3;
        } else if avg_7d < -5.0 {
            bear += 3;
        }
        if avg_30d > 10.0 {
            bull += 4;
        } else if avg_30d < -10.0 {
            bear += 4;
        }
        if positive_24h / n > 0.7 {
            bull += 2;
        } else if positive_24h / n < 0.3 {
            bear += 2;
        }
        if positive_7d / n > 0.6 {
            bull += 2;
        } else if positive_7d / n < 0.4 {
            bear += 2;
        }

        let (regime, strength) = if bull > bear + 2 {
            (Regime::Bull, (bull as f64 / 10.0).min(1.0))
        } else if bear > bull + 2 {
            (Regime::Bear, (bear as f64 / 10.0).min(1.0))
        } else {
            (Regime::Sideways, 1.0 - (bull - bear).abs() as f64 / 10.0)
        };

        let confidence =
            (top.iter().filter(|c| c.market_cap > 0.0).count() as f64 / 20.0).min(1.0);

        Some(RegimeSummary {
            regime,
            strength,
            confidence,
            bull_score: bull,
            bear_score: bear,
            breadth_24h: positive_24h / n,
            avg_change_24h: avg_24h,
            avg_change_7d: avg_7d,
            avg_change_30d: avg_30d,
            weighted_change_24h: weighted_24h,
        })
    })
}

/// Volume-surge and momentum-shift detection over the top 50/30 coins.
pub fn activity_summary(coins: &[CoinMarket]) -> ActivitySummary {
    reduce_or(coins, ActivitySummary::default(), |coins| {
        let mut total_volume = 0.0;
        let mut high_activity = Vec::new();
        for c in &coins[..coins.len().min(50)] {
            total_volume += c.total_volume;
            if c.market_cap > 0.0 {
                let ratio = c.total_volume / c.market_cap;
                if ratio > 0.3 {
                    high_activity.push(CoinActivity {
                        symbol: c.symbol.to_uppercase(),
                        volume_mcap_ratio: ratio,
                        price_change_24h: c.c24(),
                    });
                }
            }
        }
        high_activity.sort_by(|a, b| {
            b.volume_mcap_ratio
                .partial_cmp(&a.volume_mcap_ratio)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut shifts = Vec::new();
        for c in &coins[..coins.len().min(30)] {
            if c.c7() != 0.0 {
                // Daily-rate acceleration of the 24h move versus the 7d move.
                let momentum = c.c24() / 7.0 - c.c7() / 7.0;
                if momentum.abs() > 1.0 {
                    shifts.push(MomentumShift {
                        symbol: c.symbol.to_uppercase(),
                        momentum,
                        change_24h: c.c24(),
                    });
                }
            }
        }
        shifts.sort_by(|a, b| {
            b.momentum
                .abs()
                .partial_cmp(&a.momentum.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let count = high_activity.len();
        let level = if count > 10 {
            ActivityLevel::High
        } else if count > 5 {
            ActivityLevel::Medium
        } else {
            ActivityLevel::Low
        };

        high_activity.truncate(5);
        shifts.truncate(5);

        Some(ActivitySummary {
            total_volume_24h_usd: total_volume,
            high_activity_count: count,
            high_activity_coins: high_activity,
            momentum_shifts: shifts,
            activity_level: level,
        })
    })
}

/// BTC/ETH market-cap shares and the alt-season score (% of the top 30
/// excluding BTC outperforming BTC over 7 days).
pub fn dominance_summary(coins: &[CoinMarket]) -> DominanceSummary {
    reduce_or(coins, DominanceSummary::default(), |coins| {
        let btc = coins.iter().find(|c| c.symbol.eq_ignore_ascii_case("btc"))?;
        let eth = coins.iter().find(|c| c.symbol.eq_ignore_ascii_case("eth"));

        let total_mcap: f64 = coins[..coins.len().min(100)]
            .iter()
            .map(|c| c.market_cap)
            .sum();
        let btc_dom = if total_mcap > 0.0 {
            btc.market_cap / total_mcap * 100.0
        } else {
            0.0
        };
        let eth_dom = match eth {
            Some(e) if total_mcap > 0.0 => e.market_cap / total_mcap * 100.0,
            _ => 0.0,
        };
        let alt_dom = 100.0 - btc_dom - eth_dom;

        let alts = &coins[1..coins.len().min(31)];
        let out_24h = alts.iter().filter(|c| c.c24() > btc.c24()).count();
        let out_7d = alts.iter().filter(|c| c.c7() > btc.c7()).count();

        let alt_season_score = if coins.len() > 30 {
            out_7d as f64 / 30.0 * 100.0
        } else {
            0.0
        };

        let season = if alt_season_score > 75.0 {
            Season::AltSeason
        } else if alt_season_score > 50.0 {
            Season::Mixed
        } else if btc_dom > 45.0 {
            Season::BtcDominance
        } else {
            Season::Transitional
        };

        Some(DominanceSummary {
            btc_dominance: round_dp(btc_dom, 2),
            eth_dominance: round_dp(eth_dom, 2),
            alt_dominance: round_dp(alt_dom, 2),
            alt_season_score: round_dp(alt_season_score, 1),
            season,
            alts_outperforming_24h: out_24h,
            alts_outperforming_7d: out_7d,
            btc_performance_24h: btc.c24(),
            btc_performance_7d: btc.c7(),
        })
    })
}

/// Average 24h % change clamped to ±50 and scaled to [-1, 1].
pub fn normalize_change_24h(avg_change: f64) -> f64 {
    avg_change.clamp(-50.0, 50.0) / 50.0
}

/// Std-dev of top-20 24h % changes / 15, clamped to [0, 1].
/// Neutral default is 0.5.
pub fn volatility(coins: &[CoinMarket]) -> f64 {
    reduce_or(coins, 0.5, |coins| {
        let top = &coins[..coins.len().min(20)];
        let changes: Vec<f64> = top.iter().map(|c| c.c24()).collect();
        let mean = changes.iter().sum::<f64>() / changes.len() as f64;
        let variance =
            changes.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / changes.len() as f64;
        Some((variance.sqrt() / 15.0).min(1.0))
    })
}

/// Daily acceleration of the top-20 24h change versus the 7d daily rate,
/// scaled to [-1, 1].
pub fn momentum(coins: &[CoinMarket]) -> f64 {
    reduce_or(coins, 0.0, |coins| {
        let top = &coins[..coins.len().min(20)];
        let n = top.len() as f64;
        let avg_24h = top.iter().map(|c| c.c24()).sum::<f64>() / n;
        let avg_7d = top.iter().map(|c| c.c7()).sum::<f64>() / n;
        let raw = (avg_24h - avg_7d / 7.0) * 7.0;
        Some((raw / 20.0).clamp(-1.0, 1.0))
    })
}

/// On-chain activity proxy. Real address/gas/TVL feeds are not wired yet,
/// so this reports a fixed moderate level.
pub fn onchain_activity() -> f64 {
    0.6
}

pub fn determine_dominance(
    btc_dominance: f64,
    eth_dominance: f64,
    alt_season_score: f64,
) -> DominanceSide {
    if btc_dominance > 50.0 {
        DominanceSide::Btc
    } else if eth_dominance > 20.0 && alt_season_score > 60.0 {
        DominanceSide::Eth
    } else {
        DominanceSide::Mixed
    }
}

/// 7-day Fear & Greed trend: compare the 3 most recent values against the
/// older remainder, ±5 threshold.
pub fn fear_greed_trend(values: &[i64]) -> FearGreedTrend {
    if values.len() < 2 {
        return FearGreedTrend::Stable;
    }
    let recent_avg = if values.len() >= 3 {
        values[..3].iter().sum::<i64>() as f64 / 3.0
    } else {
        values[0] as f64
    };
    let older = &values[3.min(values.len())..];
    let older_avg = if older.is_empty() {
        recent_avg
    } else {
        older.iter().sum::<i64>() as f64 / older.len() as f64
    };

    if recent_avg > older_avg + 5.0 {
        FearGreedTrend::Improving
    } else if recent_avg < older_avg - 5.0 {
        FearGreedTrend::Declining
    } else {
        FearGreedTrend::Stable
    }
}

/// Assemble a full snapshot from already-fetched inputs. Pure; all fetch
/// failures should arrive here as an empty coin list / default F&G summary.
pub fn build_snapshot(coins: &[CoinMarket], fear_greed: FearGreedSummary) -> MarketSnapshot {
    let regime = regime_summary(coins);
    let activity = activity_summary(coins);
    let dominance = dominance_summary(coins);

    let quote = |sym: &str| {
        coins
            .iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(sym))
            .map(|c| CoinQuote {
                price: c.current_price,
                change_24h: c.c24(),
            })
            .unwrap_or_default()
    };

    let indicators = NormalizedIndicators {
        change24h: round_dp(normalize_change_24h(regime.avg_change_24h), 3),
        vol: round_dp(volatility(coins), 3),
        fear_greed: fear_greed.value,
        momentum: round_dp(momentum(coins), 3),
        regime: regime.regime,
        activity: round_dp(onchain_activity(), 3),
        dominance: determine_dominance(
            dominance.btc_dominance,
            dominance.eth_dominance,
            dominance.alt_season_score,
        ),
    };

    MarketSnapshot {
        timestamp: Utc::now().to_rfc3339(),
        indicators,
        regime,
        fear_greed,
        activity,
        dominance,
        btc: quote("btc"),
        eth: quote("eth"),
        coins_analyzed: coins.len(),
    }
}

// --- fetch side -----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FngResponse {
    #[serde(default)]
    data: Vec<FngEntry>,
}

#[derive(Debug, Deserialize)]
struct FngEntry {
    value: String,
    #[serde(default)]
    value_classification: Option<String>,
}

async fn fetch_coin_markets(http: &HttpClient) -> anyhow::Result<Vec<CoinMarket>> {
    let resp = http.get(COINGECKO_MARKETS_URL, None).await?;
    let coins: Vec<CoinMarket> = serde_json::from_slice(&resp.body)?;
    Ok(coins)
}

async fn fetch_fear_greed(http: &HttpClient) -> anyhow::Result<FearGreedSummary> {
    let resp = http.get(FEAR_GREED_URL, None).await?;
    let parsed: FngResponse = serde_json::from_slice(&resp.body)?;

    let values: Vec<i64> = parsed
        .data
        .iter()
        .filter_map(|d| d.value.parse::<i64>().ok())
        .collect();
    let current = parsed
        .data
        .first()
        .ok_or_else(|| anyhow::anyhow!("empty fear/greed response"))?;

    let week_average = if values.is_empty() {
        50.0
    } else {
        values.iter().sum::<i64>() as f64 / values.len() as f64
    };
    let volatility = match (values.iter().max(), values.iter().min()) {
        (Some(max), Some(min)) => max - min,
        _ => 0,
    };

    Ok(FearGreedSummary {
        value: current.value.parse().unwrap_or(50),
        classification: current
            .value_classification
            .clone()
            .unwrap_or_else(|| "Neutral".to_string()),
        trend: fear_greed_trend(&values),
        week_average,
        volatility,
    })
}

/// Generate the snapshot from live endpoints. Never fails: each upstream
/// outage is logged and degrades to that metric's neutral default.
pub async fn generate(http: &HttpClient) -> MarketSnapshot {
    let coins = match fetch_coin_markets(http).await {
        Ok(coins) => coins,
        Err(e) => {
            warn!(error = ?e, "coin market fetch failed, using empty list");
            Vec::new()
        }
    };
    let fear_greed = match fetch_fear_greed(http).await {
        Ok(fg) => fg,
        Err(e) => {
            warn!(error = ?e, "fear/greed fetch failed, using neutral default");
            FearGreedSummary::default()
        }
    };
    build_snapshot(&coins, fear_greed)
}
