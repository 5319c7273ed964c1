//! # Item Weighting
//!
//! Computes the per-item scalar weight used by the aggregator:
//!
//! `weight = freshness(age_hours) × source_weight(source) × symbol_bonus(title)`
//!
//! - Freshness is an exponential half-life decay (6h half-life).
//! - Source weights come from a fixed lookup table with a built-in seed,
//!   overridable from a JSON config file.
//! - Titles carrying a cashtag (`$BTC`) or a contract-like `0x…` token get
//!   a small multiplicative bonus.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

use crate::ingest::types::NewsItem;

/// Half-life of item freshness, in hours.
pub const DEFAULT_HALF_LIFE_HOURS: f64 = 6.0;

/// Exponential decay weight for an item of the given age.
/// Zero or negative age (clock skew, just-published) counts as fully fresh.
pub fn freshness(age_hours: f64) -> f64 {
    if age_hours <= 0.0 {
        1.0
    } else {
        0.5_f64.powf(age_hours / DEFAULT_HALF_LIFE_HOURS)
    }
}

static RE_CASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$[A-Z]{2,6}\b").unwrap());
static RE_CONTRACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b0x[a-fA-F0-9]{6,}\b").unwrap());

/// True if the text mentions a concrete asset: a cashtag like `$BTC` or a
/// hex contract address like `0xdeadbeef…`.
pub fn detect_crypto_symbols(text: &str) -> bool {
    RE_CASHTAG.is_match(text) || RE_CONTRACT.is_match(text)
}

fn symbol_bonus(title: &str) -> f64 {
    if detect_crypto_symbols(title) {
        1.2
    } else {
        1.0
    }
}

/// Configuration for per-source trust weights, loaded from JSON or defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceWeights {
    /// Weight applied to sources absent from the table.
    #[serde(default = "default_default_weight")]
    pub default_weight: f64,
    /// Explicit weights for known source names.
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

fn default_default_weight() -> f64 {
    0.8
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl SourceWeights {
    /// Load configuration from a JSON file.
    /// Falls back to `default_seed()` on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|_| Self::default_seed()),
            Err(_) => Self::default_seed(),
        }
    }

    /// Weight for a source name; lookup is case-insensitive on trimmed input.
    pub fn weight_for(&self, source: &str) -> f64 {
        let s = source.trim().to_ascii_lowercase();
        if let Some(&w) = self.weights.get(&s) {
            return w;
        }
        self.default_weight
    }

    /// Built-in seed covering the sources the ingest providers emit.
    pub(crate) fn default_seed() -> Self {
        let mut weights = HashMap::new();
        for (k, v) in [
            ("coindesk", 1.0),
            ("reuters markets", 1.0),
            ("cointelegraph", 0.8),
            ("decrypt", 0.85),
            ("cryptoslate", 0.75),
            ("cryptopanic", 0.5),
        ] {
            weights.insert(k.to_string(), v);
        }
        Self {
            default_weight: 0.8,
            weights,
        }
    }
}

/// Full per-item weight at the given reference time.
///
/// An absent or unparseable `published_at` is treated as age 0 (fully
/// fresh) rather than being propagated as an error.
pub fn compute_item_weight(item: &NewsItem, sources: &SourceWeights, now: DateTime<Utc>) -> f64 {
    let age_hours = item
        .parsed_published_at()
        .map(|ts| ((now - ts).num_seconds() as f64 / 3600.0).max(0.0))
        .unwrap_or(0.0);
    freshness(age_hours) * sources.weight_for(&item.source) * symbol_bonus(&item.title)
}
