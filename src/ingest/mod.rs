// src/ingest/mod.rs
pub mod providers;
pub mod types;

use tracing::{info, warn};

use crate::fetch::{HttpClient, ValidatorCache};
use crate::ingest::types::{NewsItem, SourceProvider};

/// Normalize text: decode HTML entities, strip tags, collapse whitespace,
/// trim stray trailing punctuation.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize typographic quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    out
}

/// Strip URL fragments and surrounding whitespace; the fragment-free URL is
/// the item's identity for dedup.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    match trimmed.find('#') {
        Some(idx) => trimmed[..idx].to_string(),
        None => trimmed.to_string(),
    }
}

/// Truncate to `max` characters, marking the cut with `...`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

/// Fetch every provider in sequence. A provider's failure never aborts the
/// run: it degrades to an empty list for that source, with a warning.
pub async fn fetch_all(
    providers: &[Box<dyn SourceProvider>],
    http: &HttpClient,
    cache: &mut ValidatorCache,
) -> Vec<NewsItem> {
    let mut items = Vec::new();
    for p in providers {
        match p.fetch_latest(http, cache).await {
            Ok(mut v) => {
                info!(provider = p.name(), count = v.len(), "fetched items");
                items.append(&mut v);
            }
            Err(e) => {
                warn!(provider = p.name(), error = ?e, "provider failed, skipping");
            }
        }
    }
    items
}
