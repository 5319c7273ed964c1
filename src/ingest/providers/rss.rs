// src/ingest/providers/rss.rs
//! Generic RSS provider shared by all feed-backed sources (CoinDesk,
//! CoinTelegraph, Reuters Markets, Decrypt, CryptoSlate). Issues a
//! conditional GET through the validator cache and parses the channel
//! with `quick-xml`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use crate::fetch::{HttpClient, ValidatorCache};
use crate::ingest::types::{Category, NewsItem, SourceProvider};
use crate::ingest::{normalize_text, normalize_url, truncate_chars};

const MAX_ENTRIES: usize = 75;
const MAX_TITLE_CHARS: usize = 240;
const MAX_TEXT_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// RFC 2822 feed timestamp → RFC 3339 UTC string; `None` on parse failure.
fn parse_rfc2822_iso(ts: &str) -> Option<String> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC))
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

pub struct RssProvider {
    name: &'static str,
    url: &'static str,
    category: Category,
}

impl RssProvider {
    pub fn new(name: &'static str, url: &'static str, category: Category) -> Self {
        Self {
            name,
            url,
            category,
        }
    }

    /// Parse feed XML into items; exposed for fixture-driven tests.
    pub fn parse_feed(&self, xml: &str) -> Result<Vec<NewsItem>> {
        let rss: Rss = from_str(xml).with_context(|| format!("parsing {} rss xml", self.name))?;
        let now_iso = Utc::now().to_rfc3339();

        let mut out = Vec::new();
        for it in rss.channel.item.into_iter().take(MAX_ENTRIES) {
            let link = normalize_url(it.link.as_deref().unwrap_or_default());
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            if link.is_empty() || title.is_empty() {
                continue;
            }
            let text = normalize_text(it.description.as_deref().unwrap_or_default());
            let published_at = it
                .pub_date
                .as_deref()
                .and_then(parse_rfc2822_iso)
                .unwrap_or_else(|| now_iso.clone());

            out.push(NewsItem {
                title: truncate_chars(&title, MAX_TITLE_CHARS),
                text: if text.is_empty() {
                    None
                } else {
                    Some(truncate_chars(&text, MAX_TEXT_CHARS))
                },
                url: link,
                source: self.name.to_string(),
                published_at: Some(published_at),
                category: self.category,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for RssProvider {
    async fn fetch_latest(
        &self,
        http: &HttpClient,
        cache: &mut ValidatorCache,
    ) -> Result<Vec<NewsItem>> {
        let key = ValidatorCache::key(self.name, self.url);
        let resp = http.get(self.url, cache.get(&key)).await?;
        if resp.not_modified() {
            return Ok(Vec::new());
        }
        cache.update(&key, &resp);

        let xml = String::from_utf8_lossy(&resp.body);
        self.parse_feed(&xml)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
