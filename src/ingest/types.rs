// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fetch::{HttpClient, ValidatorCache};

/// Coarse partition of the news stream. Anything that is not `Global`
/// (including `Social`) is folded into the crypto bucket by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Crypto,
    Global,
    Social,
    #[serde(other)]
    Other,
}

impl Category {
    /// Bucket key after folding: `global` stays, everything else is crypto.
    pub fn bucket(self) -> Category {
        match self {
            Category::Global => Category::Global,
            _ => Category::Crypto,
        }
    }
}

/// A single news/market headline record from any source.
/// Identity is the `url`; items sharing a url are duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    /// Optional summary/description; preferred over the title for scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub url: String,
    pub source: String, // e.g. "CoinDesk", "Reuters Markets"
    /// ISO-8601 timestamp; tolerated absent or malformed (treated as fresh).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    pub category: Category,
}

impl NewsItem {
    /// Lenient timestamp parse: RFC 3339 first, RFC 2822 as fallback.
    /// `None` means the caller should treat the item as just published.
    pub fn parsed_published_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.published_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_rfc2822(raw))
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// One upstream feed. Implementations must not panic; fetch failures are
/// returned as errors and coalesced to empty lists by the fan-out.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(
        &self,
        http: &HttpClient,
        cache: &mut ValidatorCache,
    ) -> Result<Vec<NewsItem>>;

    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_folding() {
        assert_eq!(Category::Global.bucket(), Category::Global);
        assert_eq!(Category::Crypto.bucket(), Category::Crypto);
        assert_eq!(Category::Social.bucket(), Category::Crypto);
        assert_eq!(Category::Other.bucket(), Category::Crypto);
    }

    #[test]
    fn unknown_category_string_deserializes_to_other() {
        let item: NewsItem = serde_json::from_str(
            r#"{"title":"t","url":"https://x/1","source":"CoinDesk",
                "published_at":"2025-01-01T00:00:00Z","category":"memes"}"#,
        )
        .unwrap();
        assert_eq!(item.category, Category::Other);
        assert_eq!(item.category.bucket(), Category::Crypto);
    }

    #[test]
    fn lenient_timestamp_parsing() {
        let mut item: NewsItem = serde_json::from_str(
            r#"{"title":"t","url":"https://x/1","source":"CoinDesk",
                "published_at":"2025-01-01T12:00:00+00:00","category":"crypto"}"#,
        )
        .unwrap();
        assert!(item.parsed_published_at().is_some());

        item.published_at = Some("Wed, 01 Jan 2025 12:00:00 GMT".into());
        assert!(item.parsed_published_at().is_some());

        item.published_at = Some("yesterday-ish".into());
        assert!(item.parsed_published_at().is_none());

        item.published_at = None;
        assert!(item.parsed_published_at().is_none());
    }
}
