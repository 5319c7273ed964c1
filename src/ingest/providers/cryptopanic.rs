// src/ingest/providers/cryptopanic.rs
//! CryptoPanic "rising" posts. The provider is token-gated: without
//! `CRYPTOPANIC_TOKEN` in the environment it silently yields nothing,
//! which disables the source rather than failing the run.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::fetch::{HttpClient, ValidatorCache};
use crate::ingest::normalize_url;
use crate::ingest::types::{Category, NewsItem, SourceProvider};

const MAX_POSTS: usize = 100;

#[derive(Debug, Deserialize)]
struct PostsPage {
    #[serde(default)]
    results: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    url: Option<String>,
    title: Option<String>,
    published_at: Option<String>,
    created_at: Option<String>,
    domain: Option<String>,
    source: Option<PostSource>,
}

#[derive(Debug, Deserialize)]
struct PostSource {
    domain: Option<String>,
}

fn is_social_domain(domain: &str) -> bool {
    matches!(domain, "twitter.com" | "x.com")
}

pub struct CryptoPanicProvider {
    token: Option<String>,
}

impl CryptoPanicProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("CRYPTOPANIC_TOKEN").ok())
    }

    /// Parse an API response page; exposed for fixture-driven tests.
    pub fn parse_posts(&self, body: &[u8]) -> Result<Vec<NewsItem>> {
        let page: PostsPage =
            serde_json::from_slice(body).context("parsing cryptopanic response")?;
        let now_iso = Utc::now().to_rfc3339();

        let mut out = Vec::new();
        for p in page.results.into_iter().take(MAX_POSTS) {
            let link = normalize_url(p.url.as_deref().unwrap_or_default());
            let title = p.title.unwrap_or_default();
            if link.is_empty() || title.is_empty() {
                continue;
            }
            let category = p
                .source
                .as_ref()
                .and_then(|s| s.domain.as_deref())
                .filter(|d| is_social_domain(d))
                .map(|_| Category::Social)
                .unwrap_or(Category::Crypto);

            out.push(NewsItem {
                title,
                text: p.domain.filter(|d| !d.is_empty()),
                url: link,
                source: "CryptoPanic".to_string(),
                published_at: Some(
                    p.published_at
                        .or(p.created_at)
                        .unwrap_or_else(|| now_iso.clone()),
                ),
                category,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for CryptoPanicProvider {
    async fn fetch_latest(
        &self,
        http: &HttpClient,
        _cache: &mut ValidatorCache,
    ) -> Result<Vec<NewsItem>> {
        let Some(token) = &self.token else {
            // No token: source disabled, not an error.
            return Ok(Vec::new());
        };
        let url = format!("https://cryptopanic.com/api/v1/posts/?token={token}&filter=rising");
        let resp = http.get(&url, None).await?;
        self.parse_posts(&resp.body)
    }

    fn name(&self) -> &'static str {
        "CryptoPanic"
    }
}
