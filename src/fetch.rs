//! # HTTP fetch layer
//!
//! Thin wrapper around `reqwest` with the batch-job fetch policy:
//!
//! - fixed User-Agent and a 15s per-request timeout,
//! - bounded retry (3 attempts, exponential backoff 1s → 10s cap) on
//!   transient failures (5xx and network-layer errors),
//! - 4xx and malformed responses surface immediately, no retry,
//! - conditional requests via an explicit [`ValidatorCache`] owned by the
//!   caller (loaded at process start, persisted at process end) instead of
//!   a module-global cache.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("market-sentiment-feed/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_ATTEMPTS: u32 = 3;

/// Fetch failure taxonomy. `is_transient` decides retry eligibility.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("server error {status}")]
    Server { status: u16 },
    #[error("client error {status}")]
    Client { status: u16 },
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Transient errors (server-side 5xx, network layer) are retried;
    /// client errors and malformed payloads are permanent.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Server { .. } | FetchError::Network(_))
    }
}

/// Backoff before retry `attempt` (1-based): 1s, 2s, 4s, … capped at 10s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let secs = 1u64 << attempt.saturating_sub(1).min(6);
    Duration::from_secs(secs.min(10))
}

/// HTTP conditional-request validators for one source endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validators {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl Validators {
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Explicit ETag/Last-Modified cache keyed by `source:url`.
/// Persisted between runs by the store; never written mid-run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ValidatorCache {
    entries: HashMap<String, Validators>,
}

impl ValidatorCache {
    pub fn key(source: &str, url: &str) -> String {
        format!("{source}:{url}")
    }

    pub fn get(&self, key: &str) -> Option<&Validators> {
        self.entries.get(key)
    }

    /// Record fresh validators from a response; responses without any
    /// validator headers leave the existing entry untouched.
    pub fn update(&mut self, key: &str, response: &HttpResponse) {
        let fresh = Validators {
            etag: response.etag.clone(),
            last_modified: response.last_modified.clone(),
        };
        if !fresh.is_empty() {
            self.entries.insert(key.to_string(), fresh);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decoded response: status, validator headers, raw body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn not_modified(&self) -> bool {
        self.status == 304
    }
}

/// Blocking-style sequential HTTP client for the batch run.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// GET with the retry policy; `conditional` adds If-None-Match /
    /// If-Modified-Since headers when validators are cached.
    pub async fn get(
        &self,
        url: &str,
        conditional: Option<&Validators>,
    ) -> Result<HttpResponse, FetchError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.get_once(url, conditional).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    debug!(url, attempt, error = %e, "transient fetch error, retrying");
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once(
        &self,
        url: &str,
        conditional: Option<&Validators>,
    ) -> Result<HttpResponse, FetchError> {
        let mut req = self.client.get(url);
        if let Some(v) = conditional {
            if let Some(etag) = &v.etag {
                req = req.header(reqwest::header::IF_NONE_MATCH, etag);
            }
            if let Some(lm) = &v.last_modified {
                req = req.header(reqwest::header::IF_MODIFIED_SINCE, lm);
            }
        }

        let resp = req
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        if status >= 500 {
            return Err(FetchError::Server { status });
        }
        if status >= 400 {
            return Err(FetchError::Client { status });
        }

        let header = |name: reqwest::header::HeaderName| {
            resp.headers()
                .get(&name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };
        let etag = header(reqwest::header::ETAG);
        let last_modified = header(reqwest::header::LAST_MODIFIED);

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?
            .to_vec();

        Ok(HttpResponse {
            status,
            etag,
            last_modified,
            body,
        })
    }
}
