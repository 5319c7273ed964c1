//! # Persistence collaborator
//! Whole-document JSON load/save for the run artifacts: the feed document
//! (full aggregation result), the history array, the HTTP validator cache
//! and the optional recap report. No partial updates, no transactions —
//! each document is overwritten in full at the end of a successful run.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregate::AggregationResult;
use crate::fetch::ValidatorCache;
use crate::history::HistoryEntry;
use crate::recap::DailyRecap;

pub const FEED_FILE: &str = "feed.json";
pub const HISTORY_FILE: &str = "history.json";
pub const RECAP_FILE: &str = "recap.json";
pub const VALIDATOR_CACHE_FILE: &str = ".cache/headers.json";

/// Directory-rooted JSON document store.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn load_json<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let raw = fs::read_to_string(self.path(name)).ok()?;
        serde_json::from_str(&raw).ok()
    }

    fn save_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.path(name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let raw = serde_json::to_string_pretty(value)?;
        fs::write(&path, raw).with_context(|| format!("writing {}", path.display()))
    }

    /// Missing or corrupt history degrades to an empty sequence.
    pub fn load_history(&self) -> Vec<HistoryEntry> {
        self.load_json(HISTORY_FILE).unwrap_or_default()
    }

    pub fn save_history(&self, history: &[HistoryEntry]) -> Result<()> {
        self.save_json(HISTORY_FILE, &history)
    }

    pub fn feed_exists(&self) -> bool {
        self.path(FEED_FILE).exists()
    }

    pub fn load_feed(&self) -> Option<AggregationResult> {
        self.load_json(FEED_FILE)
    }

    pub fn save_feed(&self, result: &AggregationResult) -> Result<()> {
        self.save_json(FEED_FILE, result)
    }

    pub fn load_validator_cache(&self) -> ValidatorCache {
        self.load_json(VALIDATOR_CACHE_FILE).unwrap_or_default()
    }

    pub fn save_validator_cache(&self, cache: &ValidatorCache) -> Result<()> {
        self.save_json(VALIDATOR_CACHE_FILE, cache)
    }

    pub fn save_recap(&self, recap: &DailyRecap) -> Result<()> {
        self.save_json(RECAP_FILE, recap)
    }
}
