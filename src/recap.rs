//! # Daily Recap
//! Reporting convenience decoupled from the aggregator: instead of a
//! wall-clock gate inside the run, the recap is generated on demand
//! (`--recap`) by an external scheduler. Reduces the most recent history
//! entries to min/avg/max summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::HistoryEntry;

/// Number of trailing history entries the recap covers (~6 hourly runs).
pub const RECAP_WINDOW: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecapStat {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecap {
    pub generated_at: String,
    /// Number of history entries actually covered (≤ RECAP_WINDOW).
    pub entries: usize,
    pub combined: RecapStat,
    pub crypto: RecapStat,
    pub global: RecapStat,
}

fn stat(values: impl Iterator<Item = f64>) -> RecapStat {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        min = min.min(v);
        max = max.max(v);
        sum += v;
        n += 1;
    }
    RecapStat {
        min,
        avg: sum / n as f64,
        max,
    }
}

/// Build the recap from the trailing window of history.
/// Empty history yields no report.
pub fn build_recap(history: &[HistoryEntry], now: DateTime<Utc>) -> Option<DailyRecap> {
    if history.is_empty() {
        return None;
    }
    let window = &history[history.len().saturating_sub(RECAP_WINDOW)..];

    Some(DailyRecap {
        generated_at: now.to_rfc3339(),
        entries: window.len(),
        combined: stat(window.iter().map(|e| e.combined)),
        crypto: stat(window.iter().map(|e| e.crypto)),
        global: stat(window.iter().map(|e| e.global)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Counts;

    fn entry(combined: f64) -> HistoryEntry {
        HistoryEntry {
            ts: "2025-01-01T00:00:00Z".to_string(),
            crypto: combined,
            global: 0.5,
            combined,
            counts: Counts::default(),
        }
    }

    #[test]
    fn empty_history_yields_no_recap() {
        assert!(build_recap(&[], Utc::now()).is_none());
    }

    #[test]
    fn recap_covers_at_most_the_trailing_window() {
        let history: Vec<HistoryEntry> =
            (0..10).map(|i| entry(0.1 * i as f64)).collect();
        let recap = build_recap(&history, Utc::now()).unwrap();
        assert_eq!(recap.entries, RECAP_WINDOW);
        // Only the last 6 entries (0.4 .. 0.9) are covered.
        assert!((recap.combined.min - 0.4).abs() < 1e-9);
        assert!((recap.combined.max - 0.9).abs() < 1e-9);
        assert!((recap.combined.avg - 0.65).abs() < 1e-9);
    }

    #[test]
    fn short_history_uses_all_entries() {
        let history = vec![entry(0.4), entry(0.6)];
        let recap = build_recap(&history, Utc::now()).unwrap();
        assert_eq!(recap.entries, 2);
        assert!((recap.combined.avg - 0.5).abs() < 1e-9);
        assert!((recap.global.min - 0.5).abs() < 1e-9);
    }
}
