//! # History Store
//! Ordered sequence of past aggregation snapshots, oldest first, persisted
//! between runs as a plain JSON array. Append-only: entries are never
//! mutated or reordered, and the sequence is capped so roughly four days of
//! hourly runs are retained.

use serde::{Deserialize, Serialize};

/// Maximum entries after an append (95 retained + the newest one).
pub const HISTORY_CAP: usize = 96;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub crypto: usize,
    pub global: usize,
}

/// One per-run snapshot of the rounded sentiment scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// ISO-8601 timestamp of the run.
    pub ts: String,
    pub crypto: f64,
    pub global: f64,
    pub combined: f64,
    pub counts: Counts,
}

/// Truncate to the last `HISTORY_CAP − 1` entries, then append the newest.
/// Guarantees the sequence never exceeds `HISTORY_CAP` and stays in
/// chronological order.
pub fn append_capped(history: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
    if history.len() > HISTORY_CAP - 1 {
        let excess = history.len() - (HISTORY_CAP - 1);
        history.drain(0..excess);
    }
    history.push(entry);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> HistoryEntry {
        HistoryEntry {
            ts: format!("2025-01-01T{:02}:00:00Z", n % 24),
            crypto: 0.5,
            global: 0.5,
            combined: 0.5,
            counts: Counts::default(),
        }
    }

    #[test]
    fn grows_until_cap_then_drops_oldest() {
        let mut h = Vec::new();
        for n in 0..200 {
            append_capped(&mut h, entry(n));
            assert!(h.len() <= HISTORY_CAP);
            assert_eq!(h.len(), (n + 1).min(HISTORY_CAP));
        }
        // Newest entry is always last.
        assert_eq!(h.last().unwrap().ts, entry(199).ts);
    }

    #[test]
    fn short_history_is_appended_untouched() {
        let mut h = vec![entry(0), entry(1)];
        append_capped(&mut h, entry(2));
        assert_eq!(h.len(), 3);
        assert_eq!(h[0].ts, entry(0).ts);
    }

    #[test]
    fn oversized_persisted_history_is_truncated_before_append() {
        // A hand-edited history longer than the cap must still settle at it.
        let mut h: Vec<HistoryEntry> = (0..150).map(entry).collect();
        append_capped(&mut h, entry(150));
        assert_eq!(h.len(), HISTORY_CAP);
        assert_eq!(h.last().unwrap().ts, entry(150).ts);
    }
}
