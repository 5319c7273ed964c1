//! # Lexicon Scorer
//! Maps free text to a scalar sentiment in `[-1.0, 1.0]` using fixed keyword
//! sets plus a small map of crypto-specific bonus/penalty terms.
//!
//! This is a best-effort heuristic, not a trained model. Matching is
//! case-insensitive substring containment; the scorer is pure and
//! deterministic so historical scores stay reproducible.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct Lexicon {
    positive: Vec<String>,
    negative: Vec<String>,
    bonus: HashMap<String, f64>,
    penalty: HashMap<String, f64>,
}

static LEXICON: Lazy<Lexicon> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<Lexicon>(raw).expect("valid sentiment lexicon")
});

/// Score a headline or summary text.
///
/// `base = (pos − neg) / max(3, pos + neg)` — the floor of 3 in the
/// denominator dampens texts where only one or two terms fire, so a single
/// matched word can never produce ±1 on its own. Bonus/penalty adjustments
/// are additive (multiple can fire) and the result is clamped to `[-1, 1]`.
pub fn score_text(text: &str) -> f64 {
    let t = text.to_lowercase();

    let pos = LEXICON.positive.iter().filter(|w| t.contains(w.as_str())).count();
    let neg = LEXICON.negative.iter().filter(|w| t.contains(w.as_str())).count();

    let mut score = if pos + neg > 0 {
        (pos as f64 - neg as f64) / (pos + neg).max(3) as f64
    } else {
        0.0
    };

    for (k, v) in &LEXICON.bonus {
        if t.contains(k.as_str()) {
            score += v;
        }
    }
    for (k, v) in &LEXICON.penalty {
        if t.contains(k.as_str()) {
            score += v;
        }
    }

    score.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_text_scores_zero() {
        assert_eq!(score_text("The weather is fine today"), 0.0);
        assert_eq!(score_text(""), 0.0);
    }

    #[test]
    fn bullish_headline_is_positive() {
        let s = score_text("BTC mainnet upgrade bullish");
        assert!(s > 0.1, "expected clearly positive, got {s}");
    }

    #[test]
    fn exploit_headline_is_negative() {
        let s = score_text("DeFi protocol drained in exploit, panic selloff");
        assert!(s < -0.1, "expected clearly negative, got {s}");
    }

    #[test]
    fn single_term_is_dampened_by_denominator_floor() {
        // One positive term, no lexicon bonus: 1 / max(3, 1) = 1/3.
        let s = score_text("traders turn bullish");
        assert!((s - 1.0 / 3.0).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn bonus_and_penalty_are_additive() {
        // "listing" is a positive term (+1/3) and carries a +0.2 bonus.
        let s = score_text("exchange listing announced");
        assert!((s - (1.0 / 3.0 + 0.2)).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(score_text("RALLY"), score_text("rally"));
    }

    #[test]
    fn score_is_always_in_bounds() {
        let stacked = "bullish surge rally partnership integration listing \
                       mainnet upgrade breakout approval wins funding adoption record";
        let s = score_text(stacked);
        assert!((-1.0..=1.0).contains(&s));
        let negative = "rug rugpull exploit hack lawsuit sec ban plunge selloff panic";
        let n = score_text(negative);
        assert!((-1.0..=1.0).contains(&n));
        assert_eq!(n, -1.0);
    }

    #[test]
    fn scorer_is_deterministic() {
        let t = "SEC lawsuit delays ETF approval, bearish drop expected";
        assert_eq!(score_text(t), score_text(t));
    }
}
