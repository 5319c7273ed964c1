// src/ingest/providers/mod.rs
pub mod cryptopanic;
pub mod rss;

use crate::ingest::types::{Category, SourceProvider};
use cryptopanic::CryptoPanicProvider;
use rss::RssProvider;

/// The production source roster, in fetch order.
pub fn default_providers() -> Vec<Box<dyn SourceProvider>> {
    vec![
        Box::new(RssProvider::new(
            "CoinDesk",
            "https://www.coindesk.com/arc/outboundfeeds/rss/",
            Category::Crypto,
        )),
        Box::new(RssProvider::new(
            "CoinTelegraph",
            "https://cointelegraph.com/rss",
            Category::Crypto,
        )),
        Box::new(RssProvider::new(
            "Reuters Markets",
            "https://feeds.reuters.com/reuters/marketsNews",
            Category::Global,
        )),
        Box::new(RssProvider::new(
            "Decrypt",
            "https://decrypt.co/feed",
            Category::Crypto,
        )),
        Box::new(RssProvider::new(
            "CryptoSlate",
            "https://cryptoslate.com/feed/",
            Category::Crypto,
        )),
        Box::new(CryptoPanicProvider::from_env()),
    ]
}
