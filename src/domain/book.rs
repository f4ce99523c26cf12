//! Order book snapshot types.

use crate::domain::{Decimal, TimeMs};
use serde::{Deserialize, Serialize};

/// One resting (price, size) pair on a side of the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        PriceLevel { price, size }
    }
}

/// A whole-book snapshot for one token.
///
/// Snapshots are self-contained and replaced wholesale in the store; they
/// are never patched level-by-level. Upstream does not guarantee level
/// ordering, so consumers go through `sorted_asks`/`sorted_bids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub observed_at: TimeMs,
}

impl BookSnapshot {
    pub fn new(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>, observed_at: TimeMs) -> Self {
        BookSnapshot {
            bids,
            asks,
            observed_at,
        }
    }

    /// Asks sorted by price ascending (best ask first).
    pub fn sorted_asks(&self) -> Vec<PriceLevel> {
        let mut asks = self.asks.clone();
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        asks
    }

    /// Bids sorted by price descending (best bid first).
    pub fn sorted_bids(&self) -> Vec<PriceLevel> {
        let mut bids = self.bids.clone();
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        bids
    }

    /// Highest bid price, if any bids exist.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.iter().map(|l| l.price).max()
    }

    /// Lowest ask price, if any asks exist.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.iter().map(|l| l.price).min()
    }
}
