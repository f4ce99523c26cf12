//! Trade event, simulated order and fill types.

use crate::domain::{Decimal, Side, TimeMs, TokenId};
use serde::{Deserialize, Serialize};

/// One trade observed on the target account.
///
/// Immutable once decoded. `side` is None when the upstream record carried
/// an unrecognized side; such trades are skipped by the sizer rather than
/// failing ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTrade {
    pub transaction_hash: String,
    pub asset: TokenId,
    pub side: Option<Side>,
    pub price: Decimal,
    pub size: Decimal,
    pub timestamp: TimeMs,
    pub title: String,
    pub outcome: String,
}

impl TargetTrade {
    /// Dedup key uniquely identifying this event across polling cycles.
    pub fn key(&self) -> TradeKey {
        TradeKey {
            transaction_hash: self.transaction_hash.clone(),
            asset: self.asset.clone(),
        }
    }
}

/// Unique (transaction, token) identity of an upstream trade event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradeKey {
    pub transaction_hash: String,
    pub asset: TokenId,
}

/// A scaled-down order derived from a target trade, alive only for one
/// simulated fill attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedOrder {
    pub asset: TokenId,
    pub side: Side,
    pub limit_price: Decimal,
    pub desired_size: Decimal,
    /// When set the level walk ignores the limit price entirely
    /// (used by the startup self-test to guarantee a visible fill).
    pub allow_any_price: bool,
}

/// Result of walking the book for a simulated order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedFill {
    pub size: Decimal,
    pub avg_price: Decimal,
}

/// One executed paper trade, appended to the ledger and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillRecord {
    pub time_ms: TimeMs,
    pub asset: TokenId,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
}
