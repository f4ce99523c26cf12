//! Append-only record of simulated fills.

use crate::domain::{FillRecord, TokenId};

/// The session's paper fills, in execution order. Sole source of truth
/// for PnL; aggregates are always recomputed from the full list, never
/// maintained incrementally.
#[derive(Debug, Default)]
pub struct FillLedger {
    records: Vec<FillRecord>,
}

impl FillLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fill. Records are never mutated or removed afterward.
    pub fn record(&mut self, fill: FillRecord) {
        self.records.push(fill);
    }

    pub fn records(&self) -> &[FillRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct tokens referenced by the ledger, in first-seen order.
    pub fn assets(&self) -> Vec<TokenId> {
        let mut assets: Vec<TokenId> = Vec::new();
        for record in &self.records {
            if !assets.contains(&record.asset) {
                assets.push(record.asset.clone());
            }
        }
        assets
    }
}
