//! Mock data source for testing without network calls.

use super::{DataSourceError, MarketDataSource};
use crate::domain::{BookSnapshot, TargetTrade, TokenId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock data source returning predefined trades and books.
///
/// An error can be staged for the next trades call to exercise the
/// polling loop's transient-failure path.
#[derive(Debug, Default)]
pub struct MockDataSource {
    trades: Mutex<Vec<TargetTrade>>,
    books: Mutex<HashMap<TokenId, BookSnapshot>>,
    next_trades_error: Mutex<Option<DataSourceError>>,
}

impl MockDataSource {
    /// Create a new mock data source with empty data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trade to the mock feed.
    pub fn with_trade(self, trade: TargetTrade) -> Self {
        self.trades.lock().unwrap().push(trade);
        self
    }

    /// Add multiple trades to the mock feed.
    pub fn with_trades(self, trades: Vec<TargetTrade>) -> Self {
        self.trades.lock().unwrap().extend(trades);
        self
    }

    /// Set the book returned for a token.
    pub fn with_book(self, token: TokenId, book: BookSnapshot) -> Self {
        self.books.lock().unwrap().insert(token, book);
        self
    }

    /// Append a trade after construction (for multi-cycle tests).
    pub fn push_trade(&self, trade: TargetTrade) {
        self.trades.lock().unwrap().push(trade);
    }

    /// Fail the next `recent_trades` call with the given error.
    pub fn fail_next_trades(&self, error: DataSourceError) {
        *self.next_trades_error.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl MarketDataSource for MockDataSource {
    async fn recent_trades(
        &self,
        _wallet: &str,
        limit: usize,
    ) -> Result<Vec<TargetTrade>, DataSourceError> {
        if let Some(err) = self.next_trades_error.lock().unwrap().take() {
            return Err(err);
        }

        let trades = self.trades.lock().unwrap();
        Ok(trades.iter().rev().take(limit).rev().cloned().collect())
    }

    async fn order_book(&self, token: &TokenId) -> Result<BookSnapshot, DataSourceError> {
        self.books
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| DataSourceError::Http {
                status: 404,
                message: "No book configured".to_string(),
            })
    }
}
