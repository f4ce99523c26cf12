//! Data source abstraction over the Polymarket REST endpoints the
//! simulator consumes: target-account trades and order book snapshots.

use crate::domain::{BookSnapshot, TargetTrade, TokenId};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod mock;
pub mod polymarket;
pub mod stream;

pub use mock::MockDataSource;
pub use polymarket::PolymarketDataSource;
pub use stream::MarketStream;

/// Read-only market data access.
///
/// Implementations own retry/backoff and request timeouts; rate limiting
/// is surfaced to callers so the polling loop can apply its own cooldown.
#[async_trait]
pub trait MarketDataSource: Send + Sync + fmt::Debug {
    /// Fetch the most recent trades observed on `wallet`, newest first or
    /// not ordered at all; callers must sort before processing.
    async fn recent_trades(
        &self,
        wallet: &str,
        limit: usize,
    ) -> Result<Vec<TargetTrade>, DataSourceError>;

    /// Fetch a fresh order book snapshot for one token.
    async fn order_book(&self, token: &TokenId) -> Result<BookSnapshot, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone, Error)]
pub enum DataSourceError {
    /// Network error (connection timeout, DNS failure).
    #[error("Network error: {0}")]
    Network(String),
    /// Non-success HTTP status other than 429.
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    /// Invalid JSON or malformed response shape.
    #[error("Parse error: {0}")]
    Parse(String),
    /// HTTP 429; the polling loop applies an elevated cooldown.
    #[error("Rate limited")]
    RateLimited,
}
