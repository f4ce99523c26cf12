//! Polymarket REST client: data-api trades feed and CLOB book endpoint.

use super::{DataSourceError, MarketDataSource};
use crate::domain::{BookSnapshot, Decimal, PriceLevel, Side, TargetTrade, TimeMs, TokenId};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-request timeout; slow calls are abandoned, not awaited.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Polymarket data source over the public data-api and CLOB endpoints.
#[derive(Debug, Clone)]
pub struct PolymarketDataSource {
    client: Client,
    data_api_url: String,
    clob_api_url: String,
}

impl PolymarketDataSource {
    /// Create a new Polymarket data source.
    pub fn new(data_api_url: String, clob_api_url: String) -> Self {
        Self {
            client: Client::new(),
            data_api_url,
            clob_api_url,
        }
    }

    async fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, DataSourceError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(10)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(url)
                .query(params)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(DataSourceError::Network(e.to_string())))?;

            let status = response.status();
            if status == 429 {
                // Not retried here: the polling loop owns the cooldown.
                return Err(backoff::Error::permanent(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::Http {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::Parse(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl MarketDataSource for PolymarketDataSource {
    async fn recent_trades(
        &self,
        wallet: &str,
        limit: usize,
    ) -> Result<Vec<TargetTrade>, DataSourceError> {
        debug!("Fetching recent trades for wallet={}, limit={}", wallet, limit);

        let url = format!("{}/trades", self.data_api_url);
        let limit_str = limit.to_string();
        let response = self
            .get_json(&url, &[("user", wallet), ("limit", limit_str.as_str())])
            .await?;

        let trades_json = response
            .as_array()
            .ok_or_else(|| DataSourceError::Parse("Expected array response".to_string()))?;

        let mut trades = Vec::new();
        for trade_json in trades_json {
            match parse_trade(trade_json) {
                Ok(trade) => trades.push(trade),
                Err(e) => {
                    warn!("Failed to parse trade: {}", e);
                }
            }
        }

        Ok(trades)
    }

    async fn order_book(&self, token: &TokenId) -> Result<BookSnapshot, DataSourceError> {
        debug!("Fetching order book for token={}", token);

        let url = format!("{}/book", self.clob_api_url);
        let response = self
            .get_json(&url, &[("token_id", token.as_str())])
            .await?;

        Ok(parse_book(&response, TimeMs::now()))
    }
}

/// Decode one trade record, failing only that record on missing fields.
fn parse_trade(trade_json: &serde_json::Value) -> Result<TargetTrade, DataSourceError> {
    let transaction_hash = trade_json
        .get("transactionHash")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataSourceError::Parse("Missing transactionHash field".to_string()))?
        .to_string();

    let asset = trade_json
        .get("asset")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataSourceError::Parse("Missing asset field".to_string()))?
        .to_string();

    let price = json_decimal(trade_json.get("price"))
        .ok_or_else(|| DataSourceError::Parse("Missing or invalid price field".to_string()))?;

    let size = json_decimal(trade_json.get("size"))
        .ok_or_else(|| DataSourceError::Parse("Missing or invalid size field".to_string()))?;

    // Unknown sides are carried through and skipped by the sizer.
    let side = trade_json
        .get("side")
        .and_then(|v| v.as_str())
        .and_then(Side::parse);

    let timestamp_secs = trade_json
        .get("timestamp")
        .and_then(|v| v.as_i64())
        .unwrap_or(0);

    let title = trade_json
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown")
        .to_string();

    let outcome = trade_json
        .get("outcome")
        .and_then(|v| v.as_str())
        .unwrap_or("?")
        .to_string();

    Ok(TargetTrade {
        transaction_hash,
        asset: TokenId::new(asset),
        side,
        price,
        size,
        timestamp: TimeMs::new(timestamp_secs.saturating_mul(1000)),
        title,
        outcome,
    })
}

/// Decode a book payload (shared by the REST endpoint and the stream's
/// book events). Absent sides become empty; malformed levels are dropped
/// individually.
pub(crate) fn parse_book(book_json: &serde_json::Value, observed_at: TimeMs) -> BookSnapshot {
    BookSnapshot::new(
        parse_levels(book_json.get("bids")),
        parse_levels(book_json.get("asks")),
        observed_at,
    )
}

fn parse_levels(side_json: Option<&serde_json::Value>) -> Vec<PriceLevel> {
    side_json
        .and_then(|v| v.as_array())
        .map(|levels| {
            levels
                .iter()
                .filter_map(|level| {
                    let price = json_decimal(level.get("price"))?;
                    let size = json_decimal(level.get("size"))?;
                    Some(PriceLevel::new(price, size))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Upstream numerics arrive as either JSON strings or numbers.
fn json_decimal(value: Option<&serde_json::Value>) -> Option<Decimal> {
    let value = value?;
    if let Some(s) = value.as_str() {
        Decimal::from_str_canonical(s).ok()
    } else if value.is_number() {
        Decimal::from_str_canonical(&value.to_string()).ok()
    } else {
        None
    }
}
