//! End-to-end polling-loop tests: cold start, dedup, ordering, errors.

use polycopy::config::{Config, SizingMode};
use polycopy::datasource::{DataSourceError, MarketDataSource, MockDataSource};
use polycopy::domain::{Address, BookSnapshot, Decimal, PriceLevel, Side, TargetTrade, TimeMs, TokenId};
use polycopy::engine::BookStore;
use polycopy::orchestration::{CycleOutcome, TradeTracker};
use std::sync::Arc;
use tokio::sync::mpsc;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn test_config(test_on_startup: bool) -> Config {
    Config {
        target_wallet: Address::new("0x123".to_string()),
        target_bankroll: d("30000"),
        my_bankroll: d("1000"),
        sizing_mode: SizingMode::Ratio,
        fixed_stake: d("10"),
        copy_sells: true,
        max_slippage_pct: d("10"),
        max_price_cap: d("0.99"),
        min_price_cap: d("0.01"),
        poll_interval_ms: 500,
        book_expiry_ms: 900_000,
        test_on_startup,
        data_api_url: "http://example.invalid".to_string(),
        clob_api_url: "http://example.invalid".to_string(),
        ws_url: "wss://example.invalid/ws".to_string(),
    }
}

fn trade(tx: &str, asset: &str, side: Option<Side>, timestamp: i64) -> TargetTrade {
    TargetTrade {
        transaction_hash: tx.to_string(),
        asset: TokenId::new(asset.to_string()),
        side,
        price: d("0.50"),
        size: d("600"),
        timestamp: TimeMs::new(timestamp),
        title: "Test market".to_string(),
        outcome: "Yes".to_string(),
    }
}

fn deep_book() -> BookSnapshot {
    BookSnapshot::new(
        vec![PriceLevel::new(d("0.48"), d("1000"))],
        vec![PriceLevel::new(d("0.50"), d("1000"))],
        TimeMs::now(),
    )
}

struct Harness {
    tracker: TradeTracker,
    source: Arc<MockDataSource>,
    sub_rx: mpsc::UnboundedReceiver<TokenId>,
}

fn harness(source: MockDataSource, test_on_startup: bool) -> Harness {
    let source = Arc::new(source);
    let store = Arc::new(BookStore::new());
    let (sub_tx, sub_rx) = mpsc::unbounded_channel();
    let tracker = TradeTracker::new(
        test_config(test_on_startup),
        source.clone() as Arc<dyn MarketDataSource>,
        store,
        sub_tx,
    );
    Harness {
        tracker,
        source,
        sub_rx,
    }
}

#[tokio::test]
async fn test_cold_start_seeds_without_executing() {
    let source = MockDataSource::new()
        .with_trade(trade("0xaa", "1", Some(Side::Buy), 100))
        .with_book(TokenId::new("1".to_string()), deep_book());
    let mut h = harness(source, false);

    assert!(!h.tracker.is_warm());
    let outcome = h.tracker.poll_once().await;
    assert_eq!(outcome, CycleOutcome::NewActivity);
    assert!(h.tracker.is_warm());
    assert!(h.tracker.ledger().is_empty(), "baseline must not be copied");

    // The seeded trade stays deduplicated in warm cycles too.
    let outcome = h.tracker.poll_once().await;
    assert_eq!(outcome, CycleOutcome::Idle);
    assert!(h.tracker.ledger().is_empty());
}

#[tokio::test]
async fn test_startup_self_test_records_forced_fill() {
    let source = MockDataSource::new()
        .with_trade(trade("0xaa", "1", Some(Side::Sell), 50))
        .with_trade(trade("0xbb", "2", Some(Side::Buy), 100))
        .with_book(TokenId::new("1".to_string()), deep_book())
        .with_book(TokenId::new("2".to_string()), deep_book());
    let mut h = harness(source, true);

    h.tracker.poll_once().await;
    // The self-test prefers a BUY candidate and fills it.
    assert_eq!(h.tracker.ledger().len(), 1);
    assert_eq!(
        h.tracker.ledger().records()[0].asset,
        TokenId::new("2".to_string())
    );
    assert_eq!(h.tracker.ledger().records()[0].side, Side::Buy);
}

#[tokio::test]
async fn test_duplicate_event_key_yields_one_ledger_entry() {
    let source = MockDataSource::new().with_book(TokenId::new("1".to_string()), deep_book());
    let mut h = harness(source, false);

    h.tracker.poll_once().await; // warm up on an empty feed

    h.source.push_trade(trade("0xaa", "1", Some(Side::Buy), 100));
    assert_eq!(h.tracker.poll_once().await, CycleOutcome::NewActivity);
    assert_eq!(h.tracker.ledger().len(), 1);

    // The same event keeps arriving in the lookback window.
    assert_eq!(h.tracker.poll_once().await, CycleOutcome::Idle);
    assert_eq!(h.tracker.ledger().len(), 1);
}

#[tokio::test]
async fn test_same_transaction_different_tokens_both_execute() {
    let source = MockDataSource::new()
        .with_book(TokenId::new("1".to_string()), deep_book())
        .with_book(TokenId::new("2".to_string()), deep_book());
    let mut h = harness(source, false);

    h.tracker.poll_once().await;
    h.source.push_trade(trade("0xaa", "1", Some(Side::Buy), 100));
    h.source.push_trade(trade("0xaa", "2", Some(Side::Buy), 101));
    h.tracker.poll_once().await;
    assert_eq!(h.tracker.ledger().len(), 2);
}

#[tokio::test]
async fn test_events_processed_in_timestamp_order() {
    let source = MockDataSource::new()
        .with_book(TokenId::new("older".to_string()), deep_book())
        .with_book(TokenId::new("newer".to_string()), deep_book());
    let mut h = harness(source, false);

    h.tracker.poll_once().await;
    // Feed delivers newest first; the tracker must flip the order.
    h.source.push_trade(trade("0xbb", "newer", Some(Side::Buy), 200));
    h.source.push_trade(trade("0xaa", "older", Some(Side::Buy), 100));
    h.tracker.poll_once().await;

    let assets: Vec<_> = h
        .tracker
        .ledger()
        .records()
        .iter()
        .map(|r| r.asset.as_str().to_string())
        .collect();
    assert_eq!(assets, vec!["older".to_string(), "newer".to_string()]);
}

#[tokio::test]
async fn test_unknown_side_is_skipped_not_fatal() {
    let source = MockDataSource::new().with_book(TokenId::new("1".to_string()), deep_book());
    let mut h = harness(source, false);

    h.tracker.poll_once().await;
    h.source.push_trade(trade("0xaa", "1", None, 100));
    // Admitted (dedup) but not copied.
    assert_eq!(h.tracker.poll_once().await, CycleOutcome::NewActivity);
    assert!(h.tracker.ledger().is_empty());
}

#[tokio::test]
async fn test_zero_price_event_is_skipped_not_fatal() {
    let source = MockDataSource::new().with_book(TokenId::new("1".to_string()), deep_book());
    let mut h = harness(source, false);

    h.tracker.poll_once().await;
    let mut bad = trade("0xaa", "1", Some(Side::Buy), 100);
    bad.price = d("0");
    h.source.push_trade(bad);
    assert_eq!(h.tracker.poll_once().await, CycleOutcome::NewActivity);
    assert!(h.tracker.ledger().is_empty());

    // The loop keeps copying well-formed events afterwards.
    h.source.push_trade(trade("0xbb", "1", Some(Side::Buy), 200));
    h.tracker.poll_once().await;
    assert_eq!(h.tracker.ledger().len(), 1);
}

#[tokio::test]
async fn test_rate_limited_surfaces_distinct_outcome() {
    let source = MockDataSource::new();
    let mut h = harness(source, false);

    h.tracker.poll_once().await;
    h.source.fail_next_trades(DataSourceError::RateLimited);
    assert_eq!(h.tracker.poll_once().await, CycleOutcome::RateLimited);
}

#[tokio::test]
async fn test_transient_error_is_survived() {
    let source = MockDataSource::new().with_book(TokenId::new("1".to_string()), deep_book());
    let mut h = harness(source, false);

    h.tracker.poll_once().await;
    h.source
        .fail_next_trades(DataSourceError::Network("connection reset".to_string()));
    assert_eq!(h.tracker.poll_once().await, CycleOutcome::Idle);

    // The loop keeps working on the next cycle.
    h.source.push_trade(trade("0xaa", "1", Some(Side::Buy), 100));
    assert_eq!(h.tracker.poll_once().await, CycleOutcome::NewActivity);
    assert_eq!(h.tracker.ledger().len(), 1);
}

#[tokio::test]
async fn test_new_asset_requests_stream_subscription() {
    let source = MockDataSource::new().with_book(TokenId::new("1".to_string()), deep_book());
    let mut h = harness(source, false);

    h.tracker.poll_once().await;
    h.source.push_trade(trade("0xaa", "1", Some(Side::Buy), 100));
    h.tracker.poll_once().await;

    assert_eq!(h.sub_rx.try_recv().ok(), Some(TokenId::new("1".to_string())));
    // Second trade on the same token does not re-subscribe.
    h.source.push_trade(trade("0xbb", "1", Some(Side::Buy), 200));
    h.tracker.poll_once().await;
    assert!(h.sub_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_missing_book_means_no_fill_recorded() {
    let source = MockDataSource::new();
    let mut h = harness(source, false);

    h.tracker.poll_once().await;
    h.source.push_trade(trade("0xaa", "1", Some(Side::Buy), 100));
    assert_eq!(h.tracker.poll_once().await, CycleOutcome::NewActivity);
    assert!(h.tracker.ledger().is_empty());
}
