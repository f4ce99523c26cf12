//! The trade-polling loop: discovers target trades, deduplicates them,
//! and drives sizing, simulation, ledger and reporting.

use crate::config::{Config, BOOK_MAX_AGE_MS, POLL_TRADE_LIMIT, RATE_LIMIT_COOLDOWN_MS};
use crate::datasource::{DataSourceError, MarketDataSource};
use crate::domain::{FillRecord, Side, TargetTrade, TimeMs, TokenId, TradeKey};
use crate::engine::{fresh_book, simulate, BookStore, FillLedger, PnlReporter, TradeSizer};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

/// What one polling cycle produced, deciding the next sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// New events were processed (or the baseline was just seeded);
    /// re-poll immediately to stay on top of bursts.
    NewActivity,
    /// Nothing new; sleep the normal poll interval.
    Idle,
    /// The feed rate-limited us; apply the elevated cooldown.
    RateLimited,
}

/// Polling-side state. The dedup set and ledger are only ever touched
/// from this task, so they need no cross-task synchronization.
pub struct TradeTracker {
    config: Config,
    source: Arc<dyn MarketDataSource>,
    store: Arc<BookStore>,
    sizer: TradeSizer,
    reporter: PnlReporter,
    ledger: FillLedger,
    seen: HashSet<TradeKey>,
    warm: bool,
    sub_tx: mpsc::UnboundedSender<TokenId>,
}

impl TradeTracker {
    pub fn new(
        config: Config,
        source: Arc<dyn MarketDataSource>,
        store: Arc<BookStore>,
        sub_tx: mpsc::UnboundedSender<TokenId>,
    ) -> Self {
        let sizer = TradeSizer::from_config(&config);
        let reporter = PnlReporter::new(store.clone(), source.clone());
        Self {
            config,
            source,
            store,
            sizer,
            reporter,
            ledger: FillLedger::new(),
            seen: HashSet::new(),
            warm: false,
            sub_tx,
        }
    }

    /// Run until shutdown. Every failure mode inside a cycle is logged
    /// and survived; only the shutdown signal ends the loop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Tracking target wallet {}", self.config.target_wallet);

        loop {
            if *shutdown.borrow() {
                return;
            }

            let sleep_ms = match self.poll_once().await {
                CycleOutcome::NewActivity => continue,
                CycleOutcome::Idle => self.config.poll_interval_ms,
                CycleOutcome::RateLimited => RATE_LIMIT_COOLDOWN_MS,
            };

            tokio::select! {
                _ = sleep(Duration::from_millis(sleep_ms)) => {}
                _ = shutdown.changed() => return,
            }
        }
    }

    /// One polling cycle: fetch, dedup, execute.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let trades = match self
            .source
            .recent_trades(self.config.target_wallet.as_str(), POLL_TRADE_LIMIT)
            .await
        {
            Ok(trades) => trades,
            Err(DataSourceError::RateLimited) => {
                warn!("Trades feed rate-limited; cooling down");
                return CycleOutcome::RateLimited;
            }
            Err(e) => {
                warn!("Polling error: {}", e);
                return CycleOutcome::Idle;
            }
        };

        if !self.warm {
            self.seed_baseline(&trades).await;
            self.warm = true;
            info!("Startup complete; waiting for new trades");
            return CycleOutcome::NewActivity;
        }

        // Upstream gives no ordering guarantee; process oldest first so
        // the ledger respects real-world event order.
        let mut trades = trades;
        trades.sort_by_key(|t| t.timestamp);

        let mut new_activity = false;
        for trade in &trades {
            let key = trade.key();
            if self.seen.contains(&key) {
                continue;
            }
            self.seen.insert(key);
            self.execute_trade(trade, false).await;
            new_activity = true;
        }

        if new_activity {
            CycleOutcome::NewActivity
        } else {
            CycleOutcome::Idle
        }
    }

    /// Cold start: admit everything already in the feed without copying
    /// it, then optionally run one forced-fill self-test.
    async fn seed_baseline(&mut self, trades: &[TargetTrade]) {
        info!("Loaded {} recent trades as baseline", trades.len());
        for trade in trades {
            self.seen.insert(trade.key());
        }

        if self.config.test_on_startup {
            let candidate = trades
                .iter()
                .find(|t| t.side == Some(Side::Buy))
                .or_else(|| trades.first());
            if let Some(trade) = candidate {
                info!("Running startup self-test on: {}", truncate(&trade.title, 30));
                self.execute_trade(trade, true).await;
            }
        }
    }

    /// Copy one admitted trade: size it, simulate a fill against the
    /// freshest book, record it and report.
    async fn execute_trade(&mut self, trade: &TargetTrade, is_test: bool) {
        let prefix = if is_test { "TEST" } else { "SIGNAL" };
        let side_label = trade
            .side
            .map(|s| s.to_string())
            .unwrap_or_else(|| "?".to_string());
        info!(
            "{}: {} {} @ {} | {}",
            prefix,
            side_label,
            trade.outcome,
            trade.price,
            truncate(&trade.title, 40)
        );

        let Some(mut order) = self.sizer.derive_order(trade) else {
            return;
        };
        order.allow_any_price = is_test;

        let now = TimeMs::now();
        if self.store.track(trade.asset.clone(), now) {
            // Send failures are tolerated; the stream task re-enqueues on
            // its own failures and the sweep keeps the registry bounded.
            let _ = self.sub_tx.send(trade.asset.clone());
        }

        let Some((book, origin)) =
            fresh_book(self.store.as_ref(), self.source.as_ref(), &order.asset, BOOK_MAX_AGE_MS)
                .await
        else {
            info!("Could not simulate fill (no order book available)");
            return;
        };

        match simulate(&order, &book) {
            Some(fill) => {
                let cost = fill.size * fill.avg_price;
                info!(
                    "Paper trade ({}): {} shares @ {} (cost {})",
                    origin, fill.size, fill.avg_price, cost
                );
                self.ledger.record(FillRecord {
                    time_ms: now,
                    asset: order.asset.clone(),
                    side: order.side,
                    price: fill.avg_price,
                    size: fill.size,
                });
                let report = self.reporter.report(&self.ledger).await;
                info!("\n{}", report);
            }
            None => info!("Could not simulate fill (price out of range or no liquidity)"),
        }
    }

    pub fn ledger(&self) -> &FillLedger {
        &self.ledger
    }

    pub fn is_warm(&self) -> bool {
        self.warm
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
