//! Mark-to-market PnL reporting over the fill ledger.

use crate::datasource::MarketDataSource;
use crate::domain::{Decimal, FillRecord, Side, TimeMs};
use crate::engine::{BookStore, FillLedger};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Recomputes session PnL from the full ledger against the freshest
/// available books. Stateless between calls: the same ledger and books
/// always produce the same report.
pub struct PnlReporter {
    store: Arc<BookStore>,
    source: Arc<dyn MarketDataSource>,
}

impl PnlReporter {
    pub fn new(store: Arc<BookStore>, source: Arc<dyn MarketDataSource>) -> Self {
        Self { store, source }
    }

    /// Build a report. Book refreshes are best-effort: a failed fetch
    /// leaves whatever snapshot is already cached (or none at all).
    pub async fn report(&self, ledger: &FillLedger) -> Report {
        for asset in ledger.assets() {
            match self.source.order_book(&asset).await {
                Ok(book) => self.store.update(asset, book),
                Err(e) => debug!("Report refresh failed for {}: {}", asset, e),
            }
        }

        let mut rows = Vec::with_capacity(ledger.len());
        let mut total_invested = Decimal::zero();
        let mut total_value = Decimal::zero();

        for record in ledger.records() {
            let book = self.store.get(&record.asset);
            let best_bid = book
                .as_ref()
                .and_then(|b| b.best_bid())
                .unwrap_or_else(Decimal::zero);
            let best_ask = book
                .as_ref()
                .and_then(|b| b.best_ask())
                .unwrap_or_else(Decimal::zero);

            let row = value_record(record, best_bid, best_ask);
            total_invested += row.invested;
            total_value += row.value;
            rows.push(row);
        }

        Report {
            rows,
            total_invested,
            total_value,
        }
    }
}

/// Value one ledger record against the given best bid/ask (zero means
/// that side is absent).
fn value_record(record: &FillRecord, best_bid: Decimal, best_ask: Decimal) -> ReportRow {
    let entry = record.price;
    let size = record.size;

    let mid = if best_bid.is_positive() && best_ask.is_positive() {
        (best_bid + best_ask) / (Decimal::one() + Decimal::one())
    } else if best_ask.is_positive() {
        best_ask
    } else if best_bid.is_positive() {
        best_bid
    } else {
        entry
    };

    let (pnl, invested, value) = match record.side {
        Side::Buy => {
            // Value a long at the bid; with only ask data, haircut it 10%.
            let mark = if best_bid.is_positive() {
                best_bid
            } else {
                best_ask * Decimal::from_parts(9, 1)
            };
            let pnl = (mark - entry) * size;
            (pnl, size * entry, size * mark)
        }
        Side::Sell => {
            // A sell's exit is marked at the ask; with only bid data,
            // inflate it 10%. Its contribution to value is the realized
            // entry notional plus the mark delta.
            let mark = if best_ask.is_positive() {
                best_ask
            } else {
                best_bid * Decimal::from_parts(11, 1)
            };
            let pnl = (entry - mark) * size;
            (pnl, size * entry, size * entry + pnl)
        }
    };

    ReportRow {
        time_ms: record.time_ms,
        side: record.side,
        entry,
        best_bid,
        best_ask,
        mid,
        pnl,
        invested,
        value,
    }
}

/// Per-fill valuation line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub time_ms: TimeMs,
    pub side: Side,
    pub entry: Decimal,
    pub best_bid: Decimal,
    pub best_ask: Decimal,
    pub mid: Decimal,
    pub pnl: Decimal,
    pub invested: Decimal,
    pub value: Decimal,
}

/// Session PnL report: one row per ledger fill plus recomputed aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub rows: Vec<ReportRow>,
    pub total_invested: Decimal,
    pub total_value: Decimal,
}

impl Report {
    pub fn trade_count(&self) -> usize {
        self.rows.len()
    }

    pub fn session_pnl(&self) -> Decimal {
        self.total_value - self.total_invested
    }
}

fn fmt3(d: Decimal) -> String {
    format!("{}", d.inner().round_dp(3))
}

fn fmt2(d: Decimal) -> String {
    format!("{}", d.inner().round_dp(2))
}

fn fmt_time(t: TimeMs) -> String {
    chrono::DateTime::from_timestamp_millis(t.as_ms())
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(90))?;
        writeln!(
            f,
            "SIMULATED PnL REPORT ({} tracked trades)",
            self.trade_count()
        )?;
        writeln!(
            f,
            "{:<9} {:<4} {:<8} {:<8} {:<8} {:<8} PnL",
            "TIME", "SIDE", "ENTRY", "BID", "ASK", "MID"
        )?;
        writeln!(f, "{}", "-".repeat(90))?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<9} {:<4} {:<8} {:<8} {:<8} {:<8} {}",
                fmt_time(row.time_ms),
                row.side,
                fmt3(row.entry),
                fmt3(row.best_bid),
                fmt3(row.best_ask),
                fmt3(row.mid),
                fmt2(row.pnl)
            )?;
        }
        writeln!(f, "{}", "-".repeat(90))?;
        writeln!(f, "SIMULATED INVESTED: {}", fmt2(self.total_invested))?;
        writeln!(f, "SIMULATED VALUE:    {}", fmt2(self.total_value))?;
        write!(f, "SIMULATED PnL:      {}", fmt2(self.session_pnl()))
    }
}
