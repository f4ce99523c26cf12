pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod orchestration;

pub use config::{Config, SizingMode};
pub use datasource::{
    DataSourceError, MarketDataSource, MarketStream, MockDataSource, PolymarketDataSource,
};
pub use domain::{
    Address, BookSnapshot, Decimal, FillRecord, PriceLevel, Side, SimulatedFill, SimulatedOrder,
    TargetTrade, TimeMs, TokenId, TradeKey,
};
pub use engine::{BookStore, FillLedger, PnlReporter, Report, TradeSizer};
pub use orchestration::{CycleOutcome, TradeTracker};
