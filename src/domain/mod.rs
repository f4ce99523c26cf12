//! Domain types for the copy-trade simulator.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: TimeMs, Address, TokenId, Side
//! - Order book snapshot types
//! - Target trade events, simulated orders and ledger fill records

pub mod book;
pub mod decimal;
pub mod primitives;
pub mod trade;

pub use book::{BookSnapshot, PriceLevel};
pub use decimal::Decimal;
pub use primitives::{Address, Side, TimeMs, TokenId};
pub use trade::{FillRecord, SimulatedFill, SimulatedOrder, TargetTrade, TradeKey};
