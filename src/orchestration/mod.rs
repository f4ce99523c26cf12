//! Long-lived task coordination: polling tracker and expiry sweeper.
//! (The third task, the book stream, lives with its transport in
//! `datasource::stream`.)

pub mod sweeper;
pub mod tracker;

pub use sweeper::run_sweeper;
pub use tracker::{CycleOutcome, TradeTracker};
