//! Pure simulation engine: book cache, fill simulator, sizing, ledger
//! and PnL reporting.

pub mod book_store;
pub mod ledger;
pub mod report;
pub mod simulator;
pub mod sizer;

pub use book_store::{fresh_book, BookOrigin, BookStore};
pub use ledger::FillLedger;
pub use report::{PnlReporter, Report, ReportRow};
pub use simulator::simulate;
pub use sizer::TradeSizer;
