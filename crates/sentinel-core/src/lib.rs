//! Core types and traits for the sentinel decision engine.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, Timeframe)
//! - Orders, fills, the single open position and the virtual ledger
//! - The versioned engine state entity shared by live trading and backtests
//! - Collaborator traits for indicators, market data, order execution and storage

pub mod error;
pub mod traits;
pub mod types;

pub use error::{TradingError, TradingResult};
pub use traits::*;
pub use types::*;
