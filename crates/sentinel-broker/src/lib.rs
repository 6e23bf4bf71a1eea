//! Order execution sinks.
//!
//! Venue connectivity lives behind [`sentinel_core::OrderExecutor`]; this
//! crate ships the simulated [`PaperExchange`] used for paper trading.

mod paper;

pub use paper::PaperExchange;
