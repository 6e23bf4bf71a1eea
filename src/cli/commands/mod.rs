//! CLI command implementations.

pub mod backtest;
pub mod paper;
pub mod validate;
