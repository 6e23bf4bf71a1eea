//! Technical indicators for the sentinel decision engine.
//!
//! This crate provides the indicator primitives and the per-cycle snapshot:
//! - Moving averages (SMA, EMA)
//! - Momentum indicators (RSI, MACD, Stochastic)
//! - Volatility indicators (ATR, Bollinger Bands)
//! - `IndicatorEngine`, which turns a trailing bar window into an `IndicatorSet`
//!
//! Windowed statistics use SIMD helpers (`simd`) since backtests recompute
//! the full snapshot on every replayed bar.

pub mod momentum;
pub mod moving_average;
pub mod set;
pub mod simd;
pub mod volatility;

pub use momentum::{Macd, MacdOutput, Rsi, Stochastic, StochasticOutput};
pub use moving_average::{Ema, Sma};
pub use set::{IndicatorEngine, IndicatorParams, IndicatorSet};
pub use volatility::{Atr, BollingerBands, BollingerOutput};
