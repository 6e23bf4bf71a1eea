//! Decision engine configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sentinel_core::{Timeframe, TradingError};
use serde::{Deserialize, Serialize};

/// Which market regimes may open positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    /// Trend pullbacks in trending markets, RSI extremes in ranges
    #[default]
    Adaptive,
    /// No entries while the long-horizon trend is sideways
    TrendOnly,
}

/// Guardrail and exit parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub strategy_mode: StrategyMode,
    /// Close once unrealized gain reaches this percent
    pub take_profit_pct: Decimal,
    /// Weekly realized loss (percent of balance) that halts trading
    pub weekly_loss_limit_pct: Decimal,
    pub max_daily_trades: u32,
    /// A prediction confirms a signal only above this confidence
    pub prediction_threshold: f64,
    /// Without a prediction, the composite confidence must exceed this
    pub technical_threshold: f64,
    /// Fee rate used to keep entries affordable
    pub fee_rate: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".to_string(),
            timeframe: Timeframe::Minute5,
            strategy_mode: StrategyMode::Adaptive,
            take_profit_pct: dec!(0.4),
            weekly_loss_limit_pct: dec!(1.5),
            max_daily_trades: 10,
            prediction_threshold: 0.6,
            technical_threshold: 0.7,
            fee_rate: dec!(0.001),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), TradingError> {
        if self.symbol.trim().is_empty() {
            return Err(TradingError::Config("Symbol must not be empty".into()));
        }
        if self.take_profit_pct <= Decimal::ZERO || self.take_profit_pct >= Decimal::ONE_HUNDRED {
            return Err(TradingError::Config(
                "Take-profit percent must be within (0, 100)".into(),
            ));
        }
        if self.weekly_loss_limit_pct <= Decimal::ZERO {
            return Err(TradingError::Config("Weekly loss limit must be positive".into()));
        }
        if self.max_daily_trades == 0 {
            return Err(TradingError::Config("Max daily trades must be at least 1".into()));
        }
        for (name, value) in [
            ("Prediction threshold", self.prediction_threshold),
            ("Technical threshold", self.technical_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TradingError::Config(format!("{} must be within 0-1", name)));
            }
        }
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return Err(TradingError::Config("Fee rate must be within [0, 1)".into()));
        }
        Ok(())
    }
}
