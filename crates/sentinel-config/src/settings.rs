//! Configuration structures.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sentinel_backtest::{BacktestConfig, MIN_WARM_UP};
use sentinel_core::{Timeframe, TradingError};
use sentinel_engine::{EngineConfig, PipelineConfig, StrategyMode, TraderConfig};
use sentinel_risk::RiskConfig;
use sentinel_signals::FusionConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub trading: TradingSettings,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub backtest: BacktestSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

/// General app settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "sentinel".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

/// Instrument, guardrail and scheduling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingSettings {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub strategy_mode: StrategyMode,
    /// Consult prediction providers before acting
    pub advisory_enabled: bool,
    pub prediction_threshold: f64,
    pub technical_threshold: f64,
    pub weekly_loss_limit_pct: Decimal,
    pub fee_rate: Decimal,
    /// Bars requested per cycle
    pub window: usize,
    /// Seconds between cycles; zero means one bar interval
    pub cycle_interval_secs: u64,
    pub call_timeout_secs: u64,
    pub prediction_timeout_secs: u64,
}

impl Default for TradingSettings {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            symbol: engine.symbol,
            timeframe: engine.timeframe,
            strategy_mode: engine.strategy_mode,
            advisory_enabled: true,
            prediction_threshold: engine.prediction_threshold,
            technical_threshold: engine.technical_threshold,
            weekly_loss_limit_pct: engine.weekly_loss_limit_pct,
            fee_rate: engine.fee_rate,
            window: 250,
            cycle_interval_secs: 0,
            call_timeout_secs: 10,
            prediction_timeout_secs: 5,
        }
    }
}

/// Backtest settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub initial_capital: Decimal,
    pub warm_up: usize,
    pub window: usize,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: dec!(10000),
            warm_up: MIN_WARM_UP,
            window: 250,
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Directory for trade and prediction logs and the engine snapshot
    pub dir: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/sentinel"),
        }
    }
}

impl AppConfig {
    /// Check every section and the configs derived from them.
    pub fn validate(&self) -> Result<(), TradingError> {
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(TradingError::Config(format!(
                "Unknown log format '{}', expected pretty or json",
                self.logging.format
            )));
        }
        if self.trading.window < MIN_WARM_UP {
            return Err(TradingError::Config(format!(
                "Trading window must be at least {} bars, got {}",
                MIN_WARM_UP, self.trading.window
            )));
        }
        if self.trading.call_timeout_secs == 0 || self.trading.prediction_timeout_secs == 0 {
            return Err(TradingError::Config("Timeouts must be at least one second".into()));
        }

        self.engine_config().validate()?;
        self.pipeline_config().indicators.validate()?;
        self.risk.validate()?;
        self.fusion.validate()?;
        self.backtest_config().validate()?;
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            symbol: self.trading.symbol.clone(),
            timeframe: self.trading.timeframe,
            strategy_mode: self.trading.strategy_mode,
            take_profit_pct: self.risk.take_profit_pct,
            weekly_loss_limit_pct: self.trading.weekly_loss_limit_pct,
            max_daily_trades: self.risk.max_daily_trades,
            prediction_threshold: self.trading.prediction_threshold,
            technical_threshold: self.trading.technical_threshold,
            fee_rate: self.trading.fee_rate,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            fusion: self.fusion.clone(),
            risk: self.risk.clone(),
            engine: self.engine_config(),
            ..PipelineConfig::default()
        }
    }

    pub fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            symbol: self.trading.symbol.clone(),
            timeframe: self.trading.timeframe,
            initial_capital: self.backtest.initial_capital,
            fee_rate: self.trading.fee_rate,
            warm_up: self.backtest.warm_up,
            window: self.backtest.window,
        }
    }

    pub fn trader_config(&self) -> TraderConfig {
        let cycle_interval = match self.trading.cycle_interval_secs {
            0 => self.trading.timeframe.as_duration(),
            secs => Duration::from_secs(secs),
        };
        TraderConfig {
            symbol: self.trading.symbol.clone(),
            timeframe: self.trading.timeframe,
            window: self.trading.window,
            cycle_interval,
            call_timeout: Duration::from_secs(self.trading.call_timeout_secs),
        }
    }

    pub fn prediction_timeout(&self) -> Duration {
        Duration::from_secs(self.trading.prediction_timeout_secs)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_conversions_share_instrument() {
        let mut config = AppConfig::default();
        config.trading.symbol = "SOL/USDT".into();
        config.trading.timeframe = Timeframe::Hour1;
        config.risk.take_profit_pct = dec!(0.6);

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.engine.symbol, "SOL/USDT");
        assert_eq!(pipeline.engine.take_profit_pct, dec!(0.6));
        assert_eq!(pipeline.risk.take_profit_pct, dec!(0.6));
        assert_eq!(config.backtest_config().timeframe, Timeframe::Hour1);

        let trader = config.trader_config();
        assert_eq!(trader.cycle_interval, Duration::from_secs(3600));
        assert_eq!(trader.call_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_explicit_cycle_interval() {
        let mut config = AppConfig::default();
        config.trading.cycle_interval_secs = 30;
        assert_eq!(config.trader_config().cycle_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = AppConfig::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.trading.window = 20;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.risk.max_daily_trades = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.trading.prediction_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
