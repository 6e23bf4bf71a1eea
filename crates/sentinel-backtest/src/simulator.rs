//! Historical replay through the live decision pipeline.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sentinel_core::error::DataError;
use sentinel_core::types::{
    Bar, EngineState, Fill, OrderRequest, PendingOrder, Portfolio, Side, Timeframe, TradeRecord,
};
use sentinel_core::{TradingError, TradingResult};
use sentinel_engine::{Decision, Pipeline, PipelineConfig, PredictionProxy, TechnicalProxy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::report::BacktestReport;
use crate::statistics::PerformanceTracker;

/// Fewest warm-up bars accepted.
pub const MIN_WARM_UP: usize = 60;

/// Backtest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub initial_capital: Decimal,
    /// Fee as a fraction of notional, charged on every fill
    pub fee_rate: Decimal,
    /// Bars consumed before the first decision
    pub warm_up: usize,
    /// Trailing bars handed to each evaluation
    pub window: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".to_string(),
            timeframe: Timeframe::Minute5,
            initial_capital: dec!(10000),
            fee_rate: dec!(0.001),
            warm_up: MIN_WARM_UP,
            window: 250,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), TradingError> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(TradingError::Config("Initial capital must be positive".into()));
        }
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return Err(TradingError::Config("Fee rate must be within [0, 1)".into()));
        }
        if self.warm_up < MIN_WARM_UP {
            return Err(TradingError::Config(format!(
                "Warm-up must be at least {} bars, got {}",
                MIN_WARM_UP, self.warm_up
            )));
        }
        if self.window < MIN_WARM_UP {
            return Err(TradingError::Config(format!(
                "Window must be at least {} bars, got {}",
                MIN_WARM_UP, self.window
            )));
        }
        Ok(())
    }
}

/// Deterministic bar-by-bar simulator.
///
/// No wall clock and no randomness: decision times are bar times, trade ids
/// are sequential (`bt-000001`, ...) and the technical proxy stands in for
/// the external prediction.
pub struct BacktestSimulator {
    config: BacktestConfig,
    pipeline: Pipeline,
    pipeline_config: PipelineConfig,
    proxy: Box<dyn PredictionProxy>,
}

impl BacktestSimulator {
    pub fn new(config: BacktestConfig, pipeline_config: PipelineConfig) -> TradingResult<Self> {
        config.validate()?;
        Ok(Self {
            pipeline: Pipeline::new(pipeline_config.clone()),
            pipeline_config,
            config,
            proxy: Box::new(TechnicalProxy::default()),
        })
    }

    pub fn with_proxy(mut self, proxy: Box<dyn PredictionProxy>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Replay `bars`, oldest first. Positions still open at the end stay
    /// open and are valued at the last close.
    pub fn run(&self, bars: &[Bar]) -> TradingResult<BacktestReport> {
        let config = &self.config;
        if bars.len() <= config.warm_up {
            return Err(TradingError::Data(DataError::NoDataAvailable));
        }

        info!(
            symbol = %config.symbol,
            bars = bars.len(),
            warm_up = config.warm_up,
            window = config.window,
            capital = %config.initial_capital,
            proxy = self.proxy.name(),
            "Backtest started"
        );

        let mut portfolio = Portfolio::new(config.initial_capital);
        let mut state = EngineState::new();
        let mut tracker = PerformanceTracker::new(config.initial_capital);
        let mut sequence = 0u64;

        for i in config.warm_up..bars.len() {
            let bar = &bars[i];
            let Some(price) = Decimal::from_f64(bar.close) else {
                warn!(timestamp = bar.timestamp, close = bar.close, "Skipping bar without a valid close");
                continue;
            };
            let now = bar.datetime();

            portfolio.mark(price);
            portfolio.roll_day(bar.date());
            state.roll_calendar(now);

            let window = &bars[(i + 1).saturating_sub(config.window)..=i];
            let analysis = self.pipeline.analyze(window, None);
            let snapshot = analysis.snapshot(&config.symbol, config.timeframe, now);
            let prediction = self.proxy.predict(&snapshot);

            let (_, decision) = self.pipeline.decide(
                &analysis,
                prediction.as_ref(),
                &state,
                portfolio.total_value,
                portfolio.cash_balance,
                now,
            );

            if !decision.is_hold() {
                let id = format!("bt-{:06}", sequence + 1);
                if let Some(trade) =
                    fill_decision(&mut state, &mut portfolio, &decision, &config.symbol, id, config.fee_rate)?
                {
                    sequence += 1;
                    debug!(
                        id = %trade.id,
                        side = %trade.side,
                        price = %trade.price,
                        pnl = ?trade.pnl,
                        "Backtest fill"
                    );
                    tracker.add_trade(trade);
                }
            }

            tracker.record_equity(bar.timestamp, portfolio.total_value);
        }

        let final_value = portfolio.total_value;
        let (performance, trades, equity_curve) = tracker.finish(final_value);

        info!(
            trades = performance.total_trades,
            win_rate = %performance.win_rate.round_dp(2),
            roi = %performance.roi.round_dp(4),
            "Backtest finished"
        );

        Ok(BacktestReport {
            config: config.clone(),
            pipeline: self.pipeline_config.clone(),
            performance,
            final_portfolio: portfolio,
            final_state: state,
            trades,
            equity_curve,
        })
    }
}

/// Apply a BUY/SELL decision to the virtual ledger at the decision price.
/// Returns `None` when the ledger rejects the fill; the pending transition is
/// aborted in that case.
fn fill_decision(
    state: &mut EngineState,
    portfolio: &mut Portfolio,
    decision: &Decision,
    symbol: &str,
    id: String,
    fee_rate: Decimal,
) -> TradingResult<Option<TradeRecord>> {
    let Some(side) = decision.action.side() else {
        return Ok(None);
    };

    let pending = PendingOrder {
        request: OrderRequest::market(
            id.clone(),
            symbol,
            side,
            decision.amount,
            decision.price,
            decision.timestamp,
        ),
        stop_loss: decision.stop_loss.unwrap_or_default(),
        take_profit: decision.take_profit.unwrap_or_default(),
        reason: decision.reasoning(),
    };
    match side {
        Side::Buy => state.begin_entry(pending)?,
        Side::Sell => state.begin_exit(pending)?,
    }

    let fill = Fill {
        id,
        side,
        amount: decision.amount,
        price: decision.price,
        fee: decision.amount * decision.price * fee_rate,
        timestamp: decision.timestamp,
    };
    if let Err(e) = portfolio.apply_fill(&fill) {
        warn!(side = %side, error = %e, "Fill rejected by ledger");
        state.abort_pending()?;
        return Ok(None);
    }

    let record = match side {
        Side::Buy => state.confirm_entry(&fill)?,
        Side::Sell => state.confirm_exit(&fill)?,
    };
    Ok(Some(record))
}
