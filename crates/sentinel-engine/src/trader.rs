//! Live trading cycle and scheduler.
//!
//! Each cycle fetches bars, runs the [`Pipeline`], consults the prediction
//! chain, and executes at most one order. A cycle has two halves:
//! [`Trader::plan`] only reads collaborators and works on a clone of the
//! engine state, so shutdown may drop it at any point. Settling executes the
//! order and commits the state before anything is persisted; it is never
//! interrupted, so a confirmed fill is always reflected in the engine state.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sentinel_core::error::{BrokerError, DataError};
use sentinel_core::{
    EngineState, MarketData, OrderExecutor, OrderRequest, PendingOrder, Phase, Side,
    StateStore, Timeframe, TradeRecord, TradingError, TradingResult,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::decision::Decision;
use crate::pipeline::Pipeline;
use crate::prediction::ProviderChain;

/// Scheduler and collaborator settings.
#[derive(Debug, Clone)]
pub struct TraderConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Bars requested per cycle
    pub window: usize,
    pub cycle_interval: Duration,
    /// Bound on each market data, account, execution and store call
    pub call_timeout: Duration,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".to_string(),
            timeframe: Timeframe::Minute5,
            window: 250,
            cycle_interval: Timeframe::Minute5.as_duration(),
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// Result of evaluating a cycle, before anything is executed.
enum Plan {
    /// Nothing to commit
    Skip(CycleReport),
    /// Calendar rollover is committed, the cycle holds with `reason`
    Degraded {
        state: EngineState,
        reason: String,
        now: DateTime<Utc>,
    },
    Decide {
        state: EngineState,
        decision: Decision,
    },
}

/// What one cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub decision: Decision,
    pub trade: Option<TradeRecord>,
    /// Committed state version after the cycle
    pub version: u64,
}

/// Live trading loop over the collaborator traits.
pub struct Trader {
    config: TraderConfig,
    pipeline: Pipeline,
    market: Arc<dyn MarketData>,
    executor: Arc<dyn OrderExecutor>,
    store: Arc<dyn StateStore>,
    predictions: Option<ProviderChain>,
    state: EngineState,
}

impl Trader {
    pub fn new(
        config: TraderConfig,
        pipeline: Pipeline,
        market: Arc<dyn MarketData>,
        executor: Arc<dyn OrderExecutor>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            config,
            pipeline,
            market,
            executor,
            store,
            predictions: None,
            state: EngineState::new(),
        }
    }

    /// Consult `chain` for advisory predictions each cycle.
    pub fn with_predictions(mut self, chain: ProviderChain) -> Self {
        self.predictions = Some(chain);
        self
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Load the persisted snapshot. An order left pending by a previous run
    /// has an unknown outcome and is aborted.
    pub async fn restore(&mut self) -> TradingResult<bool> {
        let Some(mut state) = self.store.load_snapshot().await? else {
            info!("No saved engine state, starting flat");
            return Ok(false);
        };
        if matches!(state.phase, Phase::Entering | Phase::Exiting) {
            warn!(phase = ?state.phase, "Discarding order left pending by a previous run");
            state.abort_pending()?;
        }
        info!(
            version = state.version,
            phase = ?state.phase,
            closed_trades = state.stats.closed_trades,
            "Engine state restored"
        );
        self.state = state;
        Ok(true)
    }

    /// Run one cycle and commit its state.
    ///
    /// Market data, account and prediction failures degrade to HOLD. An
    /// exhausted feed is returned as `DataError::NoDataAvailable`.
    pub async fn run_cycle(&mut self) -> TradingResult<CycleReport> {
        let plan = self.plan().await?;
        self.settle(plan).await
    }

    /// Evaluate the cycle without side effects on the venue or the committed
    /// state. Prediction records are the only writes.
    async fn plan(&self) -> TradingResult<Plan> {
        let mut state = self.state.clone();
        let symbol = self.config.symbol.clone();

        let bars = match timeout(
            self.config.call_timeout,
            self.market.fetch_bars(&symbol, self.config.timeframe, self.config.window),
        )
        .await
        {
            Ok(Ok(bars)) => bars,
            Ok(Err(DataError::NoDataAvailable)) => {
                return Err(TradingError::Data(DataError::NoDataAvailable))
            }
            Ok(Err(e)) => return Ok(Plan::Skip(self.hold_report(format!("Market data unavailable: {}", e)))),
            Err(_) => {
                let e = DataError::Timeout(self.config.call_timeout.as_millis() as u64);
                return Ok(Plan::Skip(self.hold_report(format!("Market data unavailable: {}", e))));
            }
        };
        let Some(last) = bars.last() else {
            return Ok(Plan::Skip(self.hold_report("Market data returned no bars")));
        };
        let now = last.datetime();
        if state.roll_calendar(now) {
            debug!(date = %now.date_naive(), "Calendar counters rolled");
        }

        let analysis = self.pipeline.analyze(&bars, None);

        let prediction = match &self.predictions {
            Some(chain) => {
                let snapshot = analysis.snapshot(&symbol, self.config.timeframe, now);
                chain.predict(&snapshot).await
            }
            None => None,
        };
        if let Some(p) = &prediction {
            match timeout(self.config.call_timeout, self.store.record_prediction(p)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Failed to record prediction"),
                Err(_) => warn!(provider = %p.provider, "Recording prediction timed out"),
            }
        }

        let account = match timeout(self.config.call_timeout, self.executor.account()).await {
            Ok(Ok(account)) => account,
            Ok(Err(e)) => {
                return Ok(Plan::Degraded {
                    state,
                    reason: format!("Account unavailable: {}", e),
                    now,
                })
            }
            Err(_) => {
                return Ok(Plan::Degraded {
                    state,
                    reason: "Account request timed out".into(),
                    now,
                })
            }
        };
        let price = Decimal::from_f64(analysis.indicators.price).unwrap_or(account.last_price);
        let balance = account.cash_balance + account.asset_balance * price;

        let (risk, decision) = self.pipeline.decide(
            &analysis,
            prediction.as_ref(),
            &state,
            balance,
            account.cash_balance,
            now,
        );
        info!(
            action = %decision.action,
            price = %decision.price,
            risk = ?risk.level,
            risk_score = risk.score,
            reasoning = %decision.reasoning(),
            "Cycle decision"
        );

        Ok(Plan::Decide { state, decision })
    }

    /// Execute the planned decision and commit. The committed state is
    /// updated as soon as the order settles, before the snapshot and the
    /// trade record are written.
    async fn settle(&mut self, plan: Plan) -> TradingResult<CycleReport> {
        let (mut state, decision) = match plan {
            Plan::Skip(report) => return Ok(report),
            Plan::Degraded { state, reason, now } => return Ok(self.commit(state, reason, now)),
            Plan::Decide { state, decision } => (state, decision),
        };

        let trade = self.execute(&mut state, &decision).await?;
        self.state = state;

        match timeout(self.config.call_timeout, self.store.save_snapshot(&self.state)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to save engine snapshot"),
            Err(_) => warn!(version = self.state.version, "Saving engine snapshot timed out"),
        }
        if let Some(trade) = &trade {
            match timeout(self.config.call_timeout, self.store.record_trade(trade)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(trade_id = %trade.id, error = %e, "Failed to record trade"),
                Err(_) => warn!(trade_id = %trade.id, "Recording trade timed out"),
            }
        }

        Ok(CycleReport {
            decision,
            trade,
            version: self.state.version,
        })
    }

    /// Run cycles on the configured interval until shutdown is signalled or
    /// the feed is exhausted. Returns the last committed state.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> TradingResult<EngineState> {
        let mut ticker = interval(self.config.cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            symbol = %self.config.symbol,
            timeframe = %self.config.timeframe,
            interval_ms = self.config.cycle_interval.as_millis() as u64,
            market = self.market.name(),
            executor = self.executor.name(),
            providers = ?self.predictions.as_ref().map(|c| c.names()),
            "Trader started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    info!("Shutdown requested");
                    break;
                }
            }

            // Shutdown may only cut the evaluation; settling always completes
            let plan = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    warn!("Shutdown during evaluation, cycle discarded");
                    break;
                }
                plan = self.plan() => plan,
            };

            match plan {
                Ok(plan) => {
                    let report = self.settle(plan).await?;
                    if let Some(trade) = &report.trade {
                        info!(
                            trade_id = %trade.id,
                            side = %trade.side,
                            amount = %trade.amount,
                            price = %trade.price,
                            pnl = ?trade.pnl,
                            "Trade executed"
                        );
                    }
                }
                Err(TradingError::Data(DataError::NoDataAvailable)) => {
                    info!("Market data exhausted");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            version = self.state.version,
            closed_trades = self.state.stats.closed_trades,
            realized_pnl = %self.state.stats.realized_pnl,
            "Trader stopped"
        );
        Ok(self.state)
    }

    /// Drive the pending transition for a BUY/SELL decision. Execution
    /// failures abort the transition and leave the position unchanged.
    async fn execute(&self, state: &mut EngineState, decision: &Decision) -> TradingResult<Option<TradeRecord>> {
        let Some(side) = decision.action.side() else {
            return Ok(None);
        };

        let request = OrderRequest::market(
            Uuid::new_v4().to_string(),
            self.config.symbol.clone(),
            side,
            decision.amount,
            decision.price,
            decision.timestamp,
        );
        let pending = PendingOrder {
            request: request.clone(),
            stop_loss: decision.stop_loss.unwrap_or_default(),
            take_profit: decision.take_profit.unwrap_or_default(),
            reason: decision.reasoning(),
        };
        match side {
            Side::Buy => state.begin_entry(pending)?,
            Side::Sell => state.begin_exit(pending)?,
        }

        let fill = match timeout(self.config.call_timeout, self.executor.execute(request)).await {
            Ok(Ok(fill)) => fill,
            Ok(Err(e)) => {
                warn!(side = %side, error = %e, "Order failed, pending transition aborted");
                state.abort_pending()?;
                return Ok(None);
            }
            Err(_) => {
                let e = BrokerError::Timeout(self.config.call_timeout.as_millis() as u64);
                warn!(side = %side, error = %e, "Order timed out, pending transition aborted");
                state.abort_pending()?;
                return Ok(None);
            }
        };

        let record = match side {
            Side::Buy => state.confirm_entry(&fill)?,
            Side::Sell => state.confirm_exit(&fill)?,
        };
        Ok(Some(record))
    }

    fn hold_report(&self, reason: impl Into<String>) -> CycleReport {
        let reason = reason.into();
        warn!(reason = %reason, "Cycle could not evaluate");
        CycleReport {
            decision: Decision::hold(Decimal::ZERO, reason, Utc::now()),
            trade: None,
            version: self.state.version,
        }
    }

    fn commit(&mut self, state: EngineState, reason: impl Into<String>, now: DateTime<Utc>) -> CycleReport {
        let reason = reason.into();
        warn!(reason = %reason, "Cycle could not evaluate");
        self.state = state;
        CycleReport {
            decision: Decision::hold(Decimal::ZERO, reason, now),
            trade: None,
            version: self.state.version,
        }
    }
}
