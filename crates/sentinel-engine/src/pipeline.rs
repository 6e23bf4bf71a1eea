//! One evaluation pass: indicators, trend, fusion, risk, decision.
//!
//! Shared by the live trader and the backtest simulator so both run the same
//! code path.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sentinel_core::{Bar, EngineState, ExternalPrediction, Timeframe};
use sentinel_indicators::{IndicatorEngine, IndicatorParams, IndicatorSet};
use sentinel_risk::{PositionSizer, RiskAssessment, RiskAssessor, RiskConfig, RiskInput};
use sentinel_signals::{
    CompositeSignal, FusionConfig, MarketContext, SignalFusion, TrendClassifier, TrendConfig,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::decision::{Decision, DecisionEngine, DecisionInput};
use crate::prediction::MarketSnapshot;

/// Technical analysis of one window.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub indicators: IndicatorSet,
    pub context: MarketContext,
    pub signal: CompositeSignal,
}

impl Analysis {
    pub fn snapshot(&self, symbol: &str, timeframe: Timeframe, timestamp: DateTime<Utc>) -> MarketSnapshot {
        MarketSnapshot {
            symbol: symbol.to_string(),
            timeframe,
            indicators: self.indicators.clone(),
            context: self.context,
            signal: self.signal.clone(),
            timestamp,
        }
    }
}

/// Component configuration for a [`Pipeline`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub indicators: IndicatorParams,
    pub trend: TrendConfig,
    pub fusion: FusionConfig,
    pub risk: RiskConfig,
    pub engine: EngineConfig,
}

/// The full evaluation chain.
#[derive(Debug, Clone)]
pub struct Pipeline {
    indicators: IndicatorEngine,
    trend: TrendClassifier,
    fusion: SignalFusion,
    risk: RiskAssessor,
    engine: DecisionEngine,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let sizer = PositionSizer::new(&config.risk);
        Self {
            indicators: IndicatorEngine::new(config.indicators),
            trend: TrendClassifier::new(config.trend),
            fusion: SignalFusion::new(config.fusion),
            risk: RiskAssessor::new(config.risk),
            engine: DecisionEngine::new(config.engine, sizer),
        }
    }

    pub fn engine_config(&self) -> &EngineConfig {
        self.engine.config()
    }

    /// Indicators, trend and composite signal for `bars`. `long_horizon`
    /// supplies the series for the 50/200 moving averages when available.
    pub fn analyze(&self, bars: &[Bar], long_horizon: Option<&[Bar]>) -> Analysis {
        let indicators = self.indicators.compute(bars, long_horizon);
        let context = self.trend.classify(bars, &indicators);
        let signal = self.fusion.fuse(&indicators, &context);

        debug!(
            price = indicators.price,
            rsi = indicators.rsi,
            macd = indicators.macd.histogram,
            ema20 = indicators.ema20,
            warmed_up = indicators.warmed_up,
            short = %context.short.direction,
            long = %context.long.direction,
            signal = %signal.action,
            confidence = signal.confidence,
            "Window analyzed"
        );

        Analysis {
            indicators,
            context,
            signal,
        }
    }

    /// Risk assessment and decision for an analyzed window.
    pub fn decide(
        &self,
        analysis: &Analysis,
        prediction: Option<&ExternalPrediction>,
        state: &EngineState,
        balance: Decimal,
        cash: Decimal,
        now: DateTime<Utc>,
    ) -> (RiskAssessment, Decision) {
        let risk = self.risk.assess(&RiskInput {
            indicators: &analysis.indicators,
            context: &analysis.context,
            prediction,
            position: state.position(),
            daily_trades: state.daily.trades,
            now,
        });

        let decision = self.engine.evaluate(
            state,
            &DecisionInput {
                indicators: &analysis.indicators,
                context: &analysis.context,
                signal: &analysis.signal,
                prediction,
                risk: &risk,
                balance,
                cash,
                now,
            },
        );

        (risk, decision)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
