//! Advisory prediction providers.
//!
//! Live trading consults a [`ProviderChain`] of interchangeable
//! [`PredictionProvider`]s. Backtests cannot replay an external call, so they
//! use the synchronous [`PredictionProxy`] trait instead, implemented by
//! [`TechnicalProxy`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sentinel_core::error::PredictionError;
use sentinel_core::{Action, ExternalPrediction, Timeframe};
use sentinel_indicators::IndicatorSet;
use sentinel_signals::{CompositeSignal, MarketContext, TrendDirection};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Cycle analysis handed to prediction providers.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub indicators: IndicatorSet,
    pub context: MarketContext,
    pub signal: CompositeSignal,
    pub timestamp: DateTime<Utc>,
}

/// External advisory service.
#[async_trait]
pub trait PredictionProvider: Send + Sync {
    async fn predict(&self, snapshot: &MarketSnapshot) -> Result<ExternalPrediction, PredictionError>;

    /// Whether the provider should be consulted this cycle.
    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str;
}

/// Deterministic in-process stand-in for an external prediction.
pub trait PredictionProxy: Send + Sync {
    fn predict(&self, snapshot: &MarketSnapshot) -> Option<ExternalPrediction>;

    fn name(&self) -> &str;
}

/// Ranked providers with fallback. Each call is time-bounded; the first
/// successful answer wins and exhausting the list yields no prediction.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn PredictionProvider>>,
    timeout: Duration,
}

impl ProviderChain {
    pub fn new(timeout: Duration) -> Self {
        Self {
            providers: Vec::new(),
            timeout,
        }
    }

    /// Append a provider below the ones already registered.
    pub fn with_provider(mut self, provider: Arc<dyn PredictionProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn predict(&self, snapshot: &MarketSnapshot) -> Option<ExternalPrediction> {
        for provider in &self.providers {
            let name = provider.name();

            match timeout(self.timeout, provider.health_check()).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(provider = name, "Provider unhealthy, skipping");
                    continue;
                }
                Err(_) => {
                    warn!(provider = name, "Health check timed out, skipping");
                    continue;
                }
            }

            match timeout(self.timeout, provider.predict(snapshot)).await {
                Ok(Ok(prediction)) => {
                    debug!(
                        provider = name,
                        signal = %prediction.signal,
                        confidence = prediction.confidence,
                        "Prediction received"
                    );
                    return Some(prediction);
                }
                Ok(Err(e)) => warn!(provider = name, error = %e, "Prediction failed, falling back"),
                Err(_) => {
                    let e = PredictionError::Timeout {
                        provider: name.to_string(),
                        millis: self.timeout.as_millis() as u64,
                    };
                    warn!(provider = name, error = %e, "Prediction failed, falling back");
                }
            }
        }

        debug!("No prediction available; technical-only confirmation");
        None
    }
}

/// Re-expresses the composite signal as a prediction.
///
/// The direction follows the composite action. Confidence is the composite
/// confidence, nudged up when the short-horizon trend agrees and down when it
/// opposes. Target and stop come from resistance and support. A HOLD signal
/// yields no prediction.
///
/// The decision engine checks a prediction against its prediction threshold,
/// not the technical-only one, so a trend-aligned composite above 0.55 is
/// confirmed in a backtest where a live run without providers needs 0.7.
#[derive(Debug, Clone)]
pub struct TechnicalProxy {
    trend_adjustment: f64,
}

impl TechnicalProxy {
    pub const NAME: &'static str = "technical-proxy";

    pub fn new(trend_adjustment: f64) -> Self {
        Self { trend_adjustment }
    }

    fn evaluate(&self, snapshot: &MarketSnapshot) -> Option<ExternalPrediction> {
        let signal = &snapshot.signal;
        let favoured = match signal.action {
            Action::Buy => TrendDirection::Up,
            Action::Sell => TrendDirection::Down,
            Action::Hold => return None,
        };

        let short = snapshot.context.short.direction;
        let confidence = if short == favoured {
            signal.confidence + self.trend_adjustment
        } else if short == TrendDirection::Sideways {
            signal.confidence
        } else {
            signal.confidence - self.trend_adjustment
        };

        let support = Decimal::from_f64(snapshot.context.short.support);
        let resistance = Decimal::from_f64(snapshot.context.short.resistance);
        let (target, stop) = match signal.action {
            Action::Buy => (resistance, support),
            _ => (support, resistance),
        };

        Some(
            ExternalPrediction::new(
                signal.action,
                confidence,
                Self::NAME,
                format!("{} with short trend {}", signal.reasoning(), short),
                snapshot.timestamp,
            )
            .with_levels(target, stop),
        )
    }
}

impl Default for TechnicalProxy {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl PredictionProxy for TechnicalProxy {
    fn predict(&self, snapshot: &MarketSnapshot) -> Option<ExternalPrediction> {
        self.evaluate(snapshot)
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

#[async_trait]
impl PredictionProvider for TechnicalProxy {
    async fn predict(&self, snapshot: &MarketSnapshot) -> Result<ExternalPrediction, PredictionError> {
        self.evaluate(snapshot)
            .ok_or_else(|| PredictionError::Unavailable(Self::NAME.into()))
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}
